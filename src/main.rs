use catalog_search::Result;
use catalog_search::commands::{run_ingest, run_serve, show_config, show_status};
use catalog_search::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catalog-search")]
#[command(about = "Semantic product search over a merchandise catalog")]
#[command(version)]
struct Cli {
    /// Override the configuration directory
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active configuration
    Config,
    /// Ingest a catalog snapshot into the vector store
    Ingest {
        /// Path to the catalog snapshot JSON export
        snapshot: PathBuf,
    },
    /// Start the search API server
    Serve,
    /// Show vector store statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config_dir {
        Some(dir) => Config::load(dir)?,
        None => Config::load_default()?,
    };

    match cli.command {
        Commands::Config => {
            show_config(&config)?;
        }
        Commands::Ingest { snapshot } => {
            run_ingest(&config, &snapshot).await?;
        }
        Commands::Serve => {
            run_serve(&config).await?;
        }
        Commands::Status => {
            show_status(&config).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["catalog-search", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Status);
        }
    }

    #[test]
    fn ingest_command_requires_snapshot_path() {
        let cli = Cli::try_parse_from(["catalog-search", "ingest"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from(["catalog-search", "ingest", "snapshot.json"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { snapshot } = parsed.command {
                assert_eq!(snapshot, PathBuf::from("snapshot.json"));
            }
        }
    }

    #[test]
    fn config_dir_is_global() {
        let cli = Cli::try_parse_from([
            "catalog-search",
            "serve",
            "--config-dir",
            "/tmp/catalog-search",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(
                parsed.config_dir,
                Some(PathBuf::from("/tmp/catalog-search"))
            );
        }
    }

    #[test]
    fn serve_command() {
        let cli = Cli::try_parse_from(["catalog-search", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Serve);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["catalog-search", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["catalog-search", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
