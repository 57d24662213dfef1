// Advice generation
// Two-tier: a text-generation service produces the advisory message, and a
// deterministic template takes over on any failure, so the query engine
// always returns some advisory text.


use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::catalog::taxonomy::CatalogSummary;
use crate::config::GenerationConfig;
use crate::{Result, SearchError};

/// Everything an advice source may reference: the user's query, how many
/// results it produced, and the catalog-wide type/theme summary.
#[derive(Debug, Clone)]
pub struct AdviceContext<'a> {
    pub query: &'a str,
    pub result_count: usize,
    pub catalog: &'a CatalogSummary,
}

/// A producer of advisory text. Two modes: a summary when there are results,
/// a guided follow-up when there are none.
pub trait AdviceSource: Send + Sync {
    fn results_message(&self, ctx: &AdviceContext<'_>) -> Result<String>;
    fn empty_message(&self, ctx: &AdviceContext<'_>) -> Result<String>;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct GenerationClient {
    endpoint: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

const SYSTEM_PROMPT: &str = "You are the search assistant of an art and gift webshop. \
    Reply with one or two short, friendly sentences in the language of the user's query. \
    Never invent products or prices.";

impl GenerationClient {
    #[inline]
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let endpoint = config
            .chat_completions_url()
            .map_err(|e| SearchError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            api_key: config.resolved_api_key(),
            model: config.model.clone(),
            agent,
        })
    }

    fn complete(&self, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.4,
            max_tokens: 120,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| SearchError::Generation(format!("Failed to serialize request: {e}")))?;

        let mut builder = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            let auth = format!("Bearer {}", self.api_key);
            builder = builder.header("Authorization", auth.as_str());
        }

        let response_text = builder
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| SearchError::Generation(format!("Completion request failed: {e}")))?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| SearchError::Generation(format!("Failed to parse response: {e}")))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if answer.trim().is_empty() {
            return Err(SearchError::Generation("Empty completion".to_string()));
        }
        Ok(answer.trim().to_string())
    }
}

impl AdviceSource for GenerationClient {
    #[inline]
    fn results_message(&self, ctx: &AdviceContext<'_>) -> Result<String> {
        let prompt = format!(
            "A customer searched for \"{}\" and got {} matching products. \
             The shop carries these product types: {}. Popular themes: {}. \
             Write a short message congratulating them on the matches and \
             inviting them to look at the top results.",
            ctx.query,
            ctx.result_count,
            join_or_none(&ctx.catalog.types),
            join_or_none(&ctx.catalog.themes),
        );
        self.complete(&prompt)
    }

    #[inline]
    fn empty_message(&self, ctx: &AdviceContext<'_>) -> Result<String> {
        let prompt = format!(
            "A customer searched for \"{}\" and got no matching products. \
             The shop carries these product types: {}. Popular themes: {}. \
             Write a short, encouraging follow-up suggesting how to rephrase \
             the search, mentioning one or two of those types or themes.",
            ctx.query,
            join_or_none(&ctx.catalog.types),
            join_or_none(&ctx.catalog.themes),
        );
        self.complete(&prompt)
    }
}

/// Deterministic templates. No external dependencies, no failure modes; the
/// results template is keyed only by result-count bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAdvice;

impl FallbackAdvice {
    #[inline]
    pub fn results_text(result_count: usize) -> String {
        match result_count {
            1 => "We found 1 match for your search. Have a look — it could be exactly \
                  what you were after."
                .to_string(),
            2..=10 => format!(
                "We found {result_count} matches for your search. The best match is at the top."
            ),
            _ => format!(
                "We found {result_count} matches. They are ranked by relevance, so start at \
                 the top — or add a detail to your search to narrow things down."
            ),
        }
    }

    #[inline]
    pub fn empty_text() -> String {
        "We couldn't find anything for this search. Try different words, or search for \
         a product type or a theme — for example a statue, a print, or a favorite artist."
            .to_string()
    }
}

impl AdviceSource for FallbackAdvice {
    #[inline]
    fn results_message(&self, ctx: &AdviceContext<'_>) -> Result<String> {
        Ok(Self::results_text(ctx.result_count))
    }

    #[inline]
    fn empty_message(&self, _ctx: &AdviceContext<'_>) -> Result<String> {
        Ok(Self::empty_text())
    }
}

/// Primary/fallback composition. `generate` never fails: a primary failure
/// is logged and the deterministic template fires instead.
pub struct AdviceGenerator {
    primary: Option<Box<dyn AdviceSource>>,
}

impl AdviceGenerator {
    #[inline]
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let primary = if config.enabled {
            Some(Box::new(GenerationClient::new(config)?) as Box<dyn AdviceSource>)
        } else {
            None
        };
        Ok(Self { primary })
    }

    /// Fallback-only generator.
    #[inline]
    pub fn disabled() -> Self {
        Self { primary: None }
    }

    #[inline]
    pub fn with_primary(primary: Box<dyn AdviceSource>) -> Self {
        Self {
            primary: Some(primary),
        }
    }

    #[inline]
    pub fn generate(&self, ctx: &AdviceContext<'_>) -> String {
        if let Some(primary) = &self.primary {
            let attempt = if ctx.result_count == 0 {
                primary.empty_message(ctx)
            } else {
                primary.results_message(ctx)
            };
            match attempt {
                Ok(text) => {
                    debug!("Advice generated by primary source");
                    return text;
                }
                Err(e) => {
                    warn!("Advice generation failed, using fallback: {e}");
                }
            }
        }

        if ctx.result_count == 0 {
            FallbackAdvice::empty_text()
        } else {
            FallbackAdvice::results_text(ctx.result_count)
        }
    }
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}
