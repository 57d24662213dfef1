// HTTP boundary for the search contract. One route does the work; errors
// map to a non-2xx status with a human-readable message, so the caller
// always sees either a well-formed result set or a single error payload.


use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, warn};
use uuid::Uuid;

use crate::search::QueryEngine;
use crate::{Result, SearchError};

pub struct AppState {
    pub engine: QueryEngine,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

#[inline]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
#[inline]
pub async fn serve(state: Arc<AppState>, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Search API listening on {bind_addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn handle_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Response {
    let request_id = Uuid::new_v4();
    async move {
        match state.engine.search(&request.query).await {
            Ok(response) => (StatusCode::OK, Json(response)).into_response(),
            Err(e) => {
                warn!("Search request failed: {e}");
                error_response(&e)
            }
        }
    }
    .instrument(tracing::info_span!("search_request", %request_id))
    .await
}

async fn handle_health() -> Response {
    (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
}

fn error_response(error: &SearchError) -> Response {
    let body = json!({
        "success": false,
        "error": error.to_string(),
    });
    (error_status(error), Json(body)).into_response()
}

/// Map error kinds to HTTP statuses. Generation failures never surface here;
/// the advice generator recovers them internally.
#[inline]
pub fn error_status(error: &SearchError) -> StatusCode {
    match error {
        SearchError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        SearchError::Embedding(_) | SearchError::Generation(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
