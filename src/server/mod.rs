//! HTTP serving layer
//!
//! One page and one endpoint: the embedded chat UI and the completion API it
//! calls. The transcript lives in the browser and rides along on every request.

pub mod error;

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::{handle_turn, Exchange};
use crate::inference::{GenerationParams, LlamaEngine};
use crate::server::error::ApiError;

const INDEX_HTML: &str = include_str!("index.html");

/// Shared application state
///
/// The engine is not reentrant, so it sits behind a mutex and turns are
/// serialized; concurrent requests queue on the lock.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<LlamaEngine>>,
    pub params: GenerationParams,
    pub system_prompt: Option<String>,
}

impl AppState {
    pub fn new(
        engine: LlamaEngine,
        params: GenerationParams,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            params,
            system_prompt,
        }
    }
}

/// One conversational turn from the page
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Exchange>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }

    let engine = state.engine.clone();
    let params = state.params.clone();
    let system_prompt = state.system_prompt.clone();

    // Generation blocks for seconds; run it off the async runtime
    let reply = tokio::task::spawn_blocking(move || {
        let guard = engine.blocking_lock();
        handle_turn(
            &guard,
            &params,
            system_prompt.as_deref(),
            &req.history,
            &req.message,
        )
    })
    .await
    .map_err(|e| ApiError::internal(format!("Generation task failed: {e}")))??;

    Ok(Json(ChatResponse { reply }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_defaults_to_empty_history() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert_eq!(req.message, "hello");
        assert!(req.history.is_empty());
    }

    #[test]
    fn chat_request_parses_history_pairs() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message":"bye","history":[{"user":"hi","assistant":"hello!"},{"assistant":"ignored"}]}"#,
        )
        .unwrap();
        assert_eq!(req.history.len(), 2);
        assert_eq!(req.history[0].user.as_deref(), Some("hi"));
        assert!(req.history[1].user.is_none());
    }

    #[test]
    fn index_page_embeds_chat_ui() {
        assert!(INDEX_HTML.contains("/api/chat"));
        assert!(INDEX_HTML.contains("<form"));
    }
}
