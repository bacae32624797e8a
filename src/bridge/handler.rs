use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::completion::{CompletionClient, CompletionError};
use crate::config::{Config, HEALTH_PATH};
use crate::slack::{self, ParseError};
use crate::types::{CompletionRequest, SlackResponse};

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("unreadable request body: {0}")]
    BodyRejected(#[from] BytesRejection),
    #[error("invalid verification token")]
    Unauthorized,
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("completion service returned no choices")]
    EmptyCompletion,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::MalformedRequest(msg) => {
                warn!(error = %msg, "rejecting malformed slash command");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::BodyRejected(rejection) => {
                warn!(error = %rejection, "rejecting unreadable slash command body");
                (rejection.status(), rejection.body_text())
            }
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            Self::Completion(e) => {
                error!(error = %e, "completion request failed");
                let message = match e {
                    CompletionError::Encoding(_) => "Failed to encode request",
                    CompletionError::Unavailable(_) => "Failed to send request",
                    CompletionError::Rejected(_) => "Completion service returned an error",
                    CompletionError::Decoding(_) | CompletionError::Oversized { .. } => {
                        "Failed to decode response"
                    }
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
            Self::EmptyCompletion => {
                error!("completion service returned no choices");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Completion service returned no choices".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ParseError> for BridgeError {
    fn from(e: ParseError) -> Self {
        Self::MalformedRequest(e.to_string())
    }
}

#[derive(Clone)]
pub struct AppState {
    verification_token: Arc<str>,
    max_tokens: u32,
    completions: Arc<dyn CompletionClient>,
}

impl AppState {
    pub fn new(config: &Config, completions: Arc<dyn CompletionClient>) -> Self {
        Self {
            verification_token: Arc::from(config.verification_token.as_str()),
            max_tokens: config.max_tokens,
            completions,
        }
    }
}

pub fn router(state: AppState, command_path: &str) -> Router {
    Router::new()
        .route(command_path, post(slack_command))
        .route(HEALTH_PATH, get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip_all, fields(team_id, user_id, user_name, command))]
async fn slack_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SlackResponse>, BridgeError> {
    let body = body?;
    let command = slack::parse_command(headers.get(CONTENT_TYPE), &body)?;

    let span = tracing::Span::current();
    span.record("team_id", command.team_id.as_str());
    span.record("user_id", command.user_id.as_str());
    span.record("user_name", command.user_name.as_str());
    span.record("command", command.command.as_str());

    if !slack::verify_token(&state.verification_token, &command.token) {
        warn!(channel_id = %command.channel_id, "slash command carried an invalid token");
        return Err(BridgeError::Unauthorized);
    }

    let prompt = command
        .text
        .ok_or_else(|| BridgeError::MalformedRequest("missing field `text`".to_string()))?;

    let request = CompletionRequest {
        prompt,
        max_tokens: state.max_tokens,
    };
    let response = state.completions.complete(&request).await?;

    let text = response.first_text().ok_or(BridgeError::EmptyCompletion)?;
    info!(chars = text.len(), "relaying completion");

    Ok(Json(SlackResponse::in_channel(text)))
}
