//! Intent detection endpoint.
//!
//! `POST /api/get-intent` takes `{"question": "..."}`, asks the NLU provider
//! and relays the result as JSON. The caller's address doubles as the
//! provider session, so consecutive questions from one connection share
//! conversational context.

use std::net::SocketAddr;

use axum::Json;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, Method, StatusCode};
use chatfolio_core::nlu::{NluResult, SessionId, process_message};
use serde::Deserialize;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};

/// Body returned for any method other than POST.
pub const METHOD_NOT_SUPPORTED: &str = "Method is not supported.";

/// Request body for [`get_intent_handler`].
#[derive(Debug, Deserialize)]
pub struct GetIntentRequest {
    #[serde(default)]
    pub question: String,
}

fn request_host(headers: &HeaderMap) -> &str {
    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("<unknown>")
}

/// `POST /api/get-intent` — detect the intent of a question.
pub async fn get_intent_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Body,
) -> AppResult<Json<NluResult>> {
    info!(remote = %remote, "--- POST request from {}", request_host(&headers));

    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::Internal(format!("Error reading request body: {e}")))?;
    let request: GetIntentRequest = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?;

    let session_id = SessionId::from_remote_addr(&remote);
    let result = process_message(state.detector.as_ref(), &request.question, &session_id).await;
    Ok(Json(result))
}

/// Any non-POST method on the intent route.
pub async fn method_not_supported(method: Method, headers: HeaderMap) -> (StatusCode, &'static str) {
    info!("--- {method} request from {}", request_host(&headers));
    (StatusCode::NOT_FOUND, METHOD_NOT_SUPPORTED)
}
