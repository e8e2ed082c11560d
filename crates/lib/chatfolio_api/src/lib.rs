//! # chatfolio_api
//!
//! HTTP API library for Chatfolio.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::routing::{any, post};
use chatfolio_core::nlu::IntentDetector;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::handlers::{health, intent};

/// Route paths.
pub mod routes {
    pub const ROOT: &str = "/";
    pub const API_GET_INTENT: &str = "/api/get-intent";
}

const CORS_ALLOW_ORIGIN: &str = "*";
const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";
const CORS_ALLOW_HEADERS: &str =
    "Accept, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Intent detector shared by every in-flight request.
    pub detector: Arc<dyn IntentDetector>,
}

/// Builds the Axum router with all routes and shared state.
///
/// Every response, including errors and fallbacks, carries permissive CORS
/// headers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(routes::ROOT, any(health::healthy))
        .route(
            routes::API_GET_INTENT,
            post(intent::get_intent_handler).fallback(intent::method_not_supported),
        )
        .fallback(health::healthy)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(CORS_ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .with_state(state)
}
