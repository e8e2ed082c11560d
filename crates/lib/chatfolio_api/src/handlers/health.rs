//! Health check endpoint.

use axum::Json;

/// Body returned by the health check.
pub const HEALTHY: &str = "Healthy";

/// `/` (and any unrouted path) — always answers `"Healthy"`.
pub async fn healthy() -> Json<&'static str> {
    Json(HEALTHY)
}
