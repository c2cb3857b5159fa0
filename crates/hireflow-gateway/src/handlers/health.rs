//! Health check endpoint.

use axum::response::IntoResponse;
use serde::Serialize;

use super::ok;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check handler. Public.
///
/// ```text
/// GET /health
///
/// 200 OK
/// {"success": true, "data": {"status": "healthy", "version": "0.1.0"}}
/// ```
pub async fn health() -> impl IntoResponse {
    ok(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
