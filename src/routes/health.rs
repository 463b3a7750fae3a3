// src/routes/health.rs
//! Liveness endpoint for the plantation service.
//!
//! `/health` answers without touching the store, so it stays green even while
//! the database file is locked or unwritable. Process supervisors and the
//! integration tests poll it before exercising the real routes.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/health` route.
///
/// Generic over the application state so it merges into the gateway router
/// whatever the state type is.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    // ---
    use axum::http::StatusCode;

    use crate::routes::test_support::{app, get};

    #[tokio::test]
    async fn health_reports_ok() {
        // ---
        let (router, _db) = app().await;
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }
}
