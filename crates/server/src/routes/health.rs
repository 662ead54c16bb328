//! Health check endpoints.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde_json::{Value, json};

use crate::state::AppState;

/// Liveness check with service details.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "MA Furniture DB Server is running",
        "timestamp": Utc::now().to_rfc3339(),
        "database": "SQLite",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
