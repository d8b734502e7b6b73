//! Health check endpoints for liveness and readiness probes.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::ApiResponse;
use crate::plugin::PersistState;

/// Readiness probe detail.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub pool_size: u32,
    pub idle_connections: usize,
}

/// Liveness probe — always returns OK if the process is running.
pub async fn live() -> &'static str {
    "OK"
}

/// Readiness probe — checks database connectivity through the retrying executor.
pub async fn ready(State(state): State<PersistState>) -> Json<ApiResponse<HealthStatus>> {
    let db_status = match state
        .run(|pool| async move { sqlx::query("SELECT 1").execute(&pool).await })
        .await
    {
        Ok(_) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            format!("error: {e}")
        }
    };

    ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        database: db_status,
        pool_size: state.pool().size(),
        idle_connections: state.pool().num_idle(),
    })
}
