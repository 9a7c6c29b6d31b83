use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::error;

use aperture_store::Database;

use crate::server::AppState;

/// Response body for the bootstrap trigger.
#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /api/db-init`: run the schema bootstrapper.
///
/// Safe to invoke repeatedly; the bootstrapper is idempotent. Failures are
/// reported in the body, never propagated.
pub async fn db_init(State(state): State<AppState>) -> (StatusCode, Json<InitResponse>) {
    let Some(bootstrapper) = &state.bootstrapper else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(InitResponse {
                success: false,
                message: "Database initialization failed".into(),
                error: Some("POSTGRES_URL is not set".into()),
            }),
        );
    };

    if bootstrapper.setup().await {
        (
            StatusCode::OK,
            Json(InitResponse {
                success: true,
                message: "Database initialized successfully".into(),
                error: None,
            }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(InitResponse {
                success: false,
                message: "Database initialization failed".into(),
                error: None,
            }),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DbStatus {
    Connected,
    Error,
    NotConfigured,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub status: DbStatus,
    /// Round-trip latency in milliseconds; null unless connected.
    pub latency: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub name: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub uptime: f64,
    pub database: DatabaseHealth,
}

/// `GET /api/health`: liveness for the orchestrator and monitoring.
///
/// Opens its own short-lived pool so a wedged shared pool cannot block the
/// probe, and tears it down afterwards. 200 when the store answered, 503
/// otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.db_config {
        None => DatabaseHealth {
            status: DbStatus::NotConfigured,
            latency: None,
        },
        Some(config) => match Database::ping(config).await {
            Ok(latency) => DatabaseHealth {
                status: DbStatus::Connected,
                latency: Some(latency.as_millis() as u64),
            },
            Err(e) => {
                error!(error = %e, "database health check failed");
                DatabaseHealth {
                    status: DbStatus::Error,
                    latency: None,
                }
            }
        },
    };

    let connected = database.status == DbStatus::Connected;
    let response = HealthResponse {
        status: if connected { "ok" } else { "degraded" },
        timestamp: Utc::now().to_rfc3339(),
        name: state.service_name,
        version: state.version,
        environment: state.environment.to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        database,
    };

    let http_status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (http_status, Json(response))
}
