use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use aperture_store::{AppEnv, Bootstrapper, DbConfig};

use crate::handlers;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Shared application state passed to Axum handlers.
///
/// The store half is optional: without `POSTGRES_URL` the service still
/// serves traffic and reports `not_configured` from the health probe.
#[derive(Clone)]
pub struct AppState {
    pub bootstrapper: Option<Arc<Bootstrapper>>,
    pub db_config: Option<DbConfig>,
    pub environment: AppEnv,
    pub service_name: &'static str,
    pub version: &'static str,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service_name: &'static str, version: &'static str, environment: AppEnv) -> Self {
        Self {
            bootstrapper: None,
            db_config: None,
            environment,
            service_name,
            version,
            started_at: Instant::now(),
        }
    }

    pub fn with_store(mut self, bootstrapper: Arc<Bootstrapper>, db_config: DbConfig) -> Self {
        self.bootstrapper = Some(bootstrapper);
        self.db_config = Some(db_config);
        self
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/db-init", post(handlers::db_init))
        .route("/api/health", get(handlers::health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(config: ServerConfig, state: AppState) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "gallery server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
    })
}

/// Handle returned by `start()`. Dropping it does not stop the server;
/// it exposes the bound port (useful with port 0).
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}
