use std::sync::Arc;

use clap::Parser;

use aperture_server::{AppState, ServerConfig};
use aperture_store::{AppEnv, Bootstrapper, Database, DbConfig};

/// Photo-gallery persistence service: schema bootstrap plus health and
/// bootstrap-trigger endpoints.
#[derive(Parser)]
#[command(name = "aperture", version, about)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Do not run the schema bootstrap at startup; rely on POST
    /// /api/db-init instead.
    #[arg(long)]
    skip_bootstrap: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let environment = AppEnv::from_env();
    tracing::info!(%environment, "starting aperture");

    let mut state = AppState::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), environment);

    match DbConfig::from_env()? {
        Some(config) => {
            let db = Database::connect(&config)?;
            let bootstrapper = Arc::new(Bootstrapper::new(db));

            if cli.skip_bootstrap {
                tracing::info!("skipping startup schema bootstrap");
            } else if !bootstrapper.setup().await {
                // Not fatal: the store may come up later, and POST
                // /api/db-init retries the same idempotent path.
                tracing::warn!("schema bootstrap failed; retry via POST /api/db-init");
            }

            state = state.with_store(bootstrapper, config);
        }
        None => {
            tracing::warn!("POSTGRES_URL is not set; running without a database");
        }
    }

    let handle = aperture_server::start(ServerConfig { port: cli.port }, state).await?;
    tracing::info!(port = handle.port, "aperture ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    Ok(())
}
