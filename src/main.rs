use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splitlog::config::Config;
use splitlog::db;
use splitlog::migrations::run_migrations;
use splitlog::repositories::SessionRepository;
use splitlog::routes::{self, AppStates};
use splitlog::services::{ActivityExporter, StravaExporter};
use splitlog::version::GIT_VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "splitlog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!(version = GIT_VERSION, "Starting splitlog");
    tracing::info!("Connecting to database: {}", config.database_url);

    let pool = db::create_pool(&config.database_url)?;
    run_migrations(&pool)?;

    let removed = SessionRepository::with_ttl_days(pool.clone(), config.session_ttl_days)
        .cleanup_expired()
        .await?;
    if removed > 0 {
        tracing::info!(removed, "Removed expired sessions");
    }

    let exporter: Option<Arc<dyn ActivityExporter>> = match config.strava.clone() {
        Some(strava) => Some(Arc::new(StravaExporter::new(strava))),
        None => {
            tracing::info!("Strava credentials not set, sync disabled");
            None
        }
    };

    let states = AppStates::new(pool, config.session_ttl_days, exporter);
    let app = routes::create_router(states);

    let addr = config.server_addr();
    tracing::info!("Starting server at http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
