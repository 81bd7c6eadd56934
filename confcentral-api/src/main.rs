//! confcentral-api - conference registration service
//!
//! Resolves configuration, opens the database, starts the announcement
//! scheduler and serves the HTTP API until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use confcentral_api::cache::{InMemoryViewCache, ViewCache};
use confcentral_api::services::announcements;
use confcentral_api::{build_router, AppState};
use confcentral_common::config::{resolve_database_path, CacheSettings, TomlConfig};
use confcentral_common::db::init_database_with_timeout;
use sqlx::SqlitePool;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for confcentral-api
#[derive(Parser, Debug)]
#[command(name = "confcentral-api")]
#[command(about = "Conference registration service")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "CONFCENTRAL_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(short, long, env = "CONFCENTRAL_DATABASE")]
    database: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "CONFCENTRAL_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "confcentral_api={0},confcentral_common={0},tower_http={0}",
                    config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting confcentral-api v{}", env!("CARGO_PKG_VERSION"));

    let db_path = resolve_database_path(args.database.as_deref(), &config);
    info!("Database path: {}", db_path.display());

    let pool = init_database_with_timeout(&db_path, config.busy_timeout_ms)
        .await
        .context("Failed to initialize database")?;

    let cache: Arc<dyn ViewCache> = Arc::new(InMemoryViewCache::new());

    spawn_announcement_scheduler(
        pool.clone(),
        Arc::clone(&cache),
        config.cache,
        Duration::from_secs(config.announcement_interval_secs.max(1)),
    );

    let state = AppState::new(pool, cache, config.registration, config.cache);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", config.bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", config.bind_address, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("confcentral-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Periodically rebuild the nearly-sold-out announcement
///
/// The first tick fires immediately so a restart republishes it.
fn spawn_announcement_scheduler(
    pool: SqlitePool,
    cache: Arc<dyn ViewCache>,
    settings: CacheSettings,
    period: Duration,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = announcements::recompute_announcement(
                &pool,
                cache.as_ref(),
                settings.announcement_ttl(),
            )
            .await
            {
                error!(error = %e, "Announcement recomputation failed");
            }
        }
    });
    info!(period_secs = period.as_secs(), "Announcement scheduler started");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
