use anyhow::Error as AnyhowError;
use db::DBService;
use server::{AppState, file_logging, routes};
use services::services::{
    config::ServerConfig,
    demo::{DemoError, DemoService},
};
use sqlx::Error as SqlxError;
use thiserror::Error;
use utils::assets::asset_dir;

#[derive(Debug, Error)]
pub enum CorkboardError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Demo(#[from] DemoError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), CorkboardError> {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    // The guard must be held for the lifetime of the application so file
    // logs are flushed on shutdown.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _file_log_guard = file_logging::init_logging(&log_level);

    let config = ServerConfig::from_env();

    if !asset_dir().exists() {
        std::fs::create_dir_all(asset_dir())?;
    }

    let db = if config.demo_mode {
        tracing::info!("Demo mode enabled, using in-memory database");
        DBService::new_in_memory().await?
    } else {
        DBService::new().await?
    };

    let state = AppState::new(db.clone(), config.clone());

    if config.demo_mode {
        let demo = DemoService::new(db.pool.clone(), state.events().clone());
        demo.seed().await?;
        demo.spawn_reset_loop(config.demo_reset_interval);
        tracing::info!(
            reset_secs = config.demo_reset_interval.as_secs(),
            "Demo reset loop running"
        );
    }

    let app_router = routes::router(state);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!("Server running on http://{}:{actual_port}", config.host);

    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush the WAL before exiting so a kill after this point leaves the
    // database consistent.
    db.checkpoint_and_close().await;

    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let terminate = async {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
            } else {
                tracing::error!("Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}
