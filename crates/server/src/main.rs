mod bootstrap;
mod catalog;
mod health;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use techstore_core::config::{AppConfig, LoadOptions};
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over the configured level when it is set.
fn init_logging(config: &AppConfig) {
    use techstore_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.trim().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = app.config.listen_address();
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(event_name = "system.server.started", bind_address = %address, "techstore-server listening");

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, app.router()).with_graceful_shutdown({
        let shutdown = Arc::clone(&shutdown);
        async move { shutdown.notified().await }
    });
    let mut server_task = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server_task => {
            joined??;
            return Ok(());
        }
        signal = wait_for_shutdown() => signal?,
    }

    info!(
        event_name = "system.server.stopping",
        grace_secs = grace.as_secs(),
        "shutdown requested; draining in-flight requests"
    );
    shutdown.notify_one();

    match tokio::time::timeout(grace, server_task).await {
        Ok(joined) => joined??,
        Err(_) => warn!(
            event_name = "system.server.drain_timeout",
            grace_secs = grace.as_secs(),
            "in-flight requests did not finish before the grace period elapsed"
        ),
    }

    app.db_pool.close().await;
    info!(event_name = "system.server.stopped", "techstore-server stopped");
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
