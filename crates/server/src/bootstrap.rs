use std::sync::Arc;

use axum::Router;
use techstore_core::config::AppConfig;
use techstore_db::{connect, migrations, DbPool, SqlProductRepository};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog::{self, CatalogState};
use crate::health;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub catalog: CatalogState,
}

impl Application {
    /// Full HTTP surface: catalog pages plus the readiness probe.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(catalog::router(self.catalog.clone()))
            .merge(health::router(self.db_pool.clone()))
            .layer(TraceLayer::new_for_http())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("template initialization failed: {0}")]
    Templates(#[source] tera::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let templates = catalog::init_templates().map_err(BootstrapError::Templates)?;
    let repository = Arc::new(SqlProductRepository::new(db_pool.clone()));
    let catalog = CatalogState::new(repository, Arc::new(templates));

    Ok(Application { config, db_pool, catalog })
}
