//! PostgreSQL-backed route store.
//!
//! Implements the `courier-core` storage traits over a connection pool:
//! every session is one database transaction, so staged writes are
//! invisible to other sessions until commit and a dropped session rolls
//! back on its own. Schema lives in `db/migrations` at the workspace root.

pub mod row;
pub mod session;

use courier_core::store::{RouteStore, StoreError};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::session::PgSession;

/// Route store over a PostgreSQL pool.
pub struct PgRouteStore {
    pool: PgPool,
}

impl PgRouteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with pool defaults suitable for the config service.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        tracing::info!("connected to route database");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl RouteStore for PgRouteStore {
    type Session = PgSession;

    async fn session(&self) -> Result<PgSession, StoreError> {
        let tx = self.pool.begin().await.map_err(StoreError::backend)?;
        Ok(PgSession::new(tx))
    }
}

/// Run the schema migrations bundled with this workspace.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Verify database connectivity.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
