//! Camera inventory access.
//!
//! The inventory is owned by the fleet dashboard; this service only reads it. Cameras come either
//! from PostgreSQL (when `database.url` is configured) or from the `cameras` list in the
//! configuration file.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────────┐
//! │ CameraInventory │  (db::handlers - PgCameras / StaticCameras)
//! └──────┬──────────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Inventory implementations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types

pub mod errors;
pub mod handlers;
pub mod models;

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Open a pool against `config.url` and bring the schema up to date.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = config.pool.apply(PgPoolOptions::new()).connect(&config.url).await?;
    crate::migrator().run(&pool).await?;
    Ok(pool)
}

impl crate::config::PoolSettings {
    fn apply(&self, options: PgPoolOptions) -> PgPoolOptions {
        let options = options
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs));
        let options = match self.idle_timeout_secs {
            0 => options.idle_timeout(None),
            secs => options.idle_timeout(Duration::from_secs(secs)),
        };
        match self.max_lifetime_secs {
            0 => options.max_lifetime(None),
            secs => options.max_lifetime(Duration::from_secs(secs)),
        }
    }
}
