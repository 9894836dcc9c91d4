//! Repository implementations for database access.
//!
//! - [`CameraInventory`]: read-only camera lookup, implemented by [`PgCameras`] (PostgreSQL) and
//!   [`StaticCameras`] (configuration file)

pub mod cameras;

pub use cameras::{CameraInventory, PgCameras, StaticCameras};
