//! Camera lookups.

use crate::db::errors::Result;
use crate::db::models::cameras::Camera;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

/// Read-only access to camera records.
#[async_trait]
pub trait CameraInventory: Send + Sync {
    /// Fetch a camera by ID. `Ok(None)` means no such camera.
    async fn get_camera(&self, id: &str) -> Result<Option<Camera>>;
}

/// Cameras stored in the `cameras` table.
#[derive(Clone, Debug)]
pub struct PgCameras {
    pool: PgPool,
}

impl PgCameras {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CameraInventory for PgCameras {
    #[tracing::instrument(skip(self), err)]
    async fn get_camera(&self, id: &str) -> Result<Option<Camera>> {
        let camera = sqlx::query_as::<_, Camera>(
            r#"
            SELECT id, name, ip_address, rtsp_url, hls_url, whep_url, enabled
            FROM cameras
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(camera)
    }
}

/// Cameras listed in the configuration file.
#[derive(Clone, Debug, Default)]
pub struct StaticCameras {
    cameras: HashMap<String, Camera>,
}

impl StaticCameras {
    pub fn new(cameras: impl IntoIterator<Item = Camera>) -> Self {
        Self {
            cameras: cameras.into_iter().map(|camera| (camera.id.clone(), camera)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

#[async_trait]
impl CameraInventory for StaticCameras {
    async fn get_camera(&self, id: &str) -> Result<Option<Camera>> {
        Ok(self.cameras.get(id).cloned())
    }
}
