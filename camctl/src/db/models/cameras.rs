use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A camera record as stored in the inventory.
///
/// Transport fields are free-form strings exactly as an operator entered them; probes read them
/// and never write them back.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Camera {
    pub id: String,
    pub name: String,
    /// Bare host or IP, used when the RTSP URL has no usable host
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub rtsp_url: String,
    #[serde(default)]
    pub hls_url: Option<String>,
    #[serde(default)]
    pub whep_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
