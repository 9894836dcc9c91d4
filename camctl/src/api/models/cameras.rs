use crate::db::models::cameras::Camera;
use crate::probes::normalize::MediaGateway;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Player URLs for a camera, canonicalized for the media gateway.
///
/// Gateway URLs are addressed to the host the client used to reach this service, so a remote
/// browser is not handed `localhost` links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackUrls {
    pub camera_id: String,
    pub name: String,
    pub enabled: bool,
    /// HLS playlist URL, `null` when the camera has none
    pub hls_url: Option<String>,
    /// WebRTC (WHEP) signaling URL, `null` when the camera has none
    pub whep_url: Option<String>,
}

impl PlaybackUrls {
    pub fn for_camera(camera: &Camera, gateway: &MediaGateway, client_host: Option<&str>) -> Self {
        let for_client = |url: String| match client_host {
            Some(host) => gateway.rewrite_for_client(&url, host),
            None => url,
        };
        Self {
            camera_id: camera.id.clone(),
            name: camera.name.clone(),
            enabled: camera.enabled,
            hls_url: gateway.normalize_hls_url(camera.hls_url.as_deref()).map(for_client),
            whep_url: gateway.normalize_whep_url(camera.whep_url.as_deref()).map(for_client),
        }
    }
}
