//! Stream reachability probes.
//!
//! A stream check answers one question for one camera: can its video actually be reached right
//! now? Two transports are checked independently:
//!
//! - **RTSP** ([`rtsp`]): a raw `OPTIONS` handshake against the camera itself
//! - **HLS** ([`hls`]): a fetch of the first bytes of the playlist, usually served by the local
//!   media gateway, whose URL is first canonicalized by [`normalize`]
//!
//! [`executor::StreamCheckExecutor`] runs both and assembles a [`models::StreamCheckReport`].
//! Probes are request-scoped: nothing is scheduled, retried or persisted.

pub mod executor;
pub mod hls;
pub mod models;
pub mod normalize;
pub mod rtsp;

pub use executor::{NetworkProber, StreamCheckExecutor, StreamProber};
pub use models::{HlsProbeResult, RtspProbeResult, StreamCheckReport};
pub use normalize::{MediaGateway, normalize_hls_url, normalize_whep_url};

use crate::db::handlers::CameraInventory;
use crate::errors::{Error, Result};

/// Look up `camera_id` and run a stream check against it.
///
/// Only a missing camera or an inventory failure is an error; every probe failure is reported
/// inside the returned report.
pub async fn run_stream_check(
    inventory: &dyn CameraInventory,
    executor: &StreamCheckExecutor,
    camera_id: &str,
) -> Result<StreamCheckReport> {
    let camera_id = camera_id.trim();
    if camera_id.is_empty() {
        return Err(Error::BadRequest {
            message: "Camera ID cannot be empty".to_string(),
        });
    }

    let camera = inventory.get_camera(camera_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Camera".to_string(),
        id: camera_id.to_string(),
    })?;

    Ok(executor.run(&camera).await)
}
