//! Result types produced by the stream probes.
//!
//! These are transient values: built fresh for every diagnostic request, serialized straight into
//! the HTTP response, and never stored. Field names on the wire follow the dashboard's camelCase
//! contract (`ms`, `looksLikeM3u8`, ...), which is why several fields carry explicit renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default RTSP port when the URL does not name one.
pub const DEFAULT_RTSP_PORT: u16 = 554;

/// Outcome of the RTSP `OPTIONS` handshake against a camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RtspProbeResult {
    /// Host that was probed, if one could be resolved from the camera record
    pub host: Option<String>,
    /// TCP port that was probed
    pub port: u16,
    /// Whether the device answered like an RTSP server (200 or 401)
    pub ok: bool,
    /// Wall-clock time spent on the probe, in milliseconds
    #[serde(rename = "ms")]
    pub elapsed_ms: u64,
    /// RTSP status code from the response, if one was parsed
    #[serde(rename = "status")]
    pub status_code: Option<u16>,
    /// Why the probe failed
    pub error: Option<String>,
}

impl RtspProbeResult {
    pub(crate) fn failed(host: Option<String>, port: u16, elapsed_ms: u64, error: impl Into<String>) -> Self {
        Self {
            host,
            port,
            ok: false,
            elapsed_ms,
            status_code: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of fetching the head of an HLS playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HlsProbeResult {
    /// The (normalized) URL that was fetched
    pub url: Option<String>,
    /// True only when the response was 2xx AND the body looks like a playlist
    pub ok: bool,
    /// Wall-clock time spent on the probe, in milliseconds
    #[serde(rename = "ms")]
    pub elapsed_ms: u64,
    /// HTTP status code, when a response was received
    #[serde(rename = "status")]
    pub http_status: Option<u16>,
    /// `Content-Type` response header, when present
    pub content_type: Option<String>,
    /// Whether the first bytes of the body contain `#EXTM3U`
    #[serde(rename = "looksLikeM3u8")]
    pub looks_like_manifest: Option<bool>,
    /// Why the probe failed
    pub error: Option<String>,
    /// Likely root cause for a recognised failure pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl HlsProbeResult {
    pub(crate) fn failed(url: Option<String>, elapsed_ms: u64, error: impl Into<String>) -> Self {
        Self {
            url,
            ok: false,
            elapsed_ms,
            http_status: None,
            content_type: None,
            looks_like_manifest: None,
            error: Some(error.into()),
            hint: None,
        }
    }

    /// Result for a camera that has no HLS endpoint at all. No request is made.
    pub fn not_configured() -> Self {
        Self::failed(None, 0, "No HLS URL configured")
    }
}

/// Aggregate diagnostic for one camera: both transports, probed independently.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamCheckReport {
    /// Camera the report belongs to
    pub camera_id: String,
    /// When the check was performed
    #[serde(rename = "at")]
    #[schema(value_type = String, format = "date-time")]
    pub performed_at: DateTime<Utc>,
    pub rtsp: RtspProbeResult,
    pub hls: HlsProbeResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_serializes_to_dashboard_shape() {
        let report = StreamCheckReport {
            camera_id: "cam-1".to_string(),
            performed_at: "2026-03-01T10:00:00Z".parse().unwrap(),
            rtsp: RtspProbeResult {
                host: Some("10.0.0.5".to_string()),
                port: 554,
                ok: true,
                elapsed_ms: 12,
                status_code: Some(401),
                error: None,
            },
            hls: HlsProbeResult::not_configured(),
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({
                "cameraId": "cam-1",
                "at": "2026-03-01T10:00:00Z",
                "rtsp": { "host": "10.0.0.5", "port": 554, "ok": true, "ms": 12, "status": 401, "error": null },
                "hls": {
                    "url": null, "ok": false, "ms": 0, "status": null, "contentType": null,
                    "looksLikeM3u8": null, "error": "No HLS URL configured"
                }
            })
        );
    }
}
