//! HLS playlist probe.
//!
//! A gateway that has no stream for a path will often still answer `200 OK` with an HTML page, so
//! a status code alone says little. The probe fetches the first bytes of the playlist and checks for
//! the mandatory `#EXTM3U` tag; only a 2xx response carrying that tag counts as healthy.

use crate::probes::models::HlsProbeResult;
use reqwest::{Client, header};
use std::time::{Duration, Instant};
use url::Url;

/// Tag every HLS playlist starts with.
pub const MANIFEST_MARKER: &str = "#EXTM3U";
/// How much of the body is inspected for the marker.
const SNIFF_BYTES: usize = 200;
/// Byte range requested; servers are free to ignore it.
const RANGE: &str = "bytes=0-2048";

const CODEC_HINT: &str = "HTTP 500 from the media gateway usually means the camera stream is H.265/HEVC. \
     Switch the camera profile to H.264 (AVC) or point the RTSP source at an H.264 substream.";

/// Fetch the head of the playlist at `url` and classify it.
///
/// The timeout covers the whole exchange, body included.
#[tracing::instrument(skip(client))]
pub async fn probe_hls(client: &Client, url: &str, timeout: Duration) -> HlsProbeResult {
    let url = url.trim();
    if Url::parse(url).is_err() {
        return HlsProbeResult::failed(Some(url.to_string()), 0, "Invalid HLS URL");
    }

    let start = Instant::now();
    let elapsed = |start: Instant| start.elapsed().as_millis() as u64;
    let timeout_message = || format!("Timeout after {}ms", timeout.as_millis());

    // GET rather than HEAD: several gateways only implement GET for playlists.
    let response = client.get(url).header(header::RANGE, RANGE).timeout(timeout).send().await;

    let mut response = match response {
        Ok(response) => response,
        Err(e) => {
            let message = if e.is_timeout() { timeout_message() } else { error_chain(&e) };
            tracing::debug!(error = %message, "HLS request failed");
            return HlsProbeResult::failed(Some(url.to_string()), elapsed(start), message);
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut head = Vec::with_capacity(SNIFF_BYTES);
    let mut body_error = None;
    while head.len() < SNIFF_BYTES {
        match response.chunk().await {
            Ok(Some(chunk)) => head.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                body_error = Some(if e.is_timeout() { timeout_message() } else { error_chain(&e) });
                break;
            }
        }
    }
    // Stop reading here; dropping the response releases the connection.
    drop(response);

    head.truncate(SNIFF_BYTES);
    let looks_like_manifest = String::from_utf8_lossy(&head).contains(MANIFEST_MARKER);
    let ok = status.is_success() && looks_like_manifest && body_error.is_none();

    let error = if ok {
        None
    } else if let Some(body_error) = body_error {
        Some(body_error)
    } else if !status.is_success() {
        Some(format!("HTTP {}", status.as_u16()))
    } else {
        Some("Response is not an HLS playlist".to_string())
    };

    tracing::debug!(status = status.as_u16(), looks_like_manifest, ok, "HLS probe answered");

    HlsProbeResult {
        url: Some(url.to_string()),
        ok,
        elapsed_ms: elapsed(start),
        http_status: Some(status.as_u16()),
        content_type,
        looks_like_manifest: Some(looks_like_manifest),
        error,
        hint: None,
    }
}

/// Attach the codec hint when a gateway answered 500 with something that is not a playlist.
pub fn with_gateway_hint(mut result: HlsProbeResult) -> HlsProbeResult {
    if result.http_status == Some(500) && result.looks_like_manifest == Some(false) {
        result.hint = Some(CODEC_HINT.to_string());
    }
    result
}

/// reqwest's top-level message rarely names the cause ("error sending request"), so walk the chain.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
