use crate::AppState;
use crate::api::models::cameras::PlaybackUrls;
use crate::errors::{Error, Result};
use crate::probes::{StreamCheckReport, run_stream_check};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header},
};

const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Probe a camera's RTSP and HLS endpoints.
#[utoipa::path(
    get,
    path = "/debug/cameras/{id}/stream-check",
    tag = "diagnostics",
    summary = "Run a stream check",
    description = "Performs an RTSP OPTIONS handshake against the camera and fetches the head of its HLS playlist.

Both probes always run. Probe failures are reported inside the body with `ok: false`; only an unknown camera produces an error status.",
    params(
        ("id" = String, Path, description = "Camera ID"),
    ),
    responses(
        (status = 200, description = "Stream check report", body = StreamCheckReport),
        (status = 404, description = "Camera not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(camera_id = %id))]
pub async fn stream_check(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<StreamCheckReport>> {
    let report = run_stream_check(state.cameras.as_ref(), &state.stream_checks, &id).await?;
    Ok(Json(report))
}

/// Player URLs for a camera.
#[utoipa::path(
    get,
    path = "/cameras/{id}/playback",
    tag = "cameras",
    summary = "Get playback URLs",
    description = "Returns the camera's HLS and WHEP URLs in the exact form the media gateway serves them.

URLs on the gateway ports are rewritten to the host the request was addressed to (`X-Forwarded-Host`, then `Host`).",
    params(
        ("id" = String, Path, description = "Camera ID"),
    ),
    responses(
        (status = 200, description = "Playback URLs", body = PlaybackUrls),
        (status = 404, description = "Camera not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(camera_id = %id))]
pub async fn playback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PlaybackUrls>> {
    let camera = state.cameras.get_camera(&id).await?.ok_or_else(|| Error::NotFound {
        resource: "Camera".to_string(),
        id: id.clone(),
    })?;

    let host = client_host(&headers);
    Ok(Json(PlaybackUrls::for_camera(&camera, state.stream_checks.gateway(), host.as_deref())))
}

/// Hostname the client addressed, without its port. A proxy's `X-Forwarded-Host` wins over `Host`.
fn client_host(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get(X_FORWARDED_HOST)
        .or_else(|| headers.get(header::HOST))
        .and_then(|value| value.to_str().ok())?;
    // Proxy chains append hosts; the first one is what the browser used
    let authority = raw.split(',').next()?.trim();

    let host = if authority.starts_with('[') {
        authority.split_inclusive(']').next()?
    } else {
        authority.split(':').next()?
    };
    (!host.is_empty()).then(|| host.to_string())
}
