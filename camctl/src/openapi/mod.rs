//! OpenAPI documentation for the `/api` surface.
//!
//! Served as JSON at `/api-docs/openapi.json` and rendered with Scalar at `/api/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::api::models::cameras::PlaybackUrls;
use crate::probes::models::{HlsProbeResult, RtspProbeResult, StreamCheckReport};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "camctl",
        description = "Stream reachability diagnostics for the CCTV fleet dashboard."
    ),
    servers((url = "/api")),
    paths(api::handlers::cameras::stream_check, api::handlers::cameras::playback),
    components(schemas(StreamCheckReport, RtspProbeResult, HlsProbeResult, PlaybackUrls)),
    tags(
        (name = "diagnostics", description = "On-demand stream checks"),
        (name = "cameras", description = "Camera playback URLs")
    )
)]
pub struct ApiDoc;
