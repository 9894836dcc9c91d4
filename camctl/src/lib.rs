//! # camctl: Stream Diagnostics for the CCTV Fleet Dashboard
//!
//! `camctl` answers one operator question on demand: *can this camera's video actually be reached
//! right now?* A camera can look healthy in the inventory while its stream is dead: the RTSP port
//! is filtered, the credentials changed, or the media gateway refuses to repackage an H.265 feed.
//! The dashboard calls `GET /api/debug/cameras/{id}/stream-check` and shows the report next to
//! the live player.
//!
//! ## Architecture
//!
//! The service is built on [Axum](https://github.com/tokio-rs/axum). Cameras are read from
//! PostgreSQL when `database.url` is configured and from the configuration file otherwise; the
//! inventory is never written.
//!
//! ### Request Flow
//!
//! A stream check looks up the camera, then runs two probes concurrently:
//!
//! - an RTSP `OPTIONS` handshake against the camera's own RTSP server, and
//! - a fetch of the first bytes of its HLS playlist, usually served by the local media gateway.
//!
//! Gateway playlist URLs are canonicalized first (lowercase path, `index.m3u8` appended), since
//! the gateway's routing is case-sensitive. Each probe has its own deadline. Probe failures are
//! data, never HTTP errors: the endpoint answers `200` with `ok: false` and a reason.
//!
//! ### Core Components
//!
//! - [`probes`]: URL normalization, the RTSP and HLS probes, and report assembly
//! - [`db`]: Camera inventory (PostgreSQL or static)
//! - [`api`]: HTTP handlers and response models
//! - [`config`]: YAML + environment configuration
//! - [`telemetry`]: Tracing and optional OTLP export
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use camctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = camctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     camctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod probes;
pub mod telemetry;

use crate::config::CorsOrigin;
use crate::db::handlers::{CameraInventory, PgCameras, StaticCameras};
use crate::openapi::ApiDoc;
use crate::probes::StreamCheckExecutor;
use axum::http::{HeaderValue, Method, header, request::Parts};
use axum::{Json, Router, routing::get};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use url::Url;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Plain-text body served at `/`, kept stable for existing uptime checks.
pub const BANNER: &str = "CCTV Dashboard Backend OK";

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .cameras(Arc::new(StaticCameras::default()))
///     .stream_checks(executor)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub cameras: Arc<dyn CameraInventory>,
    pub stream_checks: StreamCheckExecutor,
}

/// Get the camctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Whether `origin` is a browser on this machine (`localhost`, `127.0.0.1` or `[::1]`, any port).
fn is_local_origin(origin: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    matches!(url.scheme(), "http" | "https") && matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"))
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;
    let allow_any = cors_config
        .allowed_origins
        .iter()
        .any(|origin| matches!(origin, CorsOrigin::Wildcard));

    let mut origins = Vec::new();
    for origin in &cors_config.allowed_origins {
        if let CorsOrigin::Url(url) = origin {
            // Url keeps a trailing slash; browsers send origins without one
            origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
        }
    }

    // A predicate (rather than `Any`) mirrors the request origin, which keeps credentials legal
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
        allow_any || origins.contains(origin) || origin.to_str().is_ok_and(is_local_origin)
    });

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// - `/` and `/healthz` liveness endpoints
/// - `/api` routes, served with no-cache headers
/// - OpenAPI document and Scalar UI
/// - Optional Prometheus metrics at `/internal/metrics`
/// - CORS and tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/debug/cameras/{id}/stream-check", get(api::handlers::cameras::stream_check))
        .route("/cameras/{id}/playback", get(api::handlers::cameras::playback))
        .with_state(state.clone())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(header::PRAGMA, HeaderValue::from_static("no-cache")))
        .layer(SetResponseHeaderLayer::overriding(header::EXPIRES, HeaderValue::from_static("0")));

    let router = Router::new()
        .route("/", get(|| async { BANNER }))
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .nest("/api", api_routes);

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    // Installs the global metrics recorder, so probe counters land in the same registry
    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router and the inventory connection.
///
/// 1. **Create**: [`Application::new`] connects to the inventory and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until shutdown
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting camctl with configuration: {:#?}", config);

        let (cameras, pool): (Arc<dyn CameraInventory>, Option<PgPool>) = match &config.database {
            Some(database) => {
                let pool = db::connect(database).await?;
                info!("Reading cameras from PostgreSQL");
                (Arc::new(PgCameras::new(pool.clone())), Some(pool))
            }
            None => {
                let cameras = StaticCameras::new(config.cameras.clone());
                info!("Reading {} camera(s) from configuration", cameras.len());
                (Arc::new(cameras), None)
            }
        };

        let stream_checks = StreamCheckExecutor::from_config(config.gateway.clone(), config.stream_check.clone());
        let app_state = AppState::builder()
            .config(config.clone())
            .cameras(cameras)
            .stream_checks(stream_checks)
            .build();

        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("camctl listening on http://{}, available at http://localhost:{}", bind_addr, self.config.port);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
