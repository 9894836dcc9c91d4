//! Stream check execution engine.
//!
//! This module provides the `StreamCheckExecutor` which turns a camera record into a
//! [`StreamCheckReport`]. It resolves the RTSP endpoint, normalizes the HLS URL for the media
//! gateway, and runs the RTSP and HLS probes side by side. The two probes never affect each other:
//! both are always attempted and both results are always returned.
//!
//! Network access goes through the [`StreamProber`] trait so report assembly can be exercised
//! without sockets.

use crate::config::StreamCheckConfig;
use crate::db::models::cameras::Camera;
use crate::probes::hls::{probe_hls, with_gateway_hint};
use crate::probes::models::{DEFAULT_RTSP_PORT, HlsProbeResult, RtspProbeResult, StreamCheckReport};
use crate::probes::normalize::MediaGateway;
use crate::probes::rtsp::{RtspEndpoint, probe_rtsp_endpoint};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Transport used to reach cameras and gateways.
#[async_trait]
pub trait StreamProber: Send + Sync {
    /// Run the RTSP `OPTIONS` handshake against `endpoint`.
    async fn probe_rtsp(&self, endpoint: &RtspEndpoint, request_url: &str, timeout: Duration) -> RtspProbeResult;

    /// Fetch and sniff the HLS playlist at `url`.
    async fn probe_hls(&self, url: &str, timeout: Duration) -> HlsProbeResult;
}

/// [`StreamProber`] that talks to the real network.
#[derive(Clone, Default)]
pub struct NetworkProber {
    client: Client,
}

impl NetworkProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamProber for NetworkProber {
    async fn probe_rtsp(&self, endpoint: &RtspEndpoint, request_url: &str, timeout: Duration) -> RtspProbeResult {
        probe_rtsp_endpoint(endpoint, request_url, timeout).await
    }

    async fn probe_hls(&self, url: &str, timeout: Duration) -> HlsProbeResult {
        probe_hls(&self.client, url, timeout).await
    }
}

/// Builds stream check reports for cameras.
#[derive(Clone)]
pub struct StreamCheckExecutor {
    prober: Arc<dyn StreamProber>,
    gateway: MediaGateway,
    settings: StreamCheckConfig,
}

impl StreamCheckExecutor {
    pub fn new(prober: Arc<dyn StreamProber>, gateway: MediaGateway, settings: StreamCheckConfig) -> Self {
        Self {
            prober,
            gateway,
            settings,
        }
    }

    /// Executor backed by [`NetworkProber`].
    pub fn from_config(gateway: MediaGateway, settings: StreamCheckConfig) -> Self {
        Self::new(Arc::new(NetworkProber::default()), gateway, settings)
    }

    pub fn gateway(&self) -> &MediaGateway {
        &self.gateway
    }

    /// Probe both transports of `camera` and assemble the report.
    ///
    /// Never fails: every expected failure mode is a field in the report.
    #[tracing::instrument(skip_all, fields(camera_id = %camera.id))]
    pub async fn run(&self, camera: &Camera) -> StreamCheckReport {
        let (rtsp, hls) = tokio::join!(self.check_rtsp(camera), self.check_hls(camera));

        record_outcome("rtsp", rtsp.ok, rtsp.elapsed_ms);
        if hls.url.is_some() {
            record_outcome("hls", hls.ok, hls.elapsed_ms);
        }

        tracing::info!(
            rtsp_ok = rtsp.ok,
            rtsp_ms = rtsp.elapsed_ms,
            hls_ok = hls.ok,
            hls_ms = hls.elapsed_ms,
            "Stream check finished"
        );

        StreamCheckReport {
            camera_id: camera.id.clone(),
            performed_at: chrono::Utc::now(),
            rtsp,
            hls,
        }
    }

    async fn check_rtsp(&self, camera: &Camera) -> RtspProbeResult {
        // Prefer the configured URL; fall back to the camera's address on the default port.
        let resolved = RtspEndpoint::resolve(&camera.rtsp_url).or_else(|| {
            RtspEndpoint::from_ip_address(&camera.ip_address).map(|endpoint| {
                let request_url = endpoint.request_url();
                (endpoint, request_url)
            })
        });

        match resolved {
            Some((endpoint, request_url)) => {
                self.prober
                    .probe_rtsp(&endpoint, &request_url, self.settings.rtsp_timeout)
                    .await
            }
            None => RtspProbeResult::failed(None, DEFAULT_RTSP_PORT, 0, "Invalid RTSP URL"),
        }
    }

    async fn check_hls(&self, camera: &Camera) -> HlsProbeResult {
        let Some(url) = self.gateway.normalize_hls_url(camera.hls_url.as_deref()) else {
            return HlsProbeResult::not_configured();
        };

        if self.gateway.is_gateway_hls(&url) {
            // The gateway may have to start transcoding before the first playlist exists.
            let result = self.prober.probe_hls(&url, self.settings.gateway_hls_timeout).await;
            with_gateway_hint(result)
        } else {
            self.prober.probe_hls(&url, self.settings.hls_timeout).await
        }
    }
}

fn record_outcome(transport: &'static str, ok: bool, elapsed_ms: u64) {
    let outcome = if ok { "ok" } else { "fail" };
    metrics::counter!("camctl_stream_probes_total", "transport" => transport, "outcome" => outcome).increment(1);
    metrics::histogram!("camctl_stream_probe_duration_ms", "transport" => transport).record(elapsed_ms as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Prober that records every call and answers from canned results.
    #[derive(Default)]
    struct RecordingProber {
        rtsp_calls: Mutex<Vec<(RtspEndpoint, String, Duration)>>,
        hls_calls: Mutex<Vec<(String, Duration)>>,
        hls_count: AtomicUsize,
        hls_status: Option<u16>,
    }

    #[async_trait]
    impl StreamProber for RecordingProber {
        async fn probe_rtsp(&self, endpoint: &RtspEndpoint, request_url: &str, timeout: Duration) -> RtspProbeResult {
            self.rtsp_calls
                .lock()
                .unwrap()
                .push((endpoint.clone(), request_url.to_string(), timeout));
            RtspProbeResult::failed(Some(endpoint.host.clone()), endpoint.port, 5, "connection refused")
        }

        async fn probe_hls(&self, url: &str, timeout: Duration) -> HlsProbeResult {
            self.hls_count.fetch_add(1, Ordering::SeqCst);
            self.hls_calls.lock().unwrap().push((url.to_string(), timeout));
            let status = self.hls_status.unwrap_or(200);
            HlsProbeResult {
                url: Some(url.to_string()),
                ok: status == 200,
                elapsed_ms: 7,
                http_status: Some(status),
                content_type: Some("text/html".to_string()),
                looks_like_manifest: Some(status == 200),
                error: (status != 200).then(|| format!("HTTP {status}")),
                hint: None,
            }
        }
    }

    fn camera(rtsp_url: &str, hls_url: Option<&str>) -> Camera {
        Camera {
            id: "cam-1".to_string(),
            name: "Dock door".to_string(),
            ip_address: "10.0.0.5".to_string(),
            rtsp_url: rtsp_url.to_string(),
            hls_url: hls_url.map(str::to_string),
            whep_url: None,
            enabled: true,
        }
    }

    fn settings() -> StreamCheckConfig {
        StreamCheckConfig {
            rtsp_timeout: Duration::from_millis(1500),
            hls_timeout: Duration::from_millis(2000),
            gateway_hls_timeout: Duration::from_millis(6000),
        }
    }

    #[tokio::test]
    async fn test_missing_hls_url_makes_no_request() {
        let prober = Arc::new(RecordingProber::default());
        let executor = StreamCheckExecutor::new(prober.clone(), MediaGateway::default(), settings());

        let report = executor.run(&camera("rtsp://10.0.0.5:554/stream1", None)).await;

        assert!(!report.hls.ok);
        assert_eq!(report.hls.error.as_deref(), Some("No HLS URL configured"));
        assert_eq!(prober.hls_count.load(Ordering::SeqCst), 0);
        // RTSP is still attempted
        assert_eq!(prober.rtsp_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_hls_url_counts_as_missing() {
        let prober = Arc::new(RecordingProber::default());
        let executor = StreamCheckExecutor::new(prober.clone(), MediaGateway::default(), settings());

        let report = executor.run(&camera("rtsp://10.0.0.5/stream1", Some("   "))).await;

        assert_eq!(report.hls.error.as_deref(), Some("No HLS URL configured"));
        assert_eq!(prober.hls_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rtsp_failure_does_not_skip_hls() {
        let prober = Arc::new(RecordingProber::default());
        let executor = StreamCheckExecutor::new(prober.clone(), MediaGateway::default(), settings());

        let report = executor
            .run(&camera("rtsp://10.0.0.5:554/stream1", Some("https://cdn.example.com/live.m3u8")))
            .await;

        assert!(!report.rtsp.ok);
        assert!(report.hls.ok);
        assert_eq!(report.camera_id, "cam-1");
    }

    #[tokio::test]
    async fn test_gateway_urls_are_normalized_and_get_longer_timeout() {
        let prober = Arc::new(RecordingProber::default());
        let executor = StreamCheckExecutor::new(prober.clone(), MediaGateway::default(), settings());

        executor
            .run(&camera("rtsp://10.0.0.5:554/stream1", Some("http://localhost:8888/Cam1/INDEX.M3U8")))
            .await;
        executor
            .run(&camera("rtsp://10.0.0.5:554/stream1", Some("https://cdn.example.com/Live.m3u8")))
            .await;

        let calls = prober.hls_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("http://localhost:8888/cam1/index.m3u8".to_string(), Duration::from_millis(6000)),
                ("https://cdn.example.com/Live.m3u8".to_string(), Duration::from_millis(2000)),
            ]
        );
    }

    #[tokio::test]
    async fn test_gateway_500_gets_codec_hint() {
        let prober = Arc::new(RecordingProber {
            hls_status: Some(500),
            ..Default::default()
        });
        let executor = StreamCheckExecutor::new(prober.clone(), MediaGateway::default(), settings());

        let gateway_report = executor
            .run(&camera("rtsp://10.0.0.5/s", Some("http://localhost:8888/cam1")))
            .await;
        let external_report = executor
            .run(&camera("rtsp://10.0.0.5/s", Some("http://cdn.example.com/cam1.m3u8")))
            .await;

        assert!(gateway_report.hls.hint.is_some());
        assert_eq!(external_report.hls.hint, None);
    }

    #[tokio::test]
    async fn test_rtsp_falls_back_to_ip_address() {
        let prober = Arc::new(RecordingProber::default());
        let executor = StreamCheckExecutor::new(prober.clone(), MediaGateway::default(), settings());

        let report = executor.run(&camera("stream1", None)).await;

        assert_eq!(report.rtsp.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(report.rtsp.port, 554);
        let calls = prober.rtsp_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(
                RtspEndpoint {
                    host: "10.0.0.5".to_string(),
                    port: 554
                },
                "rtsp://10.0.0.5:554/".to_string(),
                Duration::from_millis(1500)
            )]
        );
    }

    #[tokio::test]
    async fn test_unresolvable_rtsp_target() {
        let prober = Arc::new(RecordingProber::default());
        let executor = StreamCheckExecutor::new(prober.clone(), MediaGateway::default(), settings());
        let mut cam = camera("", None);
        cam.ip_address = String::new();

        let report = executor.run(&cam).await;

        assert!(!report.rtsp.ok);
        assert_eq!(report.rtsp.error.as_deref(), Some("Invalid RTSP URL"));
        assert!(prober.rtsp_calls.lock().unwrap().is_empty());
    }

    /// Full network path: a raw RTSP listener and an HLS mock standing in for the gateway.
    #[test_log::test(tokio::test)]
    async fn test_end_to_end_against_mock_servers() {
        let rtsp_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let rtsp_port = rtsp_listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = rtsp_listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\n").await.unwrap();
        });

        let hls_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cam1/index.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n#EXT-X-VERSION:3\n"))
            .expect(1)
            .mount(&hls_server)
            .await;
        let hls_port = hls_server.address().port();

        // The mock server plays the gateway, so its port is the gateway's HLS port.
        let gateway = MediaGateway {
            hls_port,
            ..MediaGateway::default()
        };
        let executor = StreamCheckExecutor::from_config(gateway, settings());
        let cam = camera(
            &format!("rtsp://127.0.0.1:{rtsp_port}/stream1"),
            Some(&format!("http://127.0.0.1:{hls_port}/Cam1/INDEX.M3U8")),
        );

        let report = executor.run(&cam).await;

        assert!(report.rtsp.ok, "{:?}", report.rtsp);
        assert_eq!(report.rtsp.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(report.rtsp.port, rtsp_port);
        assert!(report.hls.ok, "{:?}", report.hls);
        assert_eq!(report.hls.looks_like_manifest, Some(true));
        assert_eq!(report.hls.http_status, Some(200));
        assert_eq!(
            report.hls.url.as_deref(),
            Some(format!("http://127.0.0.1:{hls_port}/cam1/index.m3u8").as_str())
        );
    }
}
