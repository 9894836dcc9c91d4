//! RTSP liveness probe.
//!
//! Opens a TCP connection to the camera, sends a bare `OPTIONS` request and classifies the status
//! line of the reply. No credentials are sent and no session is set up: a `401 Unauthorized` is
//! as good as a `200 OK` here, since either one proves an RTSP server is listening.
//!
//! A single deadline bounds the whole exchange (connect, write, read). When it fires the in-flight
//! future is dropped together with its socket, so there is exactly one outcome per call.

use crate::probes::models::{DEFAULT_RTSP_PORT, RtspProbeResult};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::{Host, Url};

const USER_AGENT: &str = concat!("camctl/", env!("CARGO_PKG_VERSION"));
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
/// Replies whose header block exceeds this are not treated as RTSP.
const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Where an RTSP probe connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtspEndpoint {
    pub host: String,
    pub port: u16,
}

impl RtspEndpoint {
    /// Extract host and port from an RTSP URL. Port defaults to 554.
    pub fn from_url(raw: &str) -> Option<Self> {
        Self::resolve(raw).map(|(endpoint, _)| endpoint)
    }

    /// Endpoint plus the serialized URL to send in the request line.
    ///
    /// The serialized form is percent-encoded, so it never carries whitespace or line breaks
    /// even when the configured string did.
    pub fn resolve(raw: &str) -> Option<(Self, String)> {
        let url = Url::parse(raw.trim()).ok()?;
        let host = match url.host()? {
            Host::Domain(domain) if !domain.is_empty() => domain.to_string(),
            Host::Domain(_) => return None,
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };
        let endpoint = Self {
            host,
            port: url.port().unwrap_or(DEFAULT_RTSP_PORT),
        };
        Some((endpoint, url.into()))
    }

    /// Endpoint for a bare camera address, on the default RTSP port.
    pub fn from_ip_address(raw: &str) -> Option<Self> {
        let host = raw.trim();
        if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c.is_control()) {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            port: DEFAULT_RTSP_PORT,
        })
    }

    /// The URL to put in the request line when the configured one is unusable.
    pub fn request_url(&self) -> String {
        if self.host.contains(':') {
            format!("rtsp://[{}]:{}/", self.host, self.port)
        } else {
            format!("rtsp://{}:{}/", self.host, self.port)
        }
    }
}

/// Probe the RTSP server named by `rtsp_url`.
///
/// An unparsable URL is reported without touching the network.
pub async fn probe_rtsp(rtsp_url: &str, timeout: Duration) -> RtspProbeResult {
    match RtspEndpoint::resolve(rtsp_url) {
        Some((endpoint, request_url)) => probe_rtsp_endpoint(&endpoint, &request_url, timeout).await,
        None => RtspProbeResult::failed(None, DEFAULT_RTSP_PORT, 0, "Invalid RTSP URL"),
    }
}

/// Probe `endpoint`, sending `request_url` in the `OPTIONS` request line.
#[tracing::instrument(skip(request_url), fields(host = %endpoint.host, port = endpoint.port))]
pub async fn probe_rtsp_endpoint(endpoint: &RtspEndpoint, request_url: &str, timeout: Duration) -> RtspProbeResult {
    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, exchange(endpoint, request_url)).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let host = Some(endpoint.host.clone());

    match outcome {
        Err(_) => {
            tracing::debug!(elapsed_ms, "RTSP probe timed out");
            RtspProbeResult::failed(host, endpoint.port, elapsed_ms, format!("Timeout after {}ms", timeout.as_millis()))
        }
        Ok(Err(error)) => {
            tracing::debug!(elapsed_ms, %error, "RTSP probe failed");
            RtspProbeResult::failed(host, endpoint.port, elapsed_ms, error)
        }
        Ok(Ok(status)) => {
            let ok = matches!(status.code, 200 | 401);
            tracing::debug!(elapsed_ms, code = status.code, ok, "RTSP probe answered");
            RtspProbeResult {
                host,
                port: endpoint.port,
                ok,
                elapsed_ms,
                status_code: Some(status.code),
                error: (!ok).then(|| format!("RTSP {} {}", status.code, status.reason).trim_end().to_string()),
            }
        }
    }
}

/// Parsed `RTSP/<version> <code> <reason>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusLine {
    pub code: u16,
    pub reason: String,
}

/// Connect, send `OPTIONS`, and read until the end of the response headers.
///
/// Errors are already in their user-facing form.
async fn exchange(endpoint: &RtspEndpoint, request_url: &str) -> Result<StatusLine, String> {
    let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|e| e.to_string())?;

    let request = format!("OPTIONS {request_url} RTSP/1.0\r\nCSeq: 1\r\nUser-Agent: {USER_AGENT}\r\n\r\n");
    stream.write_all(request.as_bytes()).await.map_err(|e| e.to_string())?;

    // The reply may arrive split over several segments; nothing is interpreted until the
    // header terminator is in the buffer.
    let mut response = Vec::with_capacity(512);
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let read = stream.read(&mut chunk).await.map_err(|e| e.to_string())?;
        if read == 0 {
            return Err(NO_RESPONSE.to_string());
        }
        response.extend_from_slice(&chunk[..read]);
        if let Some(pos) = find_terminator(&response) {
            break pos;
        }
        if response.len() > MAX_HEADER_BYTES {
            return Err(NO_RESPONSE.to_string());
        }
    };

    let _ = stream.shutdown().await;

    let head = String::from_utf8_lossy(&response[..header_end]);
    let first_line = head.lines().next().unwrap_or_default();
    parse_status_line(first_line).ok_or_else(|| NO_RESPONSE.to_string())
}

const NO_RESPONSE: &str = "No RTSP response";

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len()).position(|w| w == HEADER_TERMINATOR)
}

/// `RTSP/<major>.<minor>`, whitespace, a three-digit code, then an optional reason.
pub(crate) fn parse_status_line(line: &str) -> Option<StatusLine> {
    let rest = line.trim_end().strip_prefix("RTSP/")?;
    let (version, rest) = rest.split_at(rest.find(|c: char| c.is_ascii_whitespace())?);

    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let (major, minor) = version.split_once('.')?;
    if !is_number(major) || !is_number(minor) {
        return None;
    }

    let rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let code = rest.get(..3).filter(|code| is_number(code))?;

    Some(StatusLine {
        code: code.parse().ok()?,
        reason: rest[3..].trim().to_string(),
    })
}
