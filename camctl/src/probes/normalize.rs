//! Canonicalization of player URLs that point at the local media gateway.
//!
//! The gateway republishes each camera's RTSP feed as HLS and WebRTC (WHEP) on two fixed ports.
//! Its path routing is case-sensitive and conventionally lowercase, and operators frequently paste
//! URLs like `http://localhost:8888/Cam1` or `http://localhost:8889/cam1/` into the inventory. Those
//! URLs are rewritten here into the exact form the gateway serves:
//!
//! ```text
//! http://localhost:8888/Cam1/INDEX.M3U8  ->  http://localhost:8888/cam1/index.m3u8
//! http://localhost:8888/Cam1/            ->  http://localhost:8888/cam1/index.m3u8
//! http://localhost:8889/Cam1             ->  http://localhost:8889/cam1/whep
//! ```
//!
//! Anything that does not target the gateway (another host, another port, or a string that is not
//! a URL at all) is returned trimmed but otherwise untouched. Every function here is pure, total
//! and idempotent.

use serde::{Deserialize, Serialize};
use url::Url;

/// Default port the gateway serves HLS playlists on.
pub const DEFAULT_HLS_PORT: u16 = 8888;
/// Default port the gateway serves WHEP signaling on.
pub const DEFAULT_WEBRTC_PORT: u16 = 8889;

const MANIFEST_SUFFIX: &str = ".m3u8";
const MANIFEST_FILE: &str = "/index.m3u8";
const WHEP_SUFFIX: &str = "/whep";

/// The local media gateway convention: which hosts and ports identify it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaGateway {
    /// Hostnames that address the gateway (compared case-insensitively)
    pub hosts: Vec<String>,
    /// Port serving HLS playlists
    pub hls_port: u16,
    /// Port serving WebRTC (WHEP) signaling
    pub webrtc_port: u16,
}

impl Default for MediaGateway {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            hls_port: DEFAULT_HLS_PORT,
            webrtc_port: DEFAULT_WEBRTC_PORT,
        }
    }
}

impl MediaGateway {
    /// Whether `url` addresses this gateway's HLS port.
    pub fn is_gateway_hls(&self, url: &str) -> bool {
        self.parse_for_port(url.trim(), self.hls_port).is_some()
    }

    /// Normalize an HLS playlist URL. See the module docs for the rules.
    pub fn normalize_hls_url(&self, raw: Option<&str>) -> Option<String> {
        let trimmed = non_empty(raw)?;
        let Some(mut url) = self.parse_for_port(trimmed, self.hls_port) else {
            return Some(trimmed.to_string());
        };

        let path = url.path().to_lowercase();
        let path = if path.ends_with(MANIFEST_SUFFIX) {
            path
        } else {
            format!("{}{}", path.trim_end_matches('/'), MANIFEST_FILE)
        };
        url.set_path(&path);
        Some(url.to_string())
    }

    /// Normalize a WHEP signaling URL. See the module docs for the rules.
    pub fn normalize_whep_url(&self, raw: Option<&str>) -> Option<String> {
        let trimmed = non_empty(raw)?;
        let Some(mut url) = self.parse_for_port(trimmed, self.webrtc_port) else {
            return Some(trimmed.to_string());
        };

        // Trailing slashes go first so "/cam1/whep/" can never become "/cam1/whep/whep".
        let lowered = url.path().to_lowercase();
        let path = lowered.trim_end_matches('/');
        let path = if path.ends_with(WHEP_SUFFIX) {
            path.to_string()
        } else {
            format!("{path}{WHEP_SUFFIX}")
        };
        url.set_path(&path);
        Some(url.to_string())
    }

    /// Point a URL on either gateway port at `client_host`, the host the browser reached us by.
    ///
    /// The inventory usually stores `localhost` URLs, which only resolve on the server itself.
    /// URLs on other ports, and hosts that cannot be set, are returned unchanged.
    pub fn rewrite_for_client(&self, raw: &str, client_host: &str) -> String {
        let Ok(mut url) = Url::parse(raw) else {
            return raw.to_string();
        };
        let on_gateway_port = matches!(url.port(), Some(port) if port == self.hls_port || port == self.webrtc_port);
        if !on_gateway_port || url.set_host(Some(client_host)).is_err() {
            return raw.to_string();
        }
        url.to_string()
    }

    /// Parse `candidate` and return it only if it points at one of our hosts on `port`.
    fn parse_for_port(&self, candidate: &str, port: u16) -> Option<Url> {
        let url = Url::parse(candidate).ok()?;
        let host = url.host_str()?;
        let is_gateway_host = self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host));
        (is_gateway_host && url.port() == Some(port)).then_some(url)
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// [`MediaGateway::normalize_hls_url`] against the default gateway ports.
pub fn normalize_hls_url(raw: Option<&str>) -> Option<String> {
    MediaGateway::default().normalize_hls_url(raw)
}

/// [`MediaGateway::normalize_whep_url`] against the default gateway ports.
pub fn normalize_whep_url(raw: Option<&str>) -> Option<String> {
    MediaGateway::default().normalize_whep_url(raw)
}
