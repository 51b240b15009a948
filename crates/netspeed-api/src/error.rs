use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `netspeed-api` crate.
///
/// Covers every failure mode of the wire layer: client construction,
/// transport, status checks, and payload decoding. `netspeed-core` maps
/// these into session-level outcomes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, proxy refused, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The HTTP client could not be built (bad proxy URL, TLS backend failure).
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Responses ───────────────────────────────────────────────────
    /// The endpoint answered with a status other than the one required.
    #[error("Unexpected HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Speedtest ───────────────────────────────────────────────────
    /// The server list was empty, or no candidate answered a latency probe.
    #[error("No usable speedtest servers")]
    NoServers,
}

impl Error {
    /// Classify a `reqwest` failure, promoting timeouts to [`Error::Timeout`].
    pub(crate) fn from_request(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                timeout_secs: timeout.as_secs(),
            }
        } else {
            Self::Transport(err)
        }
    }

    /// Returns `true` if the failure happened while talking to a proxy
    /// (the proxy rejected the tunnel or demanded authentication).
    pub fn is_proxy_rejection(&self) -> bool {
        matches!(self, Self::Status { status: 407, .. })
            || matches!(self, Self::Transport(e) if e.is_connect())
    }
}
