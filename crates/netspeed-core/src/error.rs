// ── Core error types ──
//
// Errors raised inside netspeed-core. Consumers never see reqwest or
// serde failures directly; the `From<netspeed_api::Error>` impl folds
// wire-level errors into these variants.

use serde::Serialize;
use thiserror::Error;

use crate::model::Phase;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Single-flight ────────────────────────────────────────────────
    #[error("A bandwidth measurement is already running")]
    AlreadyRunning,

    // ── Measurement ──────────────────────────────────────────────────
    #[error(transparent)]
    Measurement(#[from] MeasurementError),

    // ── Wire-level failures (wrapped, not exposed raw) ───────────────
    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// A measurement that failed part-way. Carries the phase it died in;
/// partial numbers are never kept.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("measurement failed while {phase}: {message}")]
pub struct MeasurementError {
    pub phase: Phase,
    pub message: String,
}

impl MeasurementError {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netspeed_api::Error> for CoreError {
    fn from(err: netspeed_api::Error) -> Self {
        let rejected_by_proxy = err.is_proxy_rejection();
        match err {
            netspeed_api::Error::Transport(e) => CoreError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                reason: e.to_string(),
            },
            netspeed_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            netspeed_api::Error::Status { status, url } => CoreError::Http {
                status,
                message: if rejected_by_proxy {
                    "proxy authentication required".into()
                } else {
                    format!("unexpected response from {url}")
                },
            },
            netspeed_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            netspeed_api::Error::ClientBuild(message) => CoreError::Config { message },
            other @ (netspeed_api::Error::Deserialization { .. }
            | netspeed_api::Error::NoServers) => CoreError::Backend {
                message: other.to_string(),
            },
        }
    }
}
