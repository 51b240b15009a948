// ── Session context ──
//
// Explicit replacement for process-wide proxy environment variables.
// Holds the proxy the network layer must use; written only by the
// resolver after a successful verification (or seeded at startup from
// configuration), read whenever a measurement transport is built.

use serde::Serialize;
use strum::Display;

use crate::credentials::{CredentialField, ProxyCredentials, ValidationError};

/// How the committed proxy got into the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProxySource {
    /// Seeded from configuration or command-line flags; never verified.
    Configured,
    /// Entered by the user and verified with a probe request.
    Verified,
}

/// Per-process session state passed explicitly to the resolver and the
/// backend factory.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    proxy: Option<(ProxyCredentials, ProxySource)>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that starts with a pre-configured (unverified) proxy.
    pub fn with_configured_proxy(proxy: ProxyCredentials) -> Self {
        Self {
            proxy: Some((proxy, ProxySource::Configured)),
        }
    }

    pub fn proxy(&self) -> Option<&ProxyCredentials> {
        self.proxy.as_ref().map(|(p, _)| p)
    }

    pub fn proxy_source(&self) -> Option<ProxySource> {
        self.proxy.as_ref().map(|(_, s)| *s)
    }

    /// Commit a proxy that just passed verification.
    pub(crate) fn commit(&mut self, proxy: ProxyCredentials) {
        self.proxy = Some((proxy, ProxySource::Verified));
    }

    /// Drop the committed proxy (trusted proxy failed re-verification).
    pub(crate) fn clear(&mut self) {
        self.proxy = None;
    }
}

/// Result of one resolution: how this session reaches the internet.
#[derive(Debug, Clone)]
pub enum ConnectionState {
    /// No proxy needed; the reachability probe succeeded.
    Direct,
    /// Proxy required; credentials verified (or trusted from a previous
    /// resolution).
    Proxied(ProxyCredentials),
    /// No usable route for this session.
    Unresolved(UnresolvedReason),
}

impl ConnectionState {
    pub fn proxy(&self) -> Option<&ProxyCredentials> {
        match self {
            Self::Proxied(p) => Some(p),
            Self::Direct | Self::Unresolved(_) => None,
        }
    }
}

/// Why resolution ended without a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The user dismissed the prompt for `field`.
    CancelledByUser { field: CredentialField },
    /// The collected input failed validation.
    Invalid(ValidationError),
    /// The verification request through the candidate proxy failed.
    ProxyAuthFailed { endpoint: String, reason: String },
    /// Direct access failed and no credentials could be collected.
    Unreachable,
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CancelledByUser { field } => {
                write!(f, "proxy setup cancelled at the {field} prompt")
            }
            Self::Invalid(err) => write!(f, "invalid proxy settings: {err}"),
            Self::ProxyAuthFailed { endpoint, reason } => {
                write!(f, "proxy {endpoint} rejected the verification request: {reason}")
            }
            Self::Unreachable => f.write_str(
                "no direct internet connection and no proxy credentials available",
            ),
        }
    }
}
