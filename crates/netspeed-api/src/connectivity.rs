// Reachability probe
//
// One GET against a fixed, well-known endpoint with a hard timeout.
// The same request, routed through a candidate proxy, doubles as the
// proxy verification request.

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::{ProxySettings, TransportConfig};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://www.google.com/";

/// Single-request reachability check.
///
/// Stateless apart from its configuration: every call builds a fresh
/// client so a direct check can never reuse a proxied connection (and
/// vice versa).
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    endpoint: Url,
    transport: TransportConfig,
}

impl ConnectivityProbe {
    pub fn new(endpoint: Url, transport: TransportConfig) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    /// The endpoint every check is sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issue the probe request, directly or through `proxy`.
    ///
    /// Succeeds only on HTTP 200; every other status is an
    /// [`Error::Status`]. No retries.
    pub async fn check(&self, proxy: Option<&ProxySettings>) -> Result<(), Error> {
        let transport = self.transport.clone().with_proxy(proxy.cloned());
        let client = transport.build_client()?;

        let resp = client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| Error::from_request(e, transport.timeout))?;

        let status = resp.status();
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(Error::Status {
                status: status.as_u16(),
                url: self.endpoint.to_string(),
            })
        }
    }

    /// `true` iff a direct request to the endpoint returned 200 in time.
    ///
    /// Never fails: transport errors, timeouts and non-200 statuses all
    /// read as unreachable.
    pub async fn is_reachable(&self) -> bool {
        match self.check(None).await {
            Ok(()) => {
                debug!(endpoint = %self.endpoint, "endpoint reachable");
                true
            }
            Err(e) => {
                debug!(endpoint = %self.endpoint, error = %e, "endpoint unreachable");
                false
            }
        }
    }
}
