// Shared transport configuration for building reqwest::Client instances.
//
// The reachability probe, the proxy verification request, and the
// speedtest adapter all build their clients here, so timeout, user agent,
// and proxy routing are decided in exactly one place.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::trace;

use crate::error::Error;

/// Default `User-Agent` sent on every request.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; netspeed/",
    env!("CARGO_PKG_VERSION"),
    "; +https://github.com/netspeed-rs/netspeed)"
);

/// An authenticated HTTP proxy (api-level mirror of core's `ProxyCredentials`).
///
/// Applied to both plain HTTP and HTTPS traffic, the explicit equivalent
/// of exporting `http_proxy` and `https_proxy`.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl ProxySettings {
    /// Proxy URL without credentials, safe to log.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    fn to_reqwest(&self) -> Result<reqwest::Proxy, Error> {
        let proxy = reqwest::Proxy::all(self.url())
            .map_err(|e| Error::ClientBuild(format!("invalid proxy {}: {e}", self.url())))?;
        Ok(proxy.basic_auth(&self.username, self.password.expose_secret()))
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Route every request through this proxy. `None` means a direct
    /// connection; ambient `HTTP_PROXY`-style variables are ignored.
    pub proxy: Option<ProxySettings>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.into(),
            proxy: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(self.user_agent.as_str());

        builder = match &self.proxy {
            Some(proxy) => {
                trace!(proxy = %proxy.url(), "routing through proxy");
                builder.proxy(proxy.to_reqwest()?)
            }
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|e| Error::ClientBuild(format!("failed to build HTTP client: {e}")))
    }

    /// Same transport, routed through `proxy` (or direct when `None`).
    pub fn with_proxy(mut self, proxy: Option<ProxySettings>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Same transport with a different request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
