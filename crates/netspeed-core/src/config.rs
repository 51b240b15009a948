// ── Runtime probe configuration ──
//
// Describes *how* to probe and measure. Carries no file paths and never
// touches disk: the CLI loads its TOML config, applies flag overrides,
// and hands a `ProbeConfig` in.

use std::time::Duration;

use url::Url;

use netspeed_api::connectivity::DEFAULT_ENDPOINT;
use netspeed_api::speedtest::DEFAULT_SERVERS_URL;
use netspeed_api::transport::DEFAULT_USER_AGENT;
use netspeed_api::{MeasureSettings, TransportConfig};

/// Configuration for one `SessionController`.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Well-known endpoint for reachability and proxy verification.
    pub endpoint: Url,
    /// Hard timeout for the reachability and verification requests.
    pub probe_timeout: Duration,
    /// `User-Agent` sent on every request.
    pub user_agent: String,
    /// speedtest.net server list.
    pub servers_url: Url,
    /// Upper bound for each measurement phase.
    pub phase_timeout: Duration,
    /// Server selection and transfer sizes.
    pub measure: MeasureSettings,
    /// Verify a previously trusted proxy before every session instead of
    /// trusting it for the rest of the process.
    pub reverify_proxy: bool,
}

impl ProbeConfig {
    /// Transport for the short reachability/verification requests.
    pub fn probe_transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.probe_timeout,
            user_agent: self.user_agent.clone(),
            proxy: None,
        }
    }

    /// Transport for the long-running measurement requests.
    pub fn measure_transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.phase_timeout,
            user_agent: self.user_agent.clone(),
            proxy: None,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.parse().expect("default endpoint is a valid URL"),
            probe_timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.into(),
            servers_url: DEFAULT_SERVERS_URL
                .parse()
                .expect("default servers URL is a valid URL"),
            phase_timeout: Duration::from_secs(60),
            measure: MeasureSettings::default(),
            reverify_proxy: false,
        }
    }
}
