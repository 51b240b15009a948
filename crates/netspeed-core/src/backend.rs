// ── Measurement backend seam ──
//
// The bandwidth measurement itself is an external capability. The runner
// drives any `MeasurementBackend` through the same four steps; the
// production implementation is the speedtest.net adapter from
// netspeed-api, built per session so it routes through the session's
// proxy.

use std::future::Future;

use url::Url;

use netspeed_api::{MeasureSettings, ProxySettings, Server, SpeedtestClient, TransportConfig};

use crate::config::ProbeConfig;
use crate::credentials::ProxyCredentials;
use crate::error::CoreError;
use crate::model::ServerInfo;

/// The four-step measurement capability the runner drives.
pub trait MeasurementBackend: Send + Sync + 'static {
    type Server: Send + Sync + 'static;

    fn discover_servers(&self)
    -> impl Future<Output = Result<Vec<Self::Server>, CoreError>> + Send;

    fn select_best(
        &self,
        servers: Vec<Self::Server>,
    ) -> impl Future<Output = Result<Self::Server, CoreError>> + Send;

    /// Download throughput in bits per second.
    fn measure_download(
        &self,
        server: &Self::Server,
    ) -> impl Future<Output = Result<f64, CoreError>> + Send;

    /// Upload throughput in bits per second.
    fn measure_upload(
        &self,
        server: &Self::Server,
    ) -> impl Future<Output = Result<f64, CoreError>> + Send;

    /// Display data for the selected server.
    fn describe(&self, server: &Self::Server) -> ServerInfo;
}

/// Builds a backend bound to the session's route (direct or proxied).
pub trait BackendFactory: Send + Sync {
    type Backend: MeasurementBackend;

    fn build(&self, proxy: Option<&ProxyCredentials>) -> Result<Self::Backend, CoreError>;
}

// ── speedtest.net ────────────────────────────────────────────────────

impl MeasurementBackend for SpeedtestClient {
    type Server = Server;

    async fn discover_servers(&self) -> Result<Vec<Server>, CoreError> {
        Ok(self.servers().await?)
    }

    async fn select_best(&self, servers: Vec<Server>) -> Result<Server, CoreError> {
        Ok(self.best_server(servers).await?)
    }

    async fn measure_download(&self, server: &Server) -> Result<f64, CoreError> {
        Ok(self.download(server).await?)
    }

    async fn measure_upload(&self, server: &Server) -> Result<f64, CoreError> {
        Ok(self.upload(server).await?)
    }

    fn describe(&self, server: &Server) -> ServerInfo {
        ServerInfo {
            id: server.id.clone(),
            name: server.name.clone(),
            sponsor: server.sponsor.clone(),
            country: server.country.clone(),
            host: server.host.clone(),
            latency_ms: server.latency.map(|d| d.as_secs_f64() * 1000.0),
        }
    }
}

/// Builds a [`SpeedtestClient`] per session.
#[derive(Debug, Clone)]
pub struct SpeedtestFactory {
    servers_url: Url,
    transport: TransportConfig,
    settings: MeasureSettings,
}

impl SpeedtestFactory {
    pub fn new(servers_url: Url, transport: TransportConfig, settings: MeasureSettings) -> Self {
        Self {
            servers_url,
            transport,
            settings,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            config.servers_url.clone(),
            config.measure_transport(),
            config.measure.clone(),
        )
    }
}

impl BackendFactory for SpeedtestFactory {
    type Backend = SpeedtestClient;

    fn build(&self, proxy: Option<&ProxyCredentials>) -> Result<SpeedtestClient, CoreError> {
        let transport = self
            .transport
            .clone()
            .with_proxy(proxy.map(ProxySettings::from));
        Ok(SpeedtestClient::new(
            self.servers_url.clone(),
            &transport,
            self.settings.clone(),
        )?)
    }
}
