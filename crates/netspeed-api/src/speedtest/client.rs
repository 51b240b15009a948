// speedtest.net HTTP client
//
// Thin adapter over the public speedtest.net server network: list
// servers, pick the lowest-latency candidate, then time a download ladder
// and an upload payload. The measurement itself is deliberately naive
// (sequential requests, wall-clock throughput); callers treat it as an
// opaque capability.

use std::time::{Duration, Instant};

use reqwest::Response;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::speedtest::models::Server;
use crate::transport::TransportConfig;

/// Server list endpoint used when none is configured.
pub const DEFAULT_SERVERS_URL: &str =
    "https://www.speedtest.net/api/js/servers?engine=js&https_functional=true";

/// Knobs for server selection and transfer sizes.
#[derive(Debug, Clone)]
pub struct MeasureSettings {
    /// How many servers (in list order) get a latency probe.
    pub candidate_servers: usize,
    /// Latency samples per candidate; the minimum wins.
    pub latency_samples: usize,
    /// Square image sizes fetched during the download phase.
    pub download_sizes: Vec<u32>,
    /// Payload size of each upload request, in bytes.
    pub upload_bytes: usize,
    /// Number of upload requests.
    pub upload_rounds: usize,
}

impl Default for MeasureSettings {
    fn default() -> Self {
        Self {
            candidate_servers: 5,
            latency_samples: 3,
            download_sizes: vec![350, 500, 750, 1000, 1500],
            upload_bytes: 1024 * 1024,
            upload_rounds: 4,
        }
    }
}

/// HTTP client for the speedtest.net server network.
pub struct SpeedtestClient {
    http: reqwest::Client,
    servers_url: Url,
    settings: MeasureSettings,
    timeout: Duration,
}

impl SpeedtestClient {
    /// Create a client from a `TransportConfig` (proxy and timeout included).
    pub fn new(
        servers_url: Url,
        transport: &TransportConfig,
        settings: MeasureSettings,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            servers_url,
            settings,
            timeout: transport.timeout,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, servers_url: Url, settings: MeasureSettings) -> Self {
        Self {
            http,
            servers_url,
            settings,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn settings(&self) -> &MeasureSettings {
        &self.settings
    }

    // ── Server discovery ─────────────────────────────────────────────

    /// Fetch the server list. An empty list is an error.
    pub async fn servers(&self) -> Result<Vec<Server>, Error> {
        debug!("GET {}", self.servers_url);
        let resp = self.send(self.http.get(self.servers_url.clone())).await?;
        let body = resp.text().await.map_err(|e| self.request_error(e))?;

        let servers: Vec<Server> = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        if servers.is_empty() {
            return Err(Error::NoServers);
        }
        debug!(count = servers.len(), "discovered speedtest servers");
        Ok(servers)
    }

    /// Minimum round trip to `latency.txt` over the configured sample count.
    pub async fn latency(&self, server: &Server) -> Result<Duration, Error> {
        let url = server.resource("latency.txt")?;
        let mut best: Option<Duration> = None;

        for _ in 0..self.settings.latency_samples.max(1) {
            let started = Instant::now();
            let resp = self.send(self.http.get(url.clone())).await?;
            resp.bytes().await.map_err(|e| self.request_error(e))?;
            let rtt = started.elapsed();
            best = Some(best.map_or(rtt, |b| b.min(rtt)));
        }

        // `latency_samples.max(1)` guarantees at least one sample.
        best.ok_or(Error::NoServers)
    }

    /// Probe the first `candidate_servers` entries and return the fastest,
    /// with its latency recorded. Candidates that fail the probe are skipped.
    pub async fn best_server(&self, servers: Vec<Server>) -> Result<Server, Error> {
        let mut best: Option<Server> = None;

        for mut server in servers.into_iter().take(self.settings.candidate_servers.max(1)) {
            match self.latency(&server).await {
                Ok(rtt) => {
                    trace!(server = %server.host, rtt_ms = rtt.as_millis(), "latency sample");
                    server.latency = Some(rtt);
                    let faster = best
                        .as_ref()
                        .and_then(|b| b.latency)
                        .is_none_or(|current| rtt < current);
                    if faster {
                        best = Some(server);
                    }
                }
                Err(e) => {
                    warn!(server = %server.host, error = %e, "skipping unresponsive server");
                }
            }
        }

        let best = best.ok_or(Error::NoServers)?;
        debug!(server = %best.host, sponsor = %best.sponsor, "selected best server");
        Ok(best)
    }

    // ── Throughput ───────────────────────────────────────────────────

    /// Download the image ladder and return bits per second.
    pub async fn download(&self, server: &Server) -> Result<f64, Error> {
        let mut total: u64 = 0;
        let started = Instant::now();

        for size in &self.settings.download_sizes {
            let url = server.resource(&format!("random{size}x{size}.jpg"))?;
            trace!("GET {}", url);
            let mut resp = self.send(self.http.get(url)).await?;
            while let Some(chunk) = resp.chunk().await.map_err(|e| self.request_error(e))? {
                total += chunk.len() as u64;
            }
        }

        let bps = bits_per_second(total, started.elapsed());
        debug!(bytes = total, bps, "download finished");
        Ok(bps)
    }

    /// Post the upload payload and return bits per second.
    pub async fn upload(&self, server: &Server) -> Result<f64, Error> {
        let url = server.upload_url()?;
        let payload = upload_payload(self.settings.upload_bytes);
        let mut total: u64 = 0;
        let started = Instant::now();

        for _ in 0..self.settings.upload_rounds.max(1) {
            trace!("POST {}", url);
            let resp = self
                .send(self.http.post(url.clone()).body(payload.clone()))
                .await?;
            resp.bytes().await.map_err(|e| self.request_error(e))?;
            total += payload.len() as u64;
        }

        let bps = bits_per_second(total, started.elapsed());
        debug!(bytes = total, bps, "upload finished");
        Ok(bps)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Response, Error> {
        let resp = builder.send().await.map_err(|e| self.request_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp)
    }

    fn request_error(&self, err: reqwest::Error) -> Error {
        Error::from_request(err, self.timeout)
    }
}

/// Repeating ASCII payload, the shape speedtest upload handlers expect.
fn upload_payload(len: usize) -> Vec<u8> {
    const PATTERN: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    PATTERN.iter().copied().cycle().take(len.max(1)).collect()
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn bits_per_second(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(0.001);
    (bytes as f64 * 8.0) / secs
}
