//! Configuration for the netspeed CLI.
//!
//! TOML file + `NETSPEED_` environment overlay, proxy seed resolution
//! (env + plaintext), and translation to `netspeed_core::ProbeConfig`.
//! The CLI adds flag-aware wrappers on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netspeed_core::{ProbeConfig, ProxyCredentials, ValidationError};

/// Environment variable holding the proxy password.
pub const PROXY_PASSWORD_ENV: &str = "NETSPEED_PROXY_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("invalid proxy settings: {0}")]
    Proxy(#[from] ValidationError),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub probe: ProbeSection,

    #[serde(default)]
    pub measurement: MeasurementSection,

    #[serde(default)]
    pub proxy: ProxySection,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// Reachability probe settings.
#[derive(Debug, Deserialize, Serialize)]
pub struct ProbeSection {
    /// Well-known endpoint for reachability and proxy verification.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Probe timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub timeout: u64,

    /// Override the `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout: default_probe_timeout(),
            user_agent: None,
        }
    }
}

fn default_endpoint() -> String {
    ProbeConfig::default().endpoint.to_string()
}
fn default_probe_timeout() -> u64 {
    5
}

/// Bandwidth measurement settings.
#[derive(Debug, Deserialize, Serialize)]
pub struct MeasurementSection {
    #[serde(default = "default_servers_url")]
    pub servers_url: String,

    /// Servers (in list order) that get a latency probe.
    #[serde(default = "default_candidate_servers")]
    pub candidate_servers: usize,

    /// Upper bound per measurement phase, in seconds.
    #[serde(default = "default_phase_timeout")]
    pub phase_timeout: u64,

    /// Payload size of each upload request, in bytes.
    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: usize,
}

impl Default for MeasurementSection {
    fn default() -> Self {
        Self {
            servers_url: default_servers_url(),
            candidate_servers: default_candidate_servers(),
            phase_timeout: default_phase_timeout(),
            upload_bytes: default_upload_bytes(),
        }
    }
}

fn default_servers_url() -> String {
    ProbeConfig::default().servers_url.to_string()
}
fn default_candidate_servers() -> usize {
    ProbeConfig::default().measure.candidate_servers
}
fn default_phase_timeout() -> u64 {
    ProbeConfig::default().phase_timeout.as_secs()
}
fn default_upload_bytes() -> usize {
    ProbeConfig::default().measure.upload_bytes
}

/// A pre-configured proxy. Nothing here is written by the tool itself
/// except through `config init`, and never from interactive prompts.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProxySection {
    /// Proxy IPv4 address.
    pub host: Option<String>,

    pub port: Option<u16>,

    pub user: Option<String>,

    /// Password (plaintext, prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Verify a trusted proxy before every session.
    #[serde(default)]
    pub reverify: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("rs", "netspeed", "netspeed").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netspeed");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment. A missing file is not
/// an error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NETSPEED_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Proxy seed resolution ───────────────────────────────────────────

/// Proxy fields supplied outside the config file (command-line flags).
#[derive(Debug, Default, Clone)]
pub struct ProxyOverrides {
    pub host: Option<String>,
    pub port: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
}

/// Resolve the proxy password (no CLI flag step).
///
/// Chain: `NETSPEED_PROXY_PASSWORD`, then the env var named by
/// `password_env`, then plaintext in config.
pub fn resolve_proxy_password(section: &ProxySection) -> Option<SecretString> {
    // 1. Well-known env var
    if let Ok(pw) = std::env::var(PROXY_PASSWORD_ENV) {
        return Some(SecretString::from(pw));
    }

    // 2. Section's password_env → env var lookup
    if let Some(ref env_name) = section.password_env {
        if let Ok(pw) = std::env::var(env_name) {
            return Some(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    section.password.clone().map(SecretString::from)
}

/// Build the startup proxy seed: flags win over the config file.
///
/// `Ok(None)` when no proxy host is configured anywhere. A configured
/// host with missing or invalid companions is an error, so a typo never
/// silently falls back to a direct connection.
pub fn resolve_proxy_seed(
    section: &ProxySection,
    overrides: &ProxyOverrides,
) -> Result<Option<ProxyCredentials>, ConfigError> {
    let Some(host) = overrides.host.clone().or_else(|| section.host.clone()) else {
        return Ok(None);
    };

    let user = overrides
        .user
        .clone()
        .or_else(|| section.user.clone())
        .unwrap_or_default();
    let port = overrides
        .port
        .clone()
        .or_else(|| section.port.map(|p| p.to_string()))
        .unwrap_or_default();
    let password = overrides
        .password
        .clone()
        .or_else(|| resolve_proxy_password(section));
    let password = password.as_ref().map_or("", |p| p.expose_secret());

    Ok(Some(ProxyCredentials::validate(
        &user, password, &host, &port,
    )?))
}

// ── Translation to core ─────────────────────────────────────────────

impl Config {
    /// Build a `ProbeConfig` from the file settings, no CLI overrides.
    pub fn to_probe_config(&self) -> Result<ProbeConfig, ConfigError> {
        let mut probe = ProbeConfig {
            endpoint: parse_url("probe.endpoint", &self.probe.endpoint)?,
            probe_timeout: positive_secs("probe.timeout", self.probe.timeout)?,
            servers_url: parse_url("measurement.servers_url", &self.measurement.servers_url)?,
            phase_timeout: positive_secs("measurement.phase_timeout", self.measurement.phase_timeout)?,
            reverify_proxy: self.proxy.reverify,
            ..ProbeConfig::default()
        };
        if let Some(ref ua) = self.probe.user_agent {
            probe.user_agent.clone_from(ua);
        }
        if self.measurement.candidate_servers == 0 {
            return Err(ConfigError::Validation {
                field: "measurement.candidate_servers".into(),
                reason: "must be at least 1".into(),
            });
        }
        probe.measure.candidate_servers = self.measurement.candidate_servers;
        probe.measure.upload_bytes = self.measurement.upload_bytes;
        Ok(probe)
    }
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}
