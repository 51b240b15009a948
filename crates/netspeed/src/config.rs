//! CLI configuration -- thin wrapper around `netspeed_config`.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--endpoint, --timeout, --proxy-*).

use std::time::Duration;

use url::Url;

use netspeed_core::{ProbeConfig, ProxyCredentials};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use netspeed_config::{
    Config, ProxyOverrides, config_path, load_config, resolve_proxy_seed, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Everything a session needs, resolved from file + env + flags.
#[derive(Debug)]
pub struct Resolved {
    pub probe: ProbeConfig,
    pub seed: Option<ProxyCredentials>,
}

/// Translate the config file + global flags into core settings.
///
/// CLI flag overrides take priority over file values.
pub fn resolve(cfg: &Config, global: &GlobalOpts) -> Result<Resolved, CliError> {
    let mut probe = cfg.to_probe_config()?;

    // 1. Endpoint (flag > env > file)
    if let Some(ref raw) = global.endpoint {
        probe.endpoint = Url::parse(raw).map_err(|e| CliError::Validation {
            field: "endpoint".into(),
            reason: format!("invalid URL {raw}: {e}"),
        })?;
    }

    // 2. Probe timeout
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        probe.probe_timeout = Duration::from_secs(secs);
    }

    // 3. Proxy seed (flags > file; password from env or file only)
    let overrides = ProxyOverrides {
        host: global.proxy.host.clone(),
        port: global.proxy.port.clone(),
        user: global.proxy.user.clone(),
        password: None,
    };
    let seed = resolve_proxy_seed(&cfg.proxy, &overrides)?;

    Ok(Resolved { probe, seed })
}

/// Output format: flag/env first, then `[defaults] output`.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global.output.unwrap_or_else(|| match cfg.defaults.output.as_str() {
        "json" => OutputFormat::Json,
        "json-compact" | "json_compact" => OutputFormat::JsonCompact,
        "yaml" => OutputFormat::Yaml,
        "plain" => OutputFormat::Plain,
        _ => OutputFormat::Table,
    })
}

/// Color mode: flag first, then `[defaults] color`.
pub fn color_mode(global: &GlobalOpts, cfg: &Config) -> ColorMode {
    global.color.unwrap_or_else(|| match cfg.defaults.color.as_str() {
        "always" => ColorMode::Always,
        "never" => ColorMode::Never,
        _ => ColorMode::Auto,
    })
}
