//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};

use netspeed_config::PROXY_PASSWORD_ENV;
use netspeed_core::ProxyCredentials;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(field: &str) -> impl Fn(dialoguer::Error) -> CliError + '_ {
    move |e| CliError::Prompt {
        field: field.into(),
        reason: e.to_string(),
    }
}

const REDACTED: &str = "********";

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config::load_config()?;
            if cfg.proxy.password.is_some() {
                cfg.proxy.password = Some(REDACTED.into());
            }
            let format = config::output_format(global, &cfg);
            let out = output::render_single(
                format,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("<unrenderable: {e}>")),
                |_| config::config_path().display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("netspeed configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = Config::default();

    // 1. Default output format
    let formats = ["table", "json", "json-compact", "yaml", "plain"];
    let selection = Select::new()
        .with_prompt("Default output format")
        .items(&formats)
        .default(0)
        .interact()
        .map_err(prompt_err("output format"))?;
    cfg.defaults.output = formats.get(selection).copied().unwrap_or("table").into();

    // 2. Optional pre-configured proxy
    let use_proxy = Confirm::new()
        .with_prompt("Always measure through an HTTP proxy?")
        .default(false)
        .interact()
        .map_err(prompt_err("proxy choice"))?;

    if use_proxy {
        let host: String = Input::new()
            .with_prompt("Proxy IP address")
            .interact_text()
            .map_err(prompt_err("proxy host"))?;
        let port: String = Input::new()
            .with_prompt("Proxy port")
            .default("8080".into())
            .interact_text()
            .map_err(prompt_err("proxy port"))?;
        let user: String = Input::new()
            .with_prompt("Proxy username")
            .interact_text()
            .map_err(prompt_err("proxy username"))?;

        let store_choices = [
            format!("Read from {PROXY_PASSWORD_ENV} at run time (recommended)"),
            "Save to config file (plaintext)".to_owned(),
        ];
        let store = Select::new()
            .with_prompt("Where should the proxy password come from?")
            .items(&store_choices)
            .default(0)
            .interact()
            .map_err(prompt_err("password storage"))?;

        let password = if store == 0 {
            None
        } else {
            Some(rpassword::prompt_password("Proxy password: ").map_err(|e| {
                CliError::Prompt {
                    field: "proxy password".into(),
                    reason: e.to_string(),
                }
            })?)
        };

        // Validate the shape now; the env-sourced password is checked at run time.
        let validated = ProxyCredentials::validate(
            &user,
            password.as_deref().unwrap_or("placeholder"),
            &host,
            &port,
        )?;

        cfg.proxy.host = Some(validated.host().to_string());
        cfg.proxy.port = Some(validated.port());
        cfg.proxy.user = Some(user);
        cfg.proxy.password = password;
    }

    // 3. Write config
    let path = config::save_config(&cfg)?;

    eprintln!("\nConfiguration written to {}", path.display());
    if use_proxy && cfg.proxy.password.is_none() {
        eprintln!("  Export {PROXY_PASSWORD_ENV} before running measurements.");
    }
    eprintln!("\n  Test it: netspeed check");

    Ok(())
}
