//! Clap derive structures for the `netspeed` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netspeed -- bandwidth measurement that finds its way through a proxy
#[derive(Debug, Parser)]
#[command(
    name = "netspeed",
    version,
    about = "Measure internet download and upload speed",
    long_about = "Measure download and upload bandwidth against the nearest speedtest.net server.\n\n\
        When the internet is not reachable directly, netspeed asks for the\n\
        credentials of an authenticated HTTP proxy, verifies them, and runs the\n\
        measurement through it.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'o', env = "NETSPEED_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Reachability probe timeout in seconds
    #[arg(long, env = "NETSPEED_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Reachability endpoint (overrides config)
    #[arg(long, env = "NETSPEED_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Never prompt for proxy credentials
    #[arg(long, global = true)]
    pub no_prompt: bool,

    #[command(flatten)]
    pub proxy: ProxyOpts,
}

/// Pre-configured proxy. The password is read from
/// `NETSPEED_PROXY_PASSWORD` or the config file, never from a flag.
#[derive(Debug, Args)]
#[command(next_help_heading = "Proxy")]
pub struct ProxyOpts {
    /// Proxy IPv4 address
    #[arg(long = "proxy-host", global = true)]
    pub host: Option<String>,

    /// Proxy port (1-65535)
    #[arg(long = "proxy-port", global = true)]
    pub port: Option<String>,

    /// Proxy username
    #[arg(long = "proxy-user", global = true)]
    pub user: Option<String>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Measure download and upload bandwidth
    #[command(alias = "r")]
    Run(RunArgs),

    /// Check direct reachability and the configured proxy, without measuring
    Check,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Number of measurements to run back to back
    #[arg(long, short = 'n', default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// Pause between measurements, in seconds
    #[arg(long, default_value = "0")]
    pub interval: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
