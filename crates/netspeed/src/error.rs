//! CLI error types with miette diagnostics.
//!
//! Maps session outcomes, validation and `ConfigError` into user-facing
//! errors with actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use netspeed_config::ConfigError;
use netspeed_core::{CredentialField, SessionOutcome, ValidationError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const PROXY_AUTH: i32 = 3;
    pub const CANCELLED: i32 = 4;
    pub const BUSY: i32 = 5;
    pub const UNREACHABLE: i32 = 7;
    pub const MEASUREMENT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connectivity ─────────────────────────────────────────────────

    #[error("No internet connection and no proxy available")]
    #[diagnostic(
        code(netspeed::unreachable),
        help(
            "The reachability check failed and proxy prompting is disabled.\n\
             Run interactively, or preconfigure a proxy with --proxy-host/--proxy-port/--proxy-user\n\
             and NETSPEED_PROXY_PASSWORD."
        )
    )]
    Unreachable,

    #[error("Proxy {endpoint} rejected the verification request")]
    #[diagnostic(
        code(netspeed::proxy_auth_failed),
        help("Check the proxy address, username and password.\nReason: {reason}")
    )]
    ProxyAuthFailed { endpoint: String, reason: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Proxy setup cancelled at the {field} prompt")]
    #[diagnostic(code(netspeed::cancelled))]
    Cancelled { field: CredentialField },

    #[error("Interrupted")]
    #[diagnostic(code(netspeed::interrupted))]
    Interrupted,

    #[error("Failed to read {field}: {reason}")]
    #[diagnostic(code(netspeed::prompt))]
    Prompt { field: String, reason: String },

    // ── Measurement ──────────────────────────────────────────────────

    #[error("A bandwidth measurement is already running")]
    #[diagnostic(
        code(netspeed::busy),
        help("Wait for the current measurement to finish, then try again.")
    )]
    Busy,

    #[error("Bandwidth measurement failed while {phase}")]
    #[diagnostic(
        code(netspeed::measurement_failed),
        help("{message}\nRetry later, or raise measurement.phase_timeout in the config file.")
    )]
    MeasurementFailed { phase: String, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netspeed::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(netspeed::config),
        help("Inspect the file with: netspeed config show\nLocation: netspeed config path")
    )]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable => exit_code::UNREACHABLE,
            Self::ProxyAuthFailed { .. } => exit_code::PROXY_AUTH,
            Self::Cancelled { .. } => exit_code::CANCELLED,
            Self::Busy => exit_code::BUSY,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::MeasurementFailed { .. } => exit_code::MEASUREMENT,
            Self::Validation { .. } | Self::Prompt { .. } => exit_code::USAGE,
            Self::Config(ConfigError::Proxy(_) | ConfigError::Validation { .. }) => {
                exit_code::USAGE
            }
            Self::Config(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }

    /// `Ok` for a completed session, the matching error otherwise.
    pub fn from_outcome(outcome: SessionOutcome) -> Result<netspeed_core::SpeedResult, Self> {
        match outcome {
            SessionOutcome::Completed(result) => Ok(result),
            SessionOutcome::CancelledByUser { field } => Err(Self::Cancelled { field }),
            SessionOutcome::Validation(err) => Err(err.into()),
            SessionOutcome::ProxyAuthFailed { endpoint, reason } => {
                Err(Self::ProxyAuthFailed { endpoint, reason })
            }
            SessionOutcome::Unreachable => Err(Self::Unreachable),
            SessionOutcome::MeasurementFailed(err) => Err(Self::MeasurementFailed {
                phase: err.phase.to_string(),
                message: err.message,
            }),
            SessionOutcome::AlreadyRunning => Err(Self::Busy),
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::MissingField(field) => field.to_string(),
            ValidationError::InvalidHost => CredentialField::Host.to_string(),
            ValidationError::InvalidPort => CredentialField::Port.to_string(),
        };
        Self::Validation {
            field: format!("proxy {field}"),
            reason: err.to_string(),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Proxy(e) => e.into(),
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other),
        }
    }
}
