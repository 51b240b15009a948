// netspeed-core: proxy resolution and single-flight bandwidth probing
// between netspeed-api and the CLI.

pub mod backend;
pub mod config;
pub mod connectivity;
pub mod context;
pub mod credentials;
pub mod error;
pub mod model;
pub mod resolver;
pub mod runner;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{BackendFactory, MeasurementBackend, SpeedtestFactory};
pub use config::ProbeConfig;
pub use connectivity::Connectivity;
pub use context::{ConnectionState, ProxySource, SessionContext, UnresolvedReason};
pub use credentials::{CredentialField, ProxyCredentials, ValidationError};
pub use error::{CoreError, MeasurementError};
pub use model::{Phase, ProbeRun, ServerInfo, SpeedResult};
pub use resolver::{CredentialPrompt, ProxyResolver};
pub use runner::{ProbeEvent, ProbeRunner, RunHandle};
pub use session::{ConnectivityReport, Presenter, ProxyCheck, SessionController, SessionOutcome};
