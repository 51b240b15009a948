// ── Session orchestration ──
//
// One user-initiated request: single-flight check, proxy resolution,
// backend construction for the resolved route, then the measurement with
// every event forwarded to the presenter on the caller's task.

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use netspeed_api::ConnectivityProbe;

use crate::backend::{BackendFactory, SpeedtestFactory};
use crate::config::ProbeConfig;
use crate::connectivity::Connectivity;
use crate::context::{ConnectionState, ProxySource, SessionContext, UnresolvedReason};
use crate::credentials::{CredentialField, ProxyCredentials, ValidationError};
use crate::error::{CoreError, MeasurementError};
use crate::model::{Phase, SpeedResult};
use crate::resolver::{CredentialPrompt, ProxyResolver};
use crate::runner::{ProbeEvent, ProbeRunner};

/// Receives everything the session reports. Only ever called from the
/// task running [`SessionController::start_session`].
pub trait Presenter: Send {
    fn progress(&mut self, phase: Phase, percent: u8);

    fn result(&mut self, result: &SpeedResult);

    fn error(&mut self, message: &str);

    /// Informational message (busy, route chosen).
    fn notice(&mut self, _message: &str) {}
}

/// How one session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(SpeedResult),
    CancelledByUser { field: CredentialField },
    Validation(ValidationError),
    ProxyAuthFailed { endpoint: String, reason: String },
    Unreachable,
    MeasurementFailed(MeasurementError),
    AlreadyRunning,
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl From<UnresolvedReason> for SessionOutcome {
    fn from(reason: UnresolvedReason) -> Self {
        match reason {
            UnresolvedReason::CancelledByUser { field } => Self::CancelledByUser { field },
            UnresolvedReason::Invalid(e) => Self::Validation(e),
            UnresolvedReason::ProxyAuthFailed { endpoint, reason } => {
                Self::ProxyAuthFailed { endpoint, reason }
            }
            UnresolvedReason::Unreachable => Self::Unreachable,
        }
    }
}

/// Result of a connectivity check without measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityReport {
    pub endpoint: String,
    pub direct: bool,
    pub proxy: Option<ProxyCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyCheck {
    pub endpoint: String,
    pub source: ProxySource,
    pub ok: bool,
    pub error: Option<String>,
}

/// Coordinates resolver, runner and backend factory for each session.
pub struct SessionController<C, F> {
    resolver: ProxyResolver<C>,
    runner: ProbeRunner,
    context: Mutex<SessionContext>,
    factory: F,
}

impl SessionController<ConnectivityProbe, SpeedtestFactory> {
    /// Production wiring: connectivity probe plus speedtest.net backend.
    pub fn from_config(config: &ProbeConfig, seed: Option<ProxyCredentials>) -> Self {
        let probe = ConnectivityProbe::new(config.endpoint.clone(), config.probe_transport());
        let context = seed.map_or_else(SessionContext::new, SessionContext::with_configured_proxy);
        Self::new(
            ProxyResolver::new(probe).with_reverify(config.reverify_proxy),
            ProbeRunner::new(config.phase_timeout),
            context,
            SpeedtestFactory::from_config(config),
        )
    }
}

impl<C, F> SessionController<C, F>
where
    C: Connectivity,
    F: BackendFactory,
{
    pub fn new(
        resolver: ProxyResolver<C>,
        runner: ProbeRunner,
        context: SessionContext,
        factory: F,
    ) -> Self {
        Self {
            resolver,
            runner,
            context: Mutex::new(context),
            factory,
        }
    }

    pub fn resolver(&self) -> &ProxyResolver<C> {
        &self.resolver
    }

    pub fn runner(&self) -> &ProbeRunner {
        &self.runner
    }

    /// Snapshot of the session context.
    pub async fn context(&self) -> SessionContext {
        self.context.lock().await.clone()
    }

    /// Run one full session. Never panics; every path ends in an outcome
    /// that has already been shown to the presenter.
    pub async fn start_session(
        &self,
        prompt: &impl CredentialPrompt,
        presenter: &mut impl Presenter,
    ) -> SessionOutcome {
        if self.runner.is_active() {
            presenter.notice("A bandwidth measurement is already running");
            return SessionOutcome::AlreadyRunning;
        }

        // Held until the runner has started, so concurrent sessions queue
        // here instead of each prompting for credentials.
        let mut ctx = self.context.lock().await;
        if self.runner.is_active() {
            presenter.notice("A bandwidth measurement is already running");
            return SessionOutcome::AlreadyRunning;
        }

        let proxy = match self.resolver.resolve(&mut ctx, prompt).await {
            ConnectionState::Direct => None,
            ConnectionState::Proxied(proxy) => {
                presenter.notice(&format!("Measuring through proxy {}", proxy.endpoint()));
                Some(proxy)
            }
            ConnectionState::Unresolved(reason) => {
                warn!(%reason, "session ended without a route");
                presenter.error(&reason.to_string());
                return reason.into();
            }
        };

        let backend = match self.factory.build(proxy.as_ref()) {
            Ok(backend) => backend,
            Err(e) => {
                let err = MeasurementError::new(Phase::Starting, e.to_string());
                warn!(error = %err, "could not build measurement backend");
                presenter.error(&err.to_string());
                return SessionOutcome::MeasurementFailed(err);
            }
        };

        let started = self
            .runner
            .start(backend, proxy.as_ref().map(ProxyCredentials::endpoint));
        drop(ctx);
        let mut handle = match started {
            Ok(handle) => handle,
            Err(CoreError::AlreadyRunning) => {
                presenter.notice("A bandwidth measurement is already running");
                return SessionOutcome::AlreadyRunning;
            }
            Err(e) => {
                let err = MeasurementError::new(Phase::Starting, e.to_string());
                presenter.error(&err.to_string());
                return SessionOutcome::MeasurementFailed(err);
            }
        };

        let mut outcome = None;
        while let Some(event) = handle.next_event().await {
            match event {
                ProbeEvent::Progress { phase, percent } => presenter.progress(phase, percent),
                ProbeEvent::Done(result) => {
                    presenter.result(&result);
                    outcome = Some(SessionOutcome::Completed(result));
                }
                ProbeEvent::Failed(err) => {
                    presenter.error(&err.to_string());
                    outcome = Some(SessionOutcome::MeasurementFailed(err));
                }
            }
        }
        handle.finish().await;

        outcome.unwrap_or_else(|| {
            let err = MeasurementError::new(Phase::Failed, "measurement worker stopped unexpectedly");
            presenter.error(&err.to_string());
            SessionOutcome::MeasurementFailed(err)
        })
    }

    /// Report reachability without measuring. Verifies the context's
    /// proxy (if any) but never changes the context.
    pub async fn check_connectivity(&self) -> ConnectivityReport {
        let connectivity = self.resolver.connectivity();
        let direct = connectivity.is_reachable().await;

        let ctx = self.context().await;
        let proxy = match (ctx.proxy(), ctx.proxy_source()) {
            (Some(proxy), Some(source)) => {
                let verdict = connectivity.verify_proxy(proxy).await;
                info!(proxy = %proxy.endpoint(), ok = verdict.is_ok(), "proxy checked");
                Some(ProxyCheck {
                    endpoint: proxy.endpoint(),
                    source,
                    ok: verdict.is_ok(),
                    error: verdict.err().map(|e| e.to_string()),
                })
            }
            _ => None,
        };

        ConnectivityReport {
            endpoint: connectivity.endpoint(),
            direct,
            proxy,
        }
    }
}
