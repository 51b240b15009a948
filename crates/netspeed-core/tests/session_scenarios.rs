#![allow(clippy::unwrap_used)]
// End-to-end session scenarios against fake connectivity, prompt and
// measurement backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tokio::sync::Notify;

use netspeed_core::{
    BackendFactory, Connectivity, CoreError, CredentialField, CredentialPrompt,
    MeasurementBackend, Phase, Presenter, ProbeRunner, ProxyCredentials, ProxyResolver,
    ProxySource, ServerInfo, SessionContext, SessionController, SessionOutcome, SpeedResult,
};

// ── Fakes ───────────────────────────────────────────────────────────

struct FakeNet {
    reachable: bool,
    proxy_ok: bool,
    verifications: AtomicUsize,
}

impl FakeNet {
    fn new(reachable: bool, proxy_ok: bool) -> Self {
        Self {
            reachable,
            proxy_ok,
            verifications: AtomicUsize::new(0),
        }
    }
}

impl Connectivity for FakeNet {
    fn endpoint(&self) -> String {
        "https://probe.test/".into()
    }

    async fn is_reachable(&self) -> bool {
        self.reachable
    }

    async fn verify_proxy(&self, _proxy: &ProxyCredentials) -> Result<(), CoreError> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        if self.proxy_ok {
            Ok(())
        } else {
            Err(CoreError::Http {
                status: 407,
                message: "proxy authentication required".into(),
            })
        }
    }
}

struct Scripted {
    answers: Mutex<VecDeque<Option<String>>>,
    asked: AtomicUsize,
    /// The first answer waits for this, like a user still typing.
    typing: Option<Arc<Notify>>,
    typed: AtomicBool,
}

impl Scripted {
    fn new(answers: &[Option<&str>]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.map(str::to_owned)).collect()),
            asked: AtomicUsize::new(0),
            typing: None,
            typed: AtomicBool::new(false),
        }
    }

    fn typing_until(mut self, gate: Arc<Notify>) -> Self {
        self.typing = Some(gate);
        self
    }

    fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl CredentialPrompt for Scripted {
    async fn ask(&self, _field: CredentialField) -> Option<String> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.typing {
            if !self.typed.swap(true, Ordering::SeqCst) {
                gate.notified().await;
            }
        }
        self.answers.lock().unwrap().pop_front().flatten()
    }
}

#[derive(Default)]
struct FakeBackend {
    fail_in: Option<Phase>,
    gate: Option<Arc<Notify>>,
}

impl MeasurementBackend for FakeBackend {
    type Server = ();

    async fn discover_servers(&self) -> Result<Vec<()>, CoreError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(vec![()])
    }

    async fn select_best(&self, _servers: Vec<()>) -> Result<(), CoreError> {
        Ok(())
    }

    async fn measure_download(&self, _server: &()) -> Result<f64, CoreError> {
        Ok(50_000_000.0)
    }

    async fn measure_upload(&self, _server: &()) -> Result<f64, CoreError> {
        if self.fail_in == Some(Phase::Uploading) {
            return Err(CoreError::Backend {
                message: "upload rejected".into(),
            });
        }
        Ok(10_000_000.0)
    }

    fn describe(&self, _server: &()) -> ServerInfo {
        ServerInfo {
            name: "Test City".into(),
            ..ServerInfo::default()
        }
    }
}

/// Records the route each backend was built for.
#[derive(Default, Clone)]
struct FakeFactory {
    fail_in: Option<Phase>,
    gate: Option<Arc<Notify>>,
    built: Arc<Mutex<Vec<Option<String>>>>,
}

impl FakeFactory {
    fn routes(&self) -> Vec<Option<String>> {
        self.built.lock().unwrap().clone()
    }
}

impl BackendFactory for FakeFactory {
    type Backend = FakeBackend;

    fn build(&self, proxy: Option<&ProxyCredentials>) -> Result<FakeBackend, CoreError> {
        self.built
            .lock()
            .unwrap()
            .push(proxy.map(ProxyCredentials::endpoint));
        Ok(FakeBackend {
            fail_in: self.fail_in,
            gate: self.gate.clone(),
        })
    }
}

#[derive(Default)]
struct Recorder {
    progress: Vec<u8>,
    results: Vec<SpeedResult>,
    errors: Vec<String>,
    notices: Vec<String>,
}

impl Presenter for Recorder {
    fn progress(&mut self, _phase: Phase, percent: u8) {
        self.progress.push(percent);
    }

    fn result(&mut self, result: &SpeedResult) {
        self.results.push(result.clone());
    }

    fn error(&mut self, message: &str) {
        self.errors.push(message.to_owned());
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_owned());
    }
}

fn controller(net: FakeNet, factory: FakeFactory) -> SessionController<FakeNet, FakeFactory> {
    SessionController::new(
        ProxyResolver::new(net),
        ProbeRunner::default(),
        SessionContext::new(),
        factory,
    )
}

const PROXY_ANSWERS: [Option<&str>; 4] =
    [Some("alice"), Some("s3cret"), Some("10.0.0.5"), Some("8080")];

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn direct_session_measures_without_prompting() {
    let factory = FakeFactory::default();
    let session = controller(FakeNet::new(true, true), factory.clone());
    let prompt = Scripted::new(&[]);
    let mut ui = Recorder::default();

    let outcome = session.start_session(&prompt, &mut ui).await;

    let result = match outcome {
        SessionOutcome::Completed(result) => result,
        other => panic!("expected Completed, got {other:?}"),
    };
    assert!((result.download_mbps() - 50.0).abs() < 1e-9);
    assert!((result.upload_mbps() - 10.0).abs() < 1e-9);
    assert_eq!(result.via_proxy, None);
    assert_eq!(ui.progress, vec![0, 20, 40, 60, 80, 100]);
    assert_eq!(ui.results.len(), 1);
    assert!(ui.errors.is_empty());
    assert_eq!(prompt.asked(), 0);
    assert_eq!(factory.routes(), vec![None]);
    assert!(!session.runner().is_active());
}

#[tokio::test]
async fn proxy_session_commits_and_is_trusted_next_time() {
    let factory = FakeFactory::default();
    let session = controller(FakeNet::new(false, true), factory.clone());
    let prompt = Scripted::new(&PROXY_ANSWERS);
    let mut ui = Recorder::default();

    let outcome = session.start_session(&prompt, &mut ui).await;

    let result = match outcome {
        SessionOutcome::Completed(result) => result,
        other => panic!("expected Completed, got {other:?}"),
    };
    assert_eq!(result.via_proxy.as_deref(), Some("http://10.0.0.5:8080"));
    assert_eq!(prompt.asked(), 4);
    let ctx = session.context().await;
    assert_eq!(ctx.proxy().unwrap().endpoint(), "http://10.0.0.5:8080");
    assert_eq!(ctx.proxy_source(), Some(ProxySource::Verified));

    // Second session: no prompt, same route.
    let outcome = session.start_session(&prompt, &mut ui).await;
    assert!(outcome.is_success());
    assert_eq!(prompt.asked(), 4);
    assert_eq!(
        factory.routes(),
        vec![
            Some("http://10.0.0.5:8080".to_owned()),
            Some("http://10.0.0.5:8080".to_owned())
        ]
    );
}

#[tokio::test]
async fn cancel_at_password_ends_session_without_measuring() {
    let factory = FakeFactory::default();
    let session = controller(FakeNet::new(false, true), factory.clone());
    let prompt = Scripted::new(&[Some("alice"), None]);
    let mut ui = Recorder::default();

    let outcome = session.start_session(&prompt, &mut ui).await;

    assert_eq!(
        outcome,
        SessionOutcome::CancelledByUser {
            field: CredentialField::Password
        }
    );
    assert_eq!(prompt.asked(), 2);
    assert_eq!(ui.errors.len(), 1);
    assert!(ui.errors[0].contains("password"));
    assert!(ui.progress.is_empty());
    assert!(factory.routes().is_empty());
    assert!(session.context().await.proxy().is_none());
}

#[tokio::test]
async fn rejected_proxy_leaves_context_empty() {
    let factory = FakeFactory::default();
    let session = controller(FakeNet::new(false, false), factory.clone());
    let prompt = Scripted::new(&PROXY_ANSWERS);
    let mut ui = Recorder::default();

    let outcome = session.start_session(&prompt, &mut ui).await;

    match outcome {
        SessionOutcome::ProxyAuthFailed { endpoint, .. } => {
            assert_eq!(endpoint, "http://10.0.0.5:8080");
        }
        other => panic!("expected ProxyAuthFailed, got {other:?}"),
    }
    assert!(session.context().await.proxy().is_none());
    assert!(factory.routes().is_empty());
    assert_eq!(ui.errors.len(), 1);
}

#[tokio::test]
async fn invalid_port_is_a_validation_outcome() {
    let session = controller(FakeNet::new(false, true), FakeFactory::default());
    let prompt = Scripted::new(&[Some("alice"), Some("s3cret"), Some("10.0.0.5"), Some("0")]);
    let mut ui = Recorder::default();

    let outcome = session.start_session(&prompt, &mut ui).await;

    assert_eq!(
        outcome,
        SessionOutcome::Validation(netspeed_core::ValidationError::InvalidPort)
    );
    assert_eq!(
        session
            .resolver()
            .connectivity()
            .verifications
            .load(Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn measurement_failure_reaches_presenter_without_result() {
    let factory = FakeFactory {
        fail_in: Some(Phase::Uploading),
        ..FakeFactory::default()
    };
    let session = controller(FakeNet::new(true, true), factory);
    let mut ui = Recorder::default();

    let outcome = session.start_session(&Scripted::new(&[]), &mut ui).await;

    match outcome {
        SessionOutcome::MeasurementFailed(err) => assert_eq!(err.phase, Phase::Uploading),
        other => panic!("expected MeasurementFailed, got {other:?}"),
    }
    assert_eq!(ui.progress, vec![0, 20, 40, 60, 80]);
    assert!(ui.results.is_empty());
    assert_eq!(ui.errors.len(), 1);
    assert!(!session.runner().is_active());
}

#[tokio::test]
async fn busy_runner_rejects_session_and_keeps_active_run() {
    let factory = FakeFactory::default();
    let session = controller(FakeNet::new(true, true), factory.clone());
    let gate = Arc::new(Notify::new());
    let handle = session
        .runner()
        .start(
            FakeBackend {
                fail_in: None,
                gate: Some(Arc::clone(&gate)),
            },
            None,
        )
        .unwrap();
    let mut ui = Recorder::default();

    let outcome = session.start_session(&Scripted::new(&[]), &mut ui).await;

    assert_eq!(outcome, SessionOutcome::AlreadyRunning);
    assert_eq!(ui.notices.len(), 1);
    assert!(factory.routes().is_empty());
    assert!(session.runner().is_active());

    gate.notify_one();
    handle.finish().await;
    assert!(!session.runner().is_active());
}

#[tokio::test]
async fn concurrent_sessions_prompt_once_and_one_is_rejected() {
    let measuring = Arc::new(Notify::new());
    let factory = FakeFactory {
        gate: Some(Arc::clone(&measuring)),
        ..FakeFactory::default()
    };
    let session = controller(FakeNet::new(false, true), factory.clone());
    let typing = Arc::new(Notify::new());
    let prompt = Scripted::new(&PROXY_ANSWERS).typing_until(Arc::clone(&typing));
    let mut first_ui = Recorder::default();
    let mut second_ui = Recorder::default();

    let (first, second, ()) = tokio::join!(
        session.start_session(&prompt, &mut first_ui),
        session.start_session(&prompt, &mut second_ui),
        async {
            // Both sessions are in flight: one at the prompt, one queued.
            tokio::task::yield_now().await;
            typing.notify_one();
            while !session.runner().is_active() {
                tokio::task::yield_now().await;
            }
            // The context lock is FIFO; getting it means the queued
            // session has already had its turn.
            session.context().await;
            measuring.notify_one();
        },
    );

    let outcomes = [&first, &second];
    assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, SessionOutcome::AlreadyRunning))
            .count(),
        1
    );
    assert_eq!(prompt.asked(), 4);
    assert_eq!(factory.routes(), vec![Some("http://10.0.0.5:8080".to_owned())]);
    assert!(!session.runner().is_active());
}

#[tokio::test]
async fn connectivity_check_verifies_configured_proxy_without_committing() {
    let creds = ProxyCredentials::validate("alice", "s3cret", "10.0.0.5", "8080").unwrap();
    let session = SessionController::new(
        ProxyResolver::new(FakeNet::new(false, false)),
        ProbeRunner::default(),
        SessionContext::with_configured_proxy(creds),
        FakeFactory::default(),
    );

    let report = session.check_connectivity().await;

    assert!(!report.direct);
    let proxy = report.proxy.unwrap();
    assert_eq!(proxy.endpoint, "http://10.0.0.5:8080");
    assert_eq!(proxy.source, ProxySource::Configured);
    assert!(!proxy.ok);
    assert!(proxy.error.unwrap().contains("407"));
    assert_eq!(
        session.context().await.proxy_source(),
        Some(ProxySource::Configured)
    );
}
