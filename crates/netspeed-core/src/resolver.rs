// ── Proxy resolution ──
//
// Decides, once per session, how this session reaches the internet:
// trusted proxy, direct, or a freshly collected and verified proxy.
// Only a successful verification writes to the `SessionContext`.

use std::future::Future;

use tracing::{debug, info, warn};

use crate::connectivity::Connectivity;
use crate::context::{ConnectionState, SessionContext, UnresolvedReason};
use crate::credentials::{CredentialField, ProxyCredentials};

/// Source of raw proxy input, one field at a time.
///
/// Returning `None` means the user dismissed the prompt.
pub trait CredentialPrompt: Send + Sync {
    /// `false` when no user is available to answer (e.g. `--no-prompt`
    /// or stdin is not a terminal).
    fn is_interactive(&self) -> bool {
        true
    }

    fn ask(&self, field: CredentialField) -> impl Future<Output = Option<String>> + Send;
}

/// Raw answers, before validation.
struct RawInput {
    user: String,
    password: String,
    host: String,
    port: String,
}

impl RawInput {
    /// One prompt per field, in order. `Err(field)` on the first cancel.
    async fn collect(prompt: &impl CredentialPrompt) -> Result<Self, CredentialField> {
        let mut answers = Vec::with_capacity(CredentialField::ALL.len());
        for field in CredentialField::ALL {
            match prompt.ask(field).await {
                Some(answer) => answers.push(answer),
                None => return Err(field),
            }
        }
        let mut it = answers.into_iter();
        let mut next = || it.next().unwrap_or_default();
        Ok(Self {
            user: next(),
            password: next(),
            host: next(),
            port: next(),
        })
    }
}

/// Resolves the [`ConnectionState`] for one session.
#[derive(Debug, Clone)]
pub struct ProxyResolver<C> {
    connectivity: C,
    reverify: bool,
}

impl<C: Connectivity> ProxyResolver<C> {
    pub fn new(connectivity: C) -> Self {
        Self {
            connectivity,
            reverify: false,
        }
    }

    /// Verify an already trusted proxy before every session.
    #[must_use]
    pub fn with_reverify(mut self, reverify: bool) -> Self {
        self.reverify = reverify;
        self
    }

    pub fn connectivity(&self) -> &C {
        &self.connectivity
    }

    /// Run the resolution algorithm.
    ///
    /// Prompts at most once per call and never when the endpoint is
    /// reachable directly. The context is written only after the
    /// candidate proxy passed verification.
    pub async fn resolve(
        &self,
        ctx: &mut SessionContext,
        prompt: &impl CredentialPrompt,
    ) -> ConnectionState {
        // ── Trusted proxy fast path ──
        if let Some(trusted) = ctx.proxy().cloned() {
            if !self.reverify {
                debug!(proxy = %trusted.endpoint(), "using trusted proxy");
                return ConnectionState::Proxied(trusted);
            }
            match self.connectivity.verify_proxy(&trusted).await {
                Ok(()) => {
                    debug!(proxy = %trusted.endpoint(), "trusted proxy re-verified");
                    ctx.commit(trusted.clone());
                    return ConnectionState::Proxied(trusted);
                }
                Err(e) => {
                    warn!(proxy = %trusted.endpoint(), error = %e, "trusted proxy failed re-verification, dropping it");
                    ctx.clear();
                }
            }
        }

        // ── Direct access ──
        if self.connectivity.is_reachable().await {
            info!(endpoint = %self.connectivity.endpoint(), "direct connection available");
            return ConnectionState::Direct;
        }
        info!(endpoint = %self.connectivity.endpoint(), "endpoint unreachable directly, proxy required");

        if !prompt.is_interactive() {
            warn!("no direct connection and prompting is disabled");
            return ConnectionState::Unresolved(UnresolvedReason::Unreachable);
        }

        // ── Collect, validate, verify ──
        let raw = match RawInput::collect(prompt).await {
            Ok(raw) => raw,
            Err(field) => {
                info!(%field, "proxy prompt cancelled");
                return ConnectionState::Unresolved(UnresolvedReason::CancelledByUser { field });
            }
        };

        let candidate =
            match ProxyCredentials::validate(&raw.user, &raw.password, &raw.host, &raw.port) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "proxy input rejected");
                    return ConnectionState::Unresolved(UnresolvedReason::Invalid(e));
                }
            };

        match self.connectivity.verify_proxy(&candidate).await {
            Ok(()) => {
                info!(proxy = %candidate.endpoint(), "proxy verified");
                ctx.commit(candidate.clone());
                ConnectionState::Proxied(candidate)
            }
            Err(e) => {
                warn!(proxy = %candidate.endpoint(), error = %e, "proxy verification failed");
                ConnectionState::Unresolved(UnresolvedReason::ProxyAuthFailed {
                    endpoint: candidate.endpoint(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::ProxySource;
    use crate::credentials::ValidationError;
    use crate::error::CoreError;

    // ── Fakes ────────────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeNet {
        reachable: bool,
        proxy_ok: bool,
        probes: AtomicUsize,
        verifications: AtomicUsize,
    }

    impl FakeNet {
        fn new(reachable: bool, proxy_ok: bool) -> Self {
            Self {
                reachable,
                proxy_ok,
                ..Self::default()
            }
        }
    }

    impl Connectivity for FakeNet {
        fn endpoint(&self) -> String {
            "https://probe.test/".into()
        }

        async fn is_reachable(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
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
        asked: Mutex<Vec<CredentialField>>,
        interactive: bool,
    }

    impl Scripted {
        fn new(answers: &[Option<&str>]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.map(str::to_owned)).collect()),
                asked: Mutex::new(Vec::new()),
                interactive: true,
            }
        }

        fn full(user: &str, password: &str, host: &str, port: &str) -> Self {
            Self::new(&[Some(user), Some(password), Some(host), Some(port)])
        }

        fn asked(&self) -> Vec<CredentialField> {
            self.asked.lock().unwrap().clone()
        }
    }

    impl CredentialPrompt for Scripted {
        fn is_interactive(&self) -> bool {
            self.interactive
        }

        async fn ask(&self, field: CredentialField) -> Option<String> {
            self.asked.lock().unwrap().push(field);
            self.answers.lock().unwrap().pop_front().flatten()
        }
    }

    fn creds() -> ProxyCredentials {
        ProxyCredentials::validate("alice", "s3cret", "10.0.0.5", "8080").unwrap()
    }

    // ── Tests ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn reachable_endpoint_never_prompts() {
        let resolver = ProxyResolver::new(FakeNet::new(true, true));
        let prompt = Scripted::full("u", "p", "10.0.0.5", "8080");
        let mut ctx = SessionContext::new();

        let state = resolver.resolve(&mut ctx, &prompt).await;

        assert!(matches!(state, ConnectionState::Direct));
        assert!(prompt.asked().is_empty());
        assert!(ctx.proxy().is_none());
    }

    #[tokio::test]
    async fn trusted_proxy_skips_probe_and_prompt() {
        let net = FakeNet::new(false, false);
        let resolver = ProxyResolver::new(net);
        let prompt = Scripted::new(&[]);
        let mut ctx = SessionContext::new();
        ctx.commit(creds());

        let state = resolver.resolve(&mut ctx, &prompt).await;

        assert_eq!(state.proxy().unwrap().endpoint(), "http://10.0.0.5:8080");
        assert_eq!(resolver.connectivity().probes.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.connectivity().verifications.load(Ordering::SeqCst), 0);
        assert!(prompt.asked().is_empty());
    }

    #[tokio::test]
    async fn unreachable_prompts_once_in_field_order_and_commits() {
        let resolver = ProxyResolver::new(FakeNet::new(false, true));
        let prompt = Scripted::full("alice", "s3cret", "10.0.0.5", "8080");
        let mut ctx = SessionContext::new();

        let state = resolver.resolve(&mut ctx, &prompt).await;

        assert_eq!(state.proxy().unwrap().endpoint(), "http://10.0.0.5:8080");
        assert_eq!(prompt.asked(), CredentialField::ALL.to_vec());
        assert_eq!(ctx.proxy().unwrap().user(), "alice");
        assert_eq!(ctx.proxy_source(), Some(ProxySource::Verified));
        assert_eq!(resolver.connectivity().verifications.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_stops_prompting_at_that_field() {
        let resolver = ProxyResolver::new(FakeNet::new(false, true));
        let prompt = Scripted::new(&[Some("alice"), None]);
        let mut ctx = SessionContext::new();

        let state = resolver.resolve(&mut ctx, &prompt).await;

        assert!(matches!(
            state,
            ConnectionState::Unresolved(UnresolvedReason::CancelledByUser {
                field: CredentialField::Password
            })
        ));
        assert_eq!(
            prompt.asked(),
            vec![CredentialField::User, CredentialField::Password]
        );
        assert!(ctx.proxy().is_none());
        assert_eq!(resolver.connectivity().verifications.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_input_is_not_verified() {
        let resolver = ProxyResolver::new(FakeNet::new(false, true));
        let prompt = Scripted::full("alice", "s3cret", "10.0.0.256", "8080");
        let mut ctx = SessionContext::new();

        let state = resolver.resolve(&mut ctx, &prompt).await;

        assert!(matches!(
            state,
            ConnectionState::Unresolved(UnresolvedReason::Invalid(ValidationError::InvalidHost))
        ));
        assert_eq!(resolver.connectivity().verifications.load(Ordering::SeqCst), 0);
        assert!(ctx.proxy().is_none());
    }

    #[tokio::test]
    async fn failed_verification_leaves_context_unchanged() {
        let resolver = ProxyResolver::new(FakeNet::new(false, false));
        let prompt = Scripted::full("alice", "wrong", "10.0.0.5", "8080");
        let mut ctx = SessionContext::new();

        let state = resolver.resolve(&mut ctx, &prompt).await;

        match state {
            ConnectionState::Unresolved(UnresolvedReason::ProxyAuthFailed { endpoint, reason }) => {
                assert_eq!(endpoint, "http://10.0.0.5:8080");
                assert!(reason.contains("407"));
            }
            other => panic!("expected ProxyAuthFailed, got {other:?}"),
        }
        assert!(ctx.proxy().is_none());
    }

    #[tokio::test]
    async fn non_interactive_prompt_reports_unreachable() {
        let resolver = ProxyResolver::new(FakeNet::new(false, true));
        let mut prompt = Scripted::full("alice", "s3cret", "10.0.0.5", "8080");
        prompt.interactive = false;
        let mut ctx = SessionContext::new();

        let state = resolver.resolve(&mut ctx, &prompt).await;

        assert!(matches!(
            state,
            ConnectionState::Unresolved(UnresolvedReason::Unreachable)
        ));
        assert!(prompt.asked().is_empty());
    }

    #[tokio::test]
    async fn reverify_drops_dead_trusted_proxy_and_falls_back_to_direct() {
        let resolver = ProxyResolver::new(FakeNet::new(true, false)).with_reverify(true);
        let prompt = Scripted::new(&[]);
        let mut ctx = SessionContext::with_configured_proxy(creds());

        let state = resolver.resolve(&mut ctx, &prompt).await;

        assert!(matches!(state, ConnectionState::Direct));
        assert!(ctx.proxy().is_none());
        assert_eq!(resolver.connectivity().verifications.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reverify_promotes_configured_proxy_to_verified() {
        let resolver = ProxyResolver::new(FakeNet::new(false, true)).with_reverify(true);
        let prompt = Scripted::new(&[]);
        let mut ctx = SessionContext::with_configured_proxy(creds());

        let state = resolver.resolve(&mut ctx, &prompt).await;

        assert!(state.proxy().is_some());
        assert_eq!(ctx.proxy_source(), Some(ProxySource::Verified));
        assert_eq!(resolver.connectivity().probes.load(Ordering::SeqCst), 0);
    }
}
