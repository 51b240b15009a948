// ── Single-flight bandwidth runner ──
//
// At most one measurement per runner. The slot is claimed with a
// compare-and-set before the worker is spawned. The worker and the
// caller's `RunHandle` share the guard, so the slot (and the published
// snapshot) is released only once the worker has ended and the caller
// has finished with the terminal event. Progress crosses back to the
// caller's task over an unbounded mpsc channel, so callbacks never run
// on the worker.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::MeasurementBackend;
use crate::error::{CoreError, MeasurementError};
use crate::model::{Phase, ProbeRun, ServerInfo, SpeedResult};

/// Default upper bound for a single measurement phase.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(60);

/// Something the worker reports to the caller's task.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    /// A milestone, sent before the step it names.
    Progress { phase: Phase, percent: u8 },
    /// Terminal: both directions measured.
    Done(SpeedResult),
    /// Terminal: the run died in `phase`; no numbers.
    Failed(MeasurementError),
}

impl ProbeEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

struct RunnerInner {
    active: AtomicBool,
    snapshot: watch::Sender<ProbeRun>,
    phase_timeout: Duration,
}

/// Releases the single-flight slot when the last holder lets go: the
/// worker (also on panic) and the caller's [`RunHandle`].
struct ActiveGuard {
    inner: Arc<RunnerInner>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.inner.snapshot.send_replace(ProbeRun::default());
        self.inner.active.store(false, Ordering::Release);
        debug!("measurement slot released");
    }
}

/// Runs at most one bandwidth measurement at a time.
///
/// Cheap to clone; clones share the same slot.
#[derive(Clone)]
pub struct ProbeRunner {
    inner: Arc<RunnerInner>,
}

impl ProbeRunner {
    pub fn new(phase_timeout: Duration) -> Self {
        let (snapshot, _) = watch::channel(ProbeRun::default());
        Self {
            inner: Arc::new(RunnerInner {
                active: AtomicBool::new(false),
                snapshot,
                phase_timeout,
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Current snapshot of the in-flight run (idle when none).
    pub fn snapshot(&self) -> ProbeRun {
        self.inner.snapshot.borrow().clone()
    }

    /// Observe snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<ProbeRun> {
        self.inner.snapshot.subscribe()
    }

    /// Claim the slot and spawn the worker.
    ///
    /// Returns [`CoreError::AlreadyRunning`] without touching the active
    /// run when the slot is taken. Must be called inside a Tokio runtime.
    pub fn start<B: MeasurementBackend>(
        &self,
        backend: B,
        via_proxy: Option<String>,
    ) -> Result<RunHandle, CoreError> {
        if self
            .inner
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("measurement requested while another is running");
            return Err(CoreError::AlreadyRunning);
        }

        let guard = Arc::new(ActiveGuard {
            inner: Arc::clone(&self.inner),
        });
        let worker_guard = Arc::clone(&guard);
        let (tx, events) = mpsc::unbounded_channel();

        info!(via_proxy = via_proxy.as_deref().unwrap_or("direct"), "measurement started");
        let task = tokio::spawn(async move {
            let reporter = Reporter {
                tx,
                snapshot: &worker_guard.inner.snapshot,
            };
            match measure(&backend, worker_guard.inner.phase_timeout, &reporter).await {
                Ok((download_bps, upload_bps, server)) => {
                    reporter.finished(SpeedResult {
                        download_bps,
                        upload_bps,
                        server,
                        via_proxy,
                        finished_at: Utc::now(),
                    });
                }
                Err(e) => reporter.failed(e),
            }
            drop(reporter);
            drop(worker_guard);
        });

        Ok(RunHandle {
            events,
            task,
            _guard: guard,
        })
    }

    /// Callback form of [`start`](Self::start).
    ///
    /// Callbacks run on the caller's task. The slot stays taken until
    /// `on_done`/`on_error` has returned and the worker has ended.
    pub async fn run<B, P, D, E>(
        &self,
        backend: B,
        via_proxy: Option<String>,
        mut on_progress: P,
        on_done: D,
        on_error: E,
    ) -> Result<(), CoreError>
    where
        B: MeasurementBackend,
        P: FnMut(Phase, u8),
        D: FnOnce(SpeedResult),
        E: FnOnce(MeasurementError),
    {
        let mut handle = self.start(backend, via_proxy)?;
        loop {
            match handle.next_event().await {
                Some(ProbeEvent::Progress { phase, percent }) => on_progress(phase, percent),
                Some(ProbeEvent::Done(result)) => {
                    on_done(result);
                    break;
                }
                Some(ProbeEvent::Failed(err)) => {
                    on_error(err);
                    break;
                }
                None => {
                    on_error(MeasurementError::new(
                        Phase::Failed,
                        "measurement worker stopped unexpectedly",
                    ));
                    break;
                }
            }
        }
        handle.finish().await;
        Ok(())
    }
}

impl Default for ProbeRunner {
    fn default() -> Self {
        Self::new(DEFAULT_PHASE_TIMEOUT)
    }
}

impl std::fmt::Debug for ProbeRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRunner")
            .field("active", &self.is_active())
            .field("phase_timeout", &self.inner.phase_timeout)
            .finish_non_exhaustive()
    }
}

/// Caller's side of a started run. Holds the runner's slot until it is
/// finished or dropped.
pub struct RunHandle {
    events: mpsc::UnboundedReceiver<ProbeEvent>,
    task: JoinHandle<()>,
    _guard: Arc<ActiveGuard>,
}

impl RunHandle {
    /// Next event; `None` once the worker is gone.
    pub async fn next_event(&mut self) -> Option<ProbeEvent> {
        self.events.recv().await
    }

    /// Wait for the worker to end and give the slot back. The runner is
    /// idle afterwards.
    pub async fn finish(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "measurement worker ended abnormally");
        }
    }
}

// ── Worker ───────────────────────────────────────────────────────────

struct Reporter<'a> {
    tx: mpsc::UnboundedSender<ProbeEvent>,
    snapshot: &'a watch::Sender<ProbeRun>,
}

impl Reporter<'_> {
    fn milestone(&self, phase: Phase) {
        let percent = phase.milestone().unwrap_or_default();
        self.snapshot.send_modify(|run| {
            run.phase = phase;
            run.progress = percent;
        });
        debug!(%phase, percent, "measurement progress");
        // The caller may have stopped listening; the run still completes.
        let _ = self.tx.send(ProbeEvent::Progress { phase, percent });
    }

    fn measured(&self, download_bps: Option<f64>, upload_bps: Option<f64>) {
        self.snapshot.send_modify(|run| {
            run.download_bps = download_bps.or(run.download_bps);
            run.upload_bps = upload_bps.or(run.upload_bps);
        });
    }

    fn finished(&self, result: SpeedResult) {
        info!(
            download_mbps = result.download_mbps(),
            upload_mbps = result.upload_mbps(),
            server = %result.server.name,
            "measurement finished"
        );
        self.milestone(Phase::Done);
        let _ = self.tx.send(ProbeEvent::Done(result));
    }

    fn failed(&self, err: MeasurementError) {
        warn!(phase = %err.phase, error = %err.message, "measurement failed");
        self.snapshot.send_modify(|run| {
            run.phase = Phase::Failed;
            run.download_bps = None;
            run.upload_bps = None;
            run.error = Some(err.clone());
        });
        let _ = self.tx.send(ProbeEvent::Failed(err));
    }
}

async fn measure<B: MeasurementBackend>(
    backend: &B,
    limit: Duration,
    reporter: &Reporter<'_>,
) -> Result<(f64, f64, ServerInfo), MeasurementError> {
    reporter.milestone(Phase::Starting);

    reporter.milestone(Phase::FetchingServers);
    let servers = bounded(Phase::FetchingServers, limit, backend.discover_servers()).await?;
    debug!(count = servers.len(), "server list fetched");

    reporter.milestone(Phase::SelectingServer);
    let server = bounded(Phase::SelectingServer, limit, backend.select_best(servers)).await?;
    let info = backend.describe(&server);
    debug!(server = %info.name, host = %info.host, "server selected");

    reporter.milestone(Phase::Downloading);
    let download = bounded(Phase::Downloading, limit, backend.measure_download(&server)).await?;
    reporter.measured(Some(download), None);

    reporter.milestone(Phase::Uploading);
    let upload = bounded(Phase::Uploading, limit, backend.measure_upload(&server)).await?;
    reporter.measured(None, Some(upload));

    Ok((download, upload, info))
}

async fn bounded<T>(
    phase: Phase,
    limit: Duration,
    step: impl Future<Output = Result<T, CoreError>>,
) -> Result<T, MeasurementError> {
    match tokio::time::timeout(limit, step).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(MeasurementError::new(phase, e.to_string())),
        Err(_) => Err(MeasurementError::new(
            phase,
            format!("timed out after {}s", limit.as_secs()),
        )),
    }
}
