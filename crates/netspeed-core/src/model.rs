// ── Domain model ──
//
// Measurement phases, the observable run snapshot, and the final result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::error::MeasurementError;

const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Lifecycle phase of a bandwidth measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    #[strum(serialize = "idle")]
    Idle,
    #[strum(serialize = "starting")]
    Starting,
    #[strum(serialize = "fetching servers")]
    FetchingServers,
    #[strum(serialize = "selecting server")]
    SelectingServer,
    #[strum(serialize = "downloading")]
    Downloading,
    #[strum(serialize = "uploading")]
    Uploading,
    #[strum(serialize = "done")]
    Done,
    #[strum(serialize = "failed")]
    Failed,
}

impl Phase {
    /// Milestone percentage reported when this phase begins.
    ///
    /// `None` for phases that carry no milestone (`Idle`, `Failed`).
    pub fn milestone(self) -> Option<u8> {
        match self {
            Self::Starting => Some(0),
            Self::FetchingServers => Some(20),
            Self::SelectingServer => Some(40),
            Self::Downloading => Some(60),
            Self::Uploading => Some(80),
            Self::Done => Some(100),
            Self::Idle | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Snapshot of the in-flight (or just finished) measurement.
///
/// Published by the runner through a `watch` channel; reset to the
/// default (idle) snapshot once the run releases its slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbeRun {
    pub phase: Phase,
    pub progress: u8,
    pub download_bps: Option<f64>,
    pub upload_bps: Option<f64>,
    pub error: Option<MeasurementError>,
}

impl ProbeRun {
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle) && !self.phase.is_terminal()
    }
}

/// Descriptive data about the server a measurement ran against.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerInfo {
    pub id: String,
    pub name: String,
    pub sponsor: String,
    pub country: String,
    pub host: String,
    pub latency_ms: Option<f64>,
}

/// A completed measurement. Both directions are always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedResult {
    pub download_bps: f64,
    pub upload_bps: f64,
    pub server: ServerInfo,
    /// Proxy endpoint (no credentials) the measurement went through.
    pub via_proxy: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl SpeedResult {
    pub fn download_mbps(&self) -> f64 {
        self.download_bps / BITS_PER_MEGABIT
    }

    pub fn upload_mbps(&self) -> f64 {
        self.upload_bps / BITS_PER_MEGABIT
    }
}
