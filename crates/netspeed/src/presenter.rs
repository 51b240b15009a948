//! Terminal presenter: an `indicatif` bar driven by measurement
//! milestones. Status lines go to stderr; rendered results are printed
//! by the command once the session ends.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use netspeed_core::{Phase, Presenter, SpeedResult};

use crate::output::{Painter, mbps};

pub struct TerminalPresenter {
    bar: Option<ProgressBar>,
    paint: Painter,
    quiet: bool,
    label: Option<String>,
}

impl TerminalPresenter {
    pub fn new(paint: Painter, quiet: bool) -> Self {
        Self {
            bar: None,
            paint,
            quiet,
            label: None,
        }
    }

    /// Prefix shown on the bar, e.g. `[2/5]` for repeated runs.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    fn bar(&mut self) -> &ProgressBar {
        let quiet = self.quiet;
        let prefix = self.label.clone().unwrap_or_default();
        self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(100);
            if quiet {
                bar.set_draw_target(ProgressDrawTarget::hidden());
            }
            bar.set_style(
                ProgressStyle::with_template("{prefix}{spinner:.blue} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar.set_prefix(if prefix.is_empty() { prefix } else { format!("{prefix} ") });
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        })
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        if !self.quiet {
            eprintln!("{text}");
        }
    }
}

impl Presenter for TerminalPresenter {
    fn progress(&mut self, phase: Phase, percent: u8) {
        let bar = self.bar();
        bar.set_position(u64::from(percent));
        bar.set_message(phase.to_string());
    }

    fn result(&mut self, result: &SpeedResult) {
        self.finish();
        let summary = format!(
            "Download: {}  Upload: {}",
            mbps(result.download_bps),
            mbps(result.upload_bps)
        );
        self.line(&self.paint.good(&summary));
    }

    fn error(&mut self, message: &str) {
        self.finish();
        // Always shown, even with --quiet.
        eprintln!("{}", self.paint.bad(message));
    }

    fn notice(&mut self, message: &str) {
        match &self.bar {
            Some(bar) if !self.quiet => bar.println(self.paint.dim(message)),
            _ => self.line(&self.paint.dim(message)),
        }
    }
}

impl Drop for TerminalPresenter {
    fn drop(&mut self) {
        self.finish();
    }
}
