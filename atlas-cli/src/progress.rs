//! Terminal progress display for sync and audit runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use atlas_catalog::{OutcomeStatus, ReconciliationOutcome};
use atlas_sync::SyncEvent;

use crate::commands::truncate;

/// Progress bar for one pass at a time, with a line per finished entity.
pub(crate) struct RunProgress {
    bar: ProgressBar,
    verbose_lines: bool,
}

impl RunProgress {
    /// When `quiet` is true nothing is drawn.
    pub(crate) fn new(quiet: bool) -> Self {
        let bar = ProgressBar::new(0);
        if quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) =
            ProgressStyle::with_template("  {spinner:.cyan} pass {prefix} [{bar:30}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self {
            bar,
            verbose_lines: !quiet,
        }
    }

    pub(crate) fn handle(&self, event: &SyncEvent) {
        match event {
            SyncEvent::RunStarted { .. } => {}
            SyncEvent::PassStarted { pass, candidates } => {
                self.bar.reset();
                self.bar.set_length(*candidates as u64);
                self.bar.set_prefix(pass.to_string());
                self.bar.set_message("");
                self.bar.enable_steady_tick(std::time::Duration::from_millis(100));
            }
            SyncEvent::EntityFinished { outcome, .. } => {
                self.bar.inc(1);
                if self.verbose_lines {
                    self.bar.println(outcome_line(outcome));
                }
            }
            SyncEvent::BatchPause { delay, .. } => {
                self.bar.set_message(format!("pausing {}ms", delay.as_millis()));
            }
            SyncEvent::CircuitOpen { consecutive, .. } => {
                self.bar.println(format!(
                    "  {} {} consecutive provider errors, skipping the rest of this pass",
                    "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                    consecutive,
                ));
            }
            SyncEvent::PassDone { .. } => self.bar.set_message(""),
            SyncEvent::Done { .. } => self.finish(),
        }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn outcome_line(outcome: &ReconciliationOutcome) -> String {
    let name = truncate(&outcome.entity_name, 48);
    match outcome.status {
        OutcomeStatus::Valid => format!(
            "  {} {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            name,
        ),
        OutcomeStatus::Fixed => format!(
            "  {} {} {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            name.if_supports_color(Stdout, |t| t.bold()),
            "(fixed)".if_supports_color(Stdout, |t| t.dimmed()),
        ),
        OutcomeStatus::Failed => format!(
            "  {} {}: {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            name,
            outcome.error_detail.as_deref().unwrap_or("failed"),
        ),
    }
}
