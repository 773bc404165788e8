//! Plain-text run log, written at the end of a run when asked for.

use std::io::Write;
use std::path::Path;

use atlas_catalog::{OutcomeStatus, ReconciliationOutcome};

use crate::outcome::RunSummary;

/// Collects per-entity outcomes as they arrive and writes them to a file.
#[derive(Debug, Default)]
pub struct SyncLog {
    entries: Vec<ReconciliationOutcome>,
}

impl SyncLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outcome: ReconciliationOutcome) {
        self.entries.push(outcome);
    }

    pub fn entries(&self) -> &[ReconciliationOutcome] {
        &self.entries
    }

    /// Write the log. Entries appear in arrival order, one line per attempt,
    /// so an entity retried across passes shows every attempt.
    pub fn write_to_file(&self, path: &Path, summary: &RunSummary) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        self.write_to(&mut file, summary)
    }

    pub fn write_to(&self, out: &mut impl Write, summary: &RunSummary) -> std::io::Result<()> {
        writeln!(out, "=== Media Sync Log ===")?;
        writeln!(out, "Started: {}", summary.started_at)?;
        writeln!(out, "Finished: {}", summary.finished_at)?;
        writeln!(out)?;
        writeln!(out, "--- Summary ---")?;
        writeln!(out, "Entities: {}", summary.total)?;
        writeln!(out, "Valid: {}", summary.valid)?;
        writeln!(out, "Fixed: {}", summary.fixed)?;
        writeln!(out, "Failed: {}", summary.failed)?;
        writeln!(out, "Success rate: {:.1}%", summary.success_rate * 100.0)?;
        writeln!(
            out,
            "Passes: {} (stopped: {})",
            summary.passes.len(),
            summary.stop_reason
        )?;
        writeln!(out)?;
        writeln!(out, "--- Details ---")?;
        writeln!(out)?;

        for entry in &self.entries {
            match entry.status {
                OutcomeStatus::Valid => {
                    writeln!(out, "[VALID] {}", describe(entry))?;
                }
                OutcomeStatus::Fixed => {
                    writeln!(out, "[FIXED] {}", describe(entry))?;
                    if let Some(url) = &entry.media_url {
                        writeln!(out, "     Media: {}", atlas_places::media::redact_key(url))?;
                    }
                    if let Some(place) = &entry.provider_place_id {
                        writeln!(out, "     Place: {}", place)?;
                    }
                }
                OutcomeStatus::Failed => {
                    let kind = entry.error_kind.map(|k| k.as_str()).unwrap_or("unknown");
                    writeln!(out, "[FAILED:{}] {}", kind, describe(entry))?;
                    if let Some(detail) = &entry.error_detail {
                        writeln!(out, "     Reason: {}", detail)?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn describe(entry: &ReconciliationOutcome) -> String {
    format!(
        "pass {} {} \"{}\"",
        entry.pass, entry.entity_id, entry.entity_name
    )
}

#[cfg(test)]
#[path = "tests/run_log_tests.rs"]
mod tests;
