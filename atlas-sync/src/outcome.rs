//! Per-run outcome accumulation and the caller-facing summary.

use std::collections::HashMap;

use atlas_catalog::{FailureKind, OutcomeStatus, ReconciliationOutcome, SyncRun};
use serde::Serialize;

/// Why the controller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Nothing was selected.
    NoCandidates,
    /// Every entity is valid or fixed.
    NoFailures,
    ThresholdReached,
    /// Too many consecutive passes without new fixes.
    Stalled,
    MaxPasses,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCandidates => "no_candidates",
            Self::NoFailures => "no_failures",
            Self::ThresholdReached => "threshold_reached",
            Self::Stalled => "stalled",
            Self::MaxPasses => "max_passes",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts for a single pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub pass: u32,
    pub candidates: usize,
    pub valid: usize,
    pub fixed: usize,
    pub failed: usize,
    /// Run-wide success rate after merging this pass.
    pub success_rate: f64,
    /// Ids selected for this pass, in selection order.
    #[serde(skip)]
    pub candidate_ids: Vec<String>,
    /// Ids still failing after this pass, in selection order.
    #[serde(skip)]
    pub failed_ids: Vec<String>,
}

/// Merges outcomes from every pass, keyed by entity id.
///
/// A later outcome replaces an earlier one, except that a `cancelled`
/// placeholder never overwrites a real result from a previous pass.
/// Iteration order is the order entities were first seen.
#[derive(Debug, Default)]
pub struct RunAccumulator {
    order: Vec<String>,
    outcomes: HashMap<String, ReconciliationOutcome>,
}

impl RunAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ReconciliationOutcome) {
        match self.outcomes.get(&outcome.entity_id) {
            Some(_) if outcome.error_kind == Some(FailureKind::Cancelled) => {}
            Some(_) => {
                self.outcomes.insert(outcome.entity_id.clone(), outcome);
            }
            None => {
                self.order.push(outcome.entity_id.clone());
                self.outcomes.insert(outcome.entity_id.clone(), outcome);
            }
        }
    }

    pub fn get(&self, entity_id: &str) -> Option<&ReconciliationOutcome> {
        self.outcomes.get(entity_id)
    }

    pub fn total(&self) -> usize {
        self.order.len()
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.values().filter(|o| o.status == status).count()
    }

    /// `(valid + fixed) / total`; 1.0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        let ok = self.count(OutcomeStatus::Valid) + self.count(OutcomeStatus::Fixed);
        ok as f64 / total as f64
    }

    /// Outcomes in first-seen order.
    pub fn outcomes(&self) -> Vec<ReconciliationOutcome> {
        self.order
            .iter()
            .filter_map(|id| self.outcomes.get(id).cloned())
            .collect()
    }

    pub fn finish(
        self,
        started_at: String,
        passes: Vec<PassReport>,
        stop_reason: StopReason,
    ) -> RunSummary {
        RunSummary {
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            total: self.total(),
            valid: self.count(OutcomeStatus::Valid),
            fixed: self.count(OutcomeStatus::Fixed),
            failed: self.count(OutcomeStatus::Failed),
            success_rate: self.success_rate(),
            passes,
            stop_reason,
            outcomes: self.outcomes(),
        }
    }
}

/// What a run hands back to the caller. Serializes to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub total: usize,
    pub valid: usize,
    pub fixed: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub passes: Vec<PassReport>,
    pub stop_reason: StopReason,
    pub outcomes: Vec<ReconciliationOutcome>,
}

impl RunSummary {
    pub fn failures(&self) -> impl Iterator<Item = &ReconciliationOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Run history row for this summary.
    pub fn to_sync_run(&self, dry_run: bool) -> SyncRun {
        SyncRun {
            id: 0,
            started_at: self.started_at.clone(),
            finished_at: self.finished_at.clone(),
            total: self.total as u32,
            valid: self.valid as u32,
            fixed: self.fixed as u32,
            failed: self.failed as u32,
            passes: self.passes.len() as u32,
            stop_reason: self.stop_reason.to_string(),
            dry_run,
        }
    }
}

#[cfg(test)]
#[path = "tests/outcome_tests.rs"]
mod tests;
