use std::time::Duration;

use atlas_catalog::ReconciliationOutcome;

use crate::options::SyncMode;
use crate::outcome::{PassReport, StopReason};

/// Progress events emitted while a run is in flight.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    RunStarted {
        mode: SyncMode,
        total: usize,
    },
    PassStarted {
        pass: u32,
        candidates: usize,
    },
    EntityFinished {
        pass: u32,
        outcome: ReconciliationOutcome,
    },
    BatchPause {
        pass: u32,
        delay: Duration,
    },
    CircuitOpen {
        pass: u32,
        consecutive: u32,
    },
    PassDone {
        report: PassReport,
    },
    Done {
        stop_reason: StopReason,
        success_rate: f64,
    },
}
