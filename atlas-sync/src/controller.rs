//! The reconciliation controller: batches, pacing, passes and convergence.
//!
//! Each pass works in three steps per batch, following the same split as the
//! rest of the workspace's store-backed jobs:
//!
//! 1. **Select** candidates from the store (controller task).
//! 2. **Resolve** entities concurrently through the provider chain, bounded
//!    by `workers`.
//! 3. **Apply** results one at a time as they arrive (controller task), since
//!    the store handle is not shared across tasks.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use atlas_catalog::{CatalogEntity, FailureKind, OutcomeStatus, ReconciliationOutcome};
use atlas_places::PlaceProvider;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant};

use crate::error::{ReconcileError, SyncError};
use crate::events::SyncEvent;
use crate::options::{SyncMode, SyncOptions};
use crate::outcome::{PassReport, RunAccumulator, RunSummary, StopReason};
use crate::reconcile::{EntityReport, Resolution, reconcile_entity};
use crate::selector::select_candidates;
use crate::store::CatalogStore;
use crate::updater::persist_media;

/// Per-entity timeout covering the whole search/details/probe chain.
/// Must stay above the HTTP client's per-request timeout.
const ITEM_TIMEOUT: Duration = Duration::from_secs(90);

/// Consecutive transport failures after which the rest of a pass is skipped.
const CIRCUIT_BREAKER_THRESHOLD: u32 = 15;

/// Granularity at which the batch pause checks for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Run the pipeline to completion and return the merged summary.
///
/// Only bad options or an unreadable store fail the run; every entity-level
/// problem ends up as a `failed` outcome in the summary.
pub async fn reconcile<S, P>(
    store: &S,
    provider: &P,
    options: &SyncOptions,
    events: UnboundedSender<SyncEvent>,
) -> Result<RunSummary, SyncError>
where
    S: CatalogStore + ?Sized,
    P: PlaceProvider + ?Sized,
{
    options.validate()?;
    let started_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let entities = store.load_entities()?;
    let mut candidates = select_candidates(
        &entities,
        &options.selection,
        &options.media_check,
        options.limit,
    );

    log::info!(
        "Starting {} of {} candidate(s) ({} in catalog, {} worker(s))",
        options.mode,
        candidates.len(),
        entities.len(),
        options.effective_workers(),
    );
    let _ = events.send(SyncEvent::RunStarted {
        mode: options.mode,
        total: candidates.len(),
    });

    let max_passes = match options.mode {
        SyncMode::Audit => 1,
        SyncMode::Reconcile => options.max_passes,
    };

    let mut acc = RunAccumulator::new();
    let mut passes: Vec<PassReport> = Vec::new();
    let mut stalled: u32 = 0;

    let stop_reason = if candidates.is_empty() {
        StopReason::NoCandidates
    } else {
        let mut pass: u32 = 0;
        loop {
            pass += 1;
            let report = run_pass(
                store,
                provider,
                options,
                pass,
                &mut candidates,
                &mut acc,
                &events,
            )
            .await;

            log::info!(
                "Pass {}: {} candidate(s), {} valid, {} fixed, {} failed (success rate {:.1}%)",
                report.pass,
                report.candidates,
                report.valid,
                report.fixed,
                report.failed,
                report.success_rate * 100.0,
            );

            let failed_ids: HashSet<String> = report.failed_ids.iter().cloned().collect();
            let fixed = report.fixed;
            let _ = events.send(SyncEvent::PassDone {
                report: report.clone(),
            });
            passes.push(report);

            if options.is_cancelled() {
                break StopReason::Cancelled;
            }
            if failed_ids.is_empty() {
                break StopReason::NoFailures;
            }
            if acc.success_rate() >= options.success_threshold {
                break StopReason::ThresholdReached;
            }
            if fixed < options.min_new_fixes {
                stalled += 1;
            } else {
                stalled = 0;
            }
            if stalled >= options.max_stalled_passes.max(1) {
                break StopReason::Stalled;
            }
            if pass >= max_passes {
                break StopReason::MaxPasses;
            }

            // Next pass retries exactly this pass's failures, in order.
            candidates.retain(|e| failed_ids.contains(&e.id));
        }
    };

    let summary = acc.finish(started_at, passes, stop_reason);
    log::info!(
        "Finished after {} pass(es): {} valid, {} fixed, {} failed ({})",
        summary.passes.len(),
        summary.valid,
        summary.fixed,
        summary.failed,
        summary.stop_reason,
    );

    if let Err(e) = store.record_run(&summary.to_sync_run(options.mode == SyncMode::Audit)) {
        log::warn!("Could not record run history: {}", e);
    }

    let _ = events.send(SyncEvent::Done {
        stop_reason: summary.stop_reason,
        success_rate: summary.success_rate,
    });
    Ok(summary)
}

/// Process every candidate once. Place-id changes made during the pass are
/// written back into `candidates` so the next pass can reuse them.
async fn run_pass<S, P>(
    store: &S,
    provider: &P,
    options: &SyncOptions,
    pass: u32,
    candidates: &mut [CatalogEntity],
    acc: &mut RunAccumulator,
    events: &UnboundedSender<SyncEvent>,
) -> PassReport
where
    S: CatalogStore + ?Sized,
    P: PlaceProvider + ?Sized,
{
    let _ = events.send(SyncEvent::PassStarted {
        pass,
        candidates: candidates.len(),
    });

    let workers = options.effective_workers();
    let circuit_open = AtomicBool::new(false);
    let mut consecutive_errors: u32 = 0;
    let mut results: HashMap<String, ReconciliationOutcome> = HashMap::new();
    let mut place_ids: HashMap<String, Option<String>> = HashMap::new();

    for (batch_index, batch) in candidates.chunks(options.batch_size).enumerate() {
        if batch_index > 0 && !options.is_cancelled() && !circuit_open.load(Ordering::Relaxed) {
            let _ = events.send(SyncEvent::BatchPause {
                pass,
                delay: options.batch_delay,
            });
            pause(options.batch_delay, options).await;
        }

        let circuit_open = &circuit_open;
        let mut stream = stream::iter(batch.iter().cloned())
            .map(|entity| async move {
                let report = if options.is_cancelled() {
                    skipped(&entity, ReconcileError::Cancelled)
                } else if circuit_open.load(Ordering::Relaxed) {
                    skipped(
                        &entity,
                        ReconcileError::CircuitOpen {
                            consecutive: CIRCUIT_BREAKER_THRESHOLD,
                        },
                    )
                } else {
                    log::debug!("Reconciling '{}' ({})", entity.name, entity.id);
                    match tokio::time::timeout(
                        ITEM_TIMEOUT,
                        reconcile_entity(provider, &entity, options),
                    )
                    .await
                    {
                        Ok(report) => report,
                        Err(_) => skipped(
                            &entity,
                            ReconcileError::Timeout {
                                secs: ITEM_TIMEOUT.as_secs(),
                            },
                        ),
                    }
                };
                (entity, report)
            })
            .buffer_unordered(workers);

        while let Some((entity, report)) = stream.next().await {
            let is_transport =
                matches!(&report.resolution, Resolution::Failed(e) if e.is_transport());
            let outcome =
                apply_report(store, options, pass, &entity, report, &mut place_ids).await;

            if is_transport {
                consecutive_errors += 1;
                if consecutive_errors >= CIRCUIT_BREAKER_THRESHOLD
                    && !circuit_open.swap(true, Ordering::Relaxed)
                {
                    log::warn!(
                        "Circuit breaker: {} consecutive transport errors, skipping the rest of pass {}",
                        consecutive_errors,
                        pass,
                    );
                    let _ = events.send(SyncEvent::CircuitOpen {
                        pass,
                        consecutive: consecutive_errors,
                    });
                }
            } else if !matches!(
                outcome.error_kind,
                Some(FailureKind::Cancelled | FailureKind::Transport)
            ) {
                consecutive_errors = 0;
            }

            let _ = events.send(SyncEvent::EntityFinished {
                pass,
                outcome: outcome.clone(),
            });
            acc.record(outcome.clone());
            results.insert(outcome.entity_id.clone(), outcome);
        }
    }

    for entity in candidates.iter_mut() {
        if let Some(place_id) = place_ids.remove(&entity.id) {
            entity.provider_place_id = place_id;
        }
    }

    let mut report = PassReport {
        pass,
        candidates: candidates.len(),
        success_rate: acc.success_rate(),
        ..Default::default()
    };
    for entity in candidates.iter() {
        report.candidate_ids.push(entity.id.clone());
        match results.get(&entity.id).map(|o| o.status) {
            Some(OutcomeStatus::Valid) => report.valid += 1,
            Some(OutcomeStatus::Fixed) => report.fixed += 1,
            _ => {
                report.failed += 1;
                report.failed_ids.push(entity.id.clone());
            }
        }
    }
    report
}

/// Turn a chain report into an outcome, writing to the store as needed.
async fn apply_report<S: CatalogStore + ?Sized>(
    store: &S,
    options: &SyncOptions,
    pass: u32,
    entity: &CatalogEntity,
    report: EntityReport,
    place_ids: &mut HashMap<String, Option<String>>,
) -> ReconciliationOutcome {
    let EntityReport {
        resolution,
        known_place_id,
    } = report;

    let error = match resolution {
        Resolution::Valid => return ReconciliationOutcome::valid(entity, pass),
        Resolution::Validated(update) => {
            match persist_media(store, &update, options.persist_attempts, options.persist_backoff)
                .await
            {
                Ok(()) => {
                    log::debug!("Fixed '{}' -> {}", entity.name, update.media_url);
                    place_ids.insert(entity.id.clone(), Some(update.provider_place_id.clone()));
                    return ReconciliationOutcome::fixed(entity, &update, pass);
                }
                Err(e) => e,
            }
        }
        Resolution::Failed(e) => e,
    };

    log::debug!("Failed '{}': {}", entity.name, error);

    if options.mode == SyncMode::Reconcile
        && known_place_id.as_deref() != entity.cached_place_id()
    {
        match store.cache_place_id(&entity.id, known_place_id.as_deref()) {
            Ok(()) => {
                place_ids.insert(entity.id.clone(), known_place_id.clone());
            }
            Err(e) => log::warn!("Could not cache place id for '{}': {}", entity.name, e),
        }
    }

    let mut outcome = ReconciliationOutcome::failed(entity, error.kind(), error.to_string(), pass);
    outcome.provider_place_id = known_place_id;
    outcome
}

fn skipped(entity: &CatalogEntity, error: ReconcileError) -> EntityReport {
    EntityReport {
        resolution: Resolution::Failed(error),
        known_place_id: entity.cached_place_id().map(str::to_string),
    }
}

/// Sleep for `delay`, returning early once the run is cancelled.
async fn pause(delay: Duration, options: &SyncOptions) {
    let deadline = Instant::now() + delay;
    loop {
        let now = Instant::now();
        if now >= deadline || options.is_cancelled() {
            break;
        }
        tokio::time::sleep((deadline - now).min(CANCEL_POLL)).await;
    }
}
