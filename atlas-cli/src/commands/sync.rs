use std::path::PathBuf;
use std::sync::atomic::Ordering;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use atlas_sync::{
    CatalogStore, RunSummary, SelectionScope, SqliteCatalog, SyncEvent, SyncLog, SyncMode,
    SyncOptions, build_query, select_candidates,
};

use crate::CliError;
use crate::cli_types::SelectArgs;
use crate::progress::RunProgress;

/// Flags specific to `sync`.
pub(crate) struct SyncFlags {
    pub max_passes: Option<u32>,
    pub threshold: Option<f64>,
    pub revalidate: bool,
    pub all: bool,
    pub dry_run: bool,
}

/// Reconcile media for the selected entities.
pub(crate) fn run_sync(
    db: Option<PathBuf>,
    select: SelectArgs,
    flags: SyncFlags,
    quiet: bool,
) -> Result<(), CliError> {
    let mut options = super::options_from_args(&select);
    options.mode = SyncMode::Reconcile;
    if let Some(n) = flags.max_passes {
        options.max_passes = n;
    }
    if let Some(t) = flags.threshold {
        options.success_threshold = t;
    }
    if flags.revalidate {
        options.revalidate_trusted = true;
    }
    if flags.all {
        options.selection.scope = SelectionScope::All;
    }
    options.validate()?;

    let store = super::open_catalog(db, false)?;

    if flags.dry_run {
        return print_plan(&store, &options);
    }

    let summary = execute(&store, options, &select, quiet)?;
    report(&summary, &select)
}

/// Build the provider, run the pipeline on a fresh runtime, and stream its
/// events to the terminal. Ctrl-C stops the run after in-flight entities.
pub(crate) fn execute(
    store: &SqliteCatalog,
    options: SyncOptions,
    select: &SelectArgs,
    quiet: bool,
) -> Result<RunSummary, CliError> {
    let provider = atlas_sync::load_provider()?;
    let rt = super::runtime()?;

    let progress = RunProgress::new(quiet || select.json);
    let mut sync_log = SyncLog::new();

    let summary = rt.block_on(async {
        let cancel = options.cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, finishing in-flight entities...");
                cancel.store(true, Ordering::Relaxed);
            }
        });

        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel::<SyncEvent>();
        let run = atlas_sync::reconcile(store, &provider, &options, event_tx);

        let result = atlas_sync::async_util::run_with_events(run, event_rx, |event| {
            if let SyncEvent::EntityFinished { outcome, .. } = &event {
                sync_log.add(outcome.clone());
            }
            progress.handle(&event);
        })
        .await;

        watcher.abort();
        result
    });
    progress.finish();
    let summary = summary?;

    if let Some(path) = &select.log_file {
        sync_log.write_to_file(path, &summary)?;
        log::info!(
            "Log written to {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
        );
    }

    Ok(summary)
}

/// Print the summary as text or JSON.
pub(crate) fn report(summary: &RunSummary, select: &SelectArgs) -> Result<(), CliError> {
    if select.json {
        let json = serde_json::to_string_pretty(summary)
            .map_err(|e| CliError::other(format!("Failed to serialize summary: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    crate::log_blank();
    log::info!(
        "{}",
        "Summary".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!(
        "  {} valid, {} fixed, {} failed of {} ({:.1}% success)",
        summary.valid.if_supports_color(Stdout, |t| t.green()),
        summary.fixed.if_supports_color(Stdout, |t| t.green()),
        summary.failed.if_supports_color(Stdout, |t| t.red()),
        summary.total,
        summary.success_rate * 100.0,
    );
    log::info!(
        "  {} pass(es), stopped: {}",
        summary.passes.len(),
        summary.stop_reason.if_supports_color(Stdout, |t| t.dimmed()),
    );

    if summary.failed > 0 {
        crate::log_blank();
        log::warn!("{} still without valid media:", summary.failed);
        for outcome in summary.failures() {
            log::warn!(
                "  {} {} [{}] {}",
                "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                super::truncate(&outcome.entity_name, 48),
                outcome.error_kind.map(|k| k.as_str()).unwrap_or("unknown"),
                outcome.error_detail.as_deref().unwrap_or(""),
            );
        }
    }
    Ok(())
}

/// Show what a run would select and search for, without touching the network.
fn print_plan(store: &SqliteCatalog, options: &SyncOptions) -> Result<(), CliError> {
    let entities = store
        .load_entities()
        .map_err(|e| CliError::database(e.to_string()))?;
    let candidates = select_candidates(
        &entities,
        &options.selection,
        &options.media_check,
        options.limit,
    );

    log::info!(
        "{} {} of {} entities selected",
        "Dry run:".if_supports_color(Stdout, |t| t.bold()),
        candidates.len(),
        entities.len(),
    );
    crate::log_blank();

    for entity in &candidates {
        let state = options.media_check.classify(entity.media_url());
        let query = build_query(&entity.name, &entity.location, &options.country_qualifier);
        log::info!(
            "  {} {}",
            super::truncate(&entity.name, 48).if_supports_color(Stdout, |t| t.bold()),
            format!("({})", state).if_supports_color(Stdout, |t| t.dimmed()),
        );
        match entity.cached_place_id() {
            Some(place_id) => log::info!("      place: {}", place_id),
            None => log::info!("      query: {}", query),
        }
    }
    Ok(())
}
