use std::path::PathBuf;

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;

/// List recent runs, newest first.
pub(crate) fn run_history(db: Option<PathBuf>, limit: u32) -> Result<(), CliError> {
    let store = super::open_catalog(db, false)?;
    let runs = atlas_db::list_sync_runs(store.connection(), Some(limit))
        .map_err(|e| CliError::database(e.to_string()))?;

    if runs.is_empty() {
        log::info!("No runs recorded yet.");
        return Ok(());
    }

    log::info!(
        "{}",
        format!(
            "{:<6} {:<17} {:>6} {:>6} {:>6} {:>6} {:>6}  {}",
            "ID", "Started", "Total", "Valid", "Fixed", "Failed", "Passes", "Stop"
        )
        .if_supports_color(Stdout, |t| t.bold()),
    );

    for run in &runs {
        let kind = if run.dry_run { " (audit)" } else { "" };
        log::info!(
            "{:<6} {:<17} {:>6} {:>6} {:>6} {:>6} {:>6}  {}{}",
            run.id,
            local_time(&run.started_at),
            run.total,
            run.valid,
            run.fixed,
            run.failed,
            run.passes,
            run.stop_reason,
            kind.if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}

/// Render an RFC 3339 timestamp in local time, or as-is if it doesn't parse.
fn local_time(ts: &str) -> String {
    DateTime::parse_from_rfc3339(ts)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| ts.to_string())
}
