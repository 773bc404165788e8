use std::collections::BTreeMap;
use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use atlas_catalog::MediaState;

use crate::CliError;

/// Show how many entities have trusted, suspect or missing media.
pub(crate) fn run_status(db: Option<PathBuf>) -> Result<(), CliError> {
    let store = super::open_catalog(db, false)?;
    let entities = atlas_db::list_entities(store.connection())
        .map_err(|e| CliError::database(e.to_string()))?;
    let check = atlas_sync::SyncOptions::from_config().media_check;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut trusted = 0usize;
    let mut validated = 0usize;
    let mut with_place = 0usize;

    for entity in &entities {
        let state = check.classify(entity.media_url());
        if state == MediaState::Trusted {
            trusted += 1;
            if entity.media_updated_at.is_some() {
                validated += 1;
            }
        }
        if entity.cached_place_id().is_some() {
            with_place += 1;
        }
        *counts.entry(state.to_string()).or_default() += 1;
    }

    log::info!(
        "{}",
        "Catalog Media Coverage".if_supports_color(Stdout, |t| t.bold()),
    );
    crate::log_blank();
    log::info!("  Entities:      {}", entities.len());
    log::info!(
        "  Trusted media: {} ({})",
        trusted.if_supports_color(Stdout, |t| t.green()),
        percent(trusted, entities.len()),
    );
    log::info!("    validated:   {}", validated);
    log::info!("  Place ids:     {}", with_place);
    crate::log_blank();

    for (state, count) in &counts {
        if state == "trusted" {
            continue;
        }
        log::info!(
            "  {:<14} {}",
            format!("{}:", state),
            count.if_supports_color(Stdout, |t| t.yellow()),
        );
    }
    Ok(())
}

fn percent(part: usize, total: usize) -> String {
    if total == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", part as f64 * 100.0 / total as f64)
    }
}
