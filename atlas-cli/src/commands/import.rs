use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;

/// Load entities from a file and upsert them into the catalog.
pub(crate) fn run_import(db: Option<PathBuf>, file: &Path, dry_run: bool) -> Result<(), CliError> {
    let entities = atlas_catalog::load_entities(file)?;
    log::info!(
        "Read {} entities from {}",
        entities.len(),
        file.display().if_supports_color(Stdout, |t| t.cyan()),
    );

    let check = atlas_sync::SyncOptions::from_config().media_check;
    let needing = entities
        .iter()
        .filter(|e| check.classify(e.media_url()).needs_reconciliation())
        .count();
    log::info!("  {} need media", needing);

    if dry_run {
        log::info!(
            "{}",
            "Dry run: catalog not modified".if_supports_color(Stdout, |t| t.dimmed()),
        );
        return Ok(());
    }

    let store = super::open_catalog(db, true)?;
    let conn = store.connection();
    for entity in &entities {
        atlas_db::upsert_entity(conn, entity).map_err(|e| {
            CliError::database(format!("Failed to import '{}': {}", entity.id, e))
        })?;
    }

    log::info!(
        "  {} {} entities imported",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        entities.len(),
    );
    Ok(())
}
