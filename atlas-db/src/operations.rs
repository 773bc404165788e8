//! Write operations for catalog entities and run history.

use atlas_catalog::types::*;
use rusqlite::{Connection, params};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },
}

// ── Entity Operations ───────────────────────────────────────────────────────

/// Insert or update an entity.
///
/// Name and location always take the incoming values. Media fields are only
/// overwritten when the incoming record carries them, so re-importing a
/// catalog export never erases photos the pipeline already found.
pub fn upsert_entity(conn: &Connection, entity: &CatalogEntity) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO entities (id, name, address, sub_region, region, country,
             media_url, provider_place_id, provider_rating, media_updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             address = excluded.address,
             sub_region = excluded.sub_region,
             region = excluded.region,
             country = excluded.country,
             media_url = COALESCE(excluded.media_url, entities.media_url),
             provider_place_id = COALESCE(excluded.provider_place_id, entities.provider_place_id),
             provider_rating = COALESCE(excluded.provider_rating, entities.provider_rating),
             media_updated_at = COALESCE(excluded.media_updated_at, entities.media_updated_at),
             updated_at = datetime('now')",
        params![
            entity.id,
            entity.name,
            entity.location.address,
            entity.location.sub_region,
            entity.location.region,
            entity.location.country,
            entity.media_url,
            entity.provider_place_id,
            entity.provider_rating,
            entity.media_updated_at,
        ],
    )?;
    Ok(())
}

/// Apply a validated media update in a single statement.
///
/// URL, place identifier, rating and freshness timestamp change together or
/// not at all. Running the same update twice leaves identical state.
pub fn update_entity_media(conn: &Connection, update: &MediaUpdate) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE entities SET
             media_url = ?2,
             provider_place_id = ?3,
             provider_rating = ?4,
             media_updated_at = ?5,
             updated_at = ?5
         WHERE id = ?1",
        params![
            update.entity_id,
            update.media_url,
            update.provider_place_id,
            update.provider_rating,
            update.updated_at,
        ],
    )?;
    if changed == 0 {
        return Err(OperationError::NotFound {
            entity_type: "entity".to_string(),
            id: update.entity_id.clone(),
        });
    }
    Ok(())
}

/// Cache (or clear, with `None`) the provider place identifier.
///
/// Media fields are untouched: a cached identifier without a photo is a
/// valid state, a photo without provenance is not.
pub fn set_place_id(
    conn: &Connection,
    entity_id: &str,
    place_id: Option<&str>,
) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE entities SET provider_place_id = ?2 WHERE id = ?1",
        params![entity_id, place_id],
    )?;
    if changed == 0 {
        return Err(OperationError::NotFound {
            entity_type: "entity".to_string(),
            id: entity_id.to_string(),
        });
    }
    Ok(())
}

// ── Run History ─────────────────────────────────────────────────────────────

/// Record a finished run. Returns the new row id.
pub fn insert_sync_run(conn: &Connection, run: &SyncRun) -> Result<i64, OperationError> {
    conn.execute(
        "INSERT INTO sync_runs (started_at, finished_at, total, valid, fixed, failed,
             passes, stop_reason, dry_run)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            run.started_at,
            run.finished_at,
            run.total,
            run.valid,
            run.fixed,
            run.failed,
            run.passes,
            run.stop_reason,
            run.dry_run,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}
