//! Read queries for the catalog database.

use atlas_catalog::types::*;
use rusqlite::{Connection, params};

use crate::operations::OperationError;

const ENTITY_COLUMNS: &str = "id, name, address, sub_region, region, country,
     media_url, provider_place_id, provider_rating, media_updated_at";

/// List every entity, ordered by name then id.
pub fn list_entities(conn: &Connection) -> Result<Vec<CatalogEntity>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTITY_COLUMNS} FROM entities ORDER BY name, id"
    ))?;
    let rows = stmt.query_map([], row_to_entity)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Find a single entity by id.
pub fn find_entity(conn: &Connection, id: &str) -> Result<Option<CatalogEntity>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"
    ))?;
    match stmt.query_row(params![id], row_to_entity) {
        Ok(entity) => Ok(Some(entity)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List recent runs, newest first.
pub fn list_sync_runs(
    conn: &Connection,
    limit: Option<u32>,
) -> Result<Vec<SyncRun>, OperationError> {
    let limit = limit.unwrap_or(20);
    let mut stmt = conn.prepare(
        "SELECT id, started_at, finished_at, total, valid, fixed, failed, passes,
                stop_reason, dry_run
         FROM sync_runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(SyncRun {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            total: row.get(3)?,
            valid: row.get(4)?,
            fixed: row.get(5)?,
            failed: row.get(6)?,
            passes: row.get(7)?,
            stop_reason: row.get(8)?,
            dry_run: row.get(9)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

// ── Row Mapping Helpers ─────────────────────────────────────────────────────

fn row_to_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogEntity> {
    Ok(CatalogEntity {
        id: row.get(0)?,
        name: row.get(1)?,
        location: LocationContext {
            address: row.get(2)?,
            sub_region: row.get(3)?,
            region: row.get(4)?,
            country: row.get(5)?,
        },
        media_url: row.get(6)?,
        provider_place_id: row.get(7)?,
        provider_rating: row.get(8)?,
        media_updated_at: row.get(9)?,
    })
}
