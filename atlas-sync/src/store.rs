//! The catalog store seam and its SQLite implementation.

use std::path::Path;

use atlas_catalog::{CatalogEntity, MediaUpdate, SyncRun};
use rusqlite::Connection;

use crate::error::StoreError;

/// Read/write access to catalog entities.
///
/// Calls are synchronous and made only from the controller task, so
/// implementations need not be `Send`.
pub trait CatalogStore {
    /// Every entity in the catalog.
    fn load_entities(&self) -> Result<Vec<CatalogEntity>, StoreError>;

    /// Apply a validated media update as one atomic write.
    fn update_media(&self, update: &MediaUpdate) -> Result<(), StoreError>;

    /// Cache (or with `None`, drop) a resolved place identifier without
    /// touching the media fields.
    fn cache_place_id(&self, entity_id: &str, place_id: Option<&str>) -> Result<(), StoreError>;

    /// Append a finished run to the run history. Returns the new row id.
    fn record_run(&self, run: &SyncRun) -> Result<i64, StoreError>;
}

/// `CatalogStore` over a SQLite catalog database.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(atlas_db::open_database(path)?))
    }

    pub fn open_memory() -> Result<Self, StoreError> {
        Ok(Self::new(atlas_db::open_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl CatalogStore for SqliteCatalog {
    fn load_entities(&self) -> Result<Vec<CatalogEntity>, StoreError> {
        Ok(atlas_db::list_entities(&self.conn)?)
    }

    fn update_media(&self, update: &MediaUpdate) -> Result<(), StoreError> {
        Ok(atlas_db::update_entity_media(&self.conn, update)?)
    }

    fn cache_place_id(&self, entity_id: &str, place_id: Option<&str>) -> Result<(), StoreError> {
        Ok(atlas_db::set_place_id(&self.conn, entity_id, place_id)?)
    }

    fn record_run(&self, run: &SyncRun) -> Result<i64, StoreError> {
        Ok(atlas_db::insert_sync_run(&self.conn, run)?)
    }
}
