//! SQLite persistence layer for the destination catalog.
//!
//! Provides schema creation, entity CRUD, the atomic media update used by
//! the reconciliation pipeline, and run history, backed by SQLite (via
//! rusqlite with the bundled feature).

pub mod operations;
pub mod queries;
pub mod schema;

pub use operations::{
    OperationError, insert_sync_run, set_place_id, update_entity_media, upsert_entity,
};
pub use queries::{find_entity, list_entities, list_sync_runs};
pub use schema::{SchemaError, open_database, open_memory};
