//! Destination catalog data model, media URL classification, and file import.
//!
//! This crate defines the entities the reconciliation pipeline reads and
//! updates without any database or network dependencies. Consumers can use
//! these types directly for serialization, display, or passing to `atlas-db`
//! for persistence.

pub mod import;
pub mod media_check;
pub mod types;

pub use import::{ImportError, load_entities};
pub use media_check::{MediaCheck, MediaState};
pub use types::*;
