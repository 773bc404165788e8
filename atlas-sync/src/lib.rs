//! Media reconciliation for the destination catalog.
//!
//! Selects entities whose photo is missing or untrusted, resolves each one
//! against the place provider, validates the candidate photo URL, and
//! persists it. Repeats over the remaining failures until the run converges.

pub mod async_util;
pub mod controller;
pub mod error;
pub mod events;
pub mod run_log;
pub mod options;
pub mod outcome;
pub mod query;
pub mod reconcile;
pub mod selector;
pub mod store;
pub mod updater;

pub use controller::reconcile;
pub use error::{ReconcileError, StoreError, SyncError};
pub use events::SyncEvent;
pub use options::{
    CandidateOrder, SelectionPolicy, SelectionScope, SyncMode, SyncOptions, SyncSection,
    load_provider,
};
pub use outcome::{PassReport, RunAccumulator, RunSummary, StopReason};
pub use query::build_query;
pub use run_log::SyncLog;
pub use selector::select_candidates;
pub use store::{CatalogStore, SqliteCatalog};
