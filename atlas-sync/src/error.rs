use atlas_catalog::FailureKind;
use atlas_places::ProviderError;
use thiserror::Error;

/// Entity-local failure. Ends processing of one entity for the current pass
/// and never aborts the run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("No place matched '{query}'")]
    NotFound { query: String },
    #[error("Place {place_id} has no photos")]
    NoMedia { place_id: String },
    #[error("Media failed validation: {0}")]
    Invalid(String),
    #[error("Provider request failed: {0}")]
    Transport(#[from] ProviderError),
    #[error("Timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("Skipped: circuit breaker open after {consecutive} consecutive transport errors")]
    CircuitOpen { consecutive: u32 },
    #[error("Catalog write failed after {attempts} attempt(s): {message}")]
    Persistence { attempts: u32, message: String },
    #[error("Cancelled before processing")]
    Cancelled,
}

impl ReconcileError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::NoMedia { .. } => FailureKind::NoMedia,
            Self::Invalid(_) => FailureKind::Invalid,
            Self::Transport(_) | Self::Timeout { .. } | Self::CircuitOpen { .. } => {
                FailureKind::Transport
            }
            Self::Persistence { .. } => FailureKind::Persistence,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Transport failures feed the circuit breaker.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}

/// Errors from the catalog store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] atlas_db::OperationError),
    #[error("Schema error: {0}")]
    Schema(#[from] atlas_db::SchemaError),
    #[error("{0}")]
    Other(String),
}

/// Run-fatal errors, surfaced before any entity is processed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Missing provider credentials: {0}")]
    MissingCredentials(String),
    #[error("Catalog store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("Provider setup failed: {0}")]
    Provider(ProviderError),
}

impl From<ProviderError> for SyncError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Config(msg) => SyncError::MissingCredentials(msg),
            other => SyncError::Provider(other),
        }
    }
}
