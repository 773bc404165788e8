pub(crate) mod audit;
pub(crate) mod config;
pub(crate) mod history;
pub(crate) mod import;
pub(crate) mod status;
pub(crate) mod sync;

use std::path::PathBuf;

use atlas_sync::{SqliteCatalog, SyncOptions};

use crate::CliError;
use crate::cli_types::SelectArgs;

/// Default location of the catalog database.
pub(crate) fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("atlas-media"))
        .unwrap_or_else(|| PathBuf::from(".atlas-media"))
        .join("catalog.db")
}

/// Open the catalog, refusing to create one unless `create` is set.
pub(crate) fn open_catalog(db: Option<PathBuf>, create: bool) -> Result<SqliteCatalog, CliError> {
    let path = db.unwrap_or_else(default_db_path);

    if !path.exists() {
        if !create {
            return Err(CliError::database(format!(
                "No catalog database found at {}. Run 'atlas-media import <file>' first.",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    log::debug!("Opening catalog {}", path.display());
    SqliteCatalog::open(&path)
        .map_err(|e| CliError::database(format!("Failed to open {}: {}", path.display(), e)))
}

/// Config-file options overlaid with command-line selection flags.
pub(crate) fn options_from_args(select: &SelectArgs) -> SyncOptions {
    let mut options = SyncOptions::from_config();
    options.limit = select.limit;
    if let Some(order) = select.order {
        options.selection.order = order;
    }
    if let Some(featured) = &select.featured {
        options.selection.featured = featured.clone();
    }
    if let Some(n) = select.batch_size {
        options.batch_size = n;
    }
    if let Some(ms) = select.batch_delay_ms {
        options.batch_delay = std::time::Duration::from_millis(ms);
    }
    if let Some(n) = select.workers {
        options.workers = n;
    }
    options
}

/// Truncate a string to a maximum width, appending "..." if needed.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {}", e)))
}
