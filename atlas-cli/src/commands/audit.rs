use std::path::PathBuf;

use atlas_sync::{SelectionScope, SyncMode};

use crate::CliError;
use crate::cli_types::SelectArgs;

/// Live-check existing media. Nothing is searched or written except the run
/// history entry.
pub(crate) fn run_audit(
    db: Option<PathBuf>,
    select: SelectArgs,
    needs_media: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let mut options = super::options_from_args(&select);
    options.mode = SyncMode::Audit;
    options.revalidate_trusted = true;
    options.selection.scope = if needs_media {
        SelectionScope::NeedsMedia
    } else {
        SelectionScope::All
    };
    options.validate()?;

    let store = super::open_catalog(db, false)?;
    let summary = super::sync::execute(&store, options, &select, quiet)?;
    super::sync::report(&summary, &select)
}
