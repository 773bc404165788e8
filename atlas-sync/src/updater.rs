use std::time::Duration;

use atlas_catalog::MediaUpdate;

use crate::error::ReconcileError;
use crate::store::CatalogStore;

/// Persist a validated media update, retrying up to `attempts` times.
///
/// The write itself is one atomic statement, so a failed attempt leaves the
/// entity untouched and a retry with the same update is safe.
pub async fn persist_media<S: CatalogStore + ?Sized>(
    store: &S,
    update: &MediaUpdate,
    attempts: u32,
    backoff: Duration,
) -> Result<(), ReconcileError> {
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match store.update_media(update) {
            Ok(()) => return Ok(()),
            Err(e) => {
                log::debug!(
                    "Write for {} failed (attempt {}/{}): {}",
                    update.entity_id,
                    attempt,
                    attempts,
                    e
                );
                last_error = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    Err(ReconcileError::Persistence {
        attempts,
        message: last_error,
    })
}
