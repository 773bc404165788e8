//! The per-entity chain: resolve a place, locate its media, validate the
//! media URL.
//!
//! Nothing here touches the catalog store. The chain reports what it found
//! and the controller applies it, since store handles stay on one task.

use atlas_catalog::{CatalogEntity, MediaCheck, MediaState, MediaUpdate};
use atlas_places::media::redact_key;
use atlas_places::{LocationBias, MediaReference, PlaceCandidate, PlaceProvider};
use chrono::SecondsFormat;

use crate::error::ReconcileError;
use crate::options::{SyncMode, SyncOptions};
use crate::query::build_query;

/// What the chain concluded for one entity.
#[derive(Debug)]
pub enum Resolution {
    /// Existing media is trustworthy. Nothing to write.
    Valid,
    /// Replacement media that passed validation, ready to persist.
    Validated(MediaUpdate),
    /// No trustworthy media this pass.
    Failed(ReconcileError),
}

#[derive(Debug)]
pub struct EntityReport {
    pub resolution: Resolution,
    /// Best place identifier known after this attempt. When it differs from
    /// the entity's cached one, the controller updates the cache.
    pub known_place_id: Option<String>,
}

impl ReconcileError {
    /// The provider rejected a place identifier it issued earlier.
    pub fn is_stale_place(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_stale_place())
    }
}

/// Text search, first result wins. An empty result list is `NotFound`.
pub async fn resolve_place<P: PlaceProvider + ?Sized>(
    provider: &P,
    query: &str,
    bias: Option<LocationBias>,
) -> Result<PlaceCandidate, ReconcileError> {
    let mut candidates = provider.text_search(query, bias).await?;
    if candidates.is_empty() {
        return Err(ReconcileError::NotFound {
            query: query.to_string(),
        });
    }
    Ok(candidates.swap_remove(0))
}

/// Fetch the primary media reference for a place. A place without photos is
/// `NoMedia`.
pub async fn locate_media<P: PlaceProvider + ?Sized>(
    provider: &P,
    place_id: &str,
) -> Result<MediaReference, ReconcileError> {
    let media = provider.place_media(place_id).await?;
    media
        .references
        .into_iter()
        .next()
        .ok_or_else(|| ReconcileError::NoMedia {
            place_id: place_id.to_string(),
        })
}

/// Live-check a media URL. Returns the URL to store.
///
/// Accepts only a 2xx response declaring an `image/*` type; any network
/// failure is `Invalid`. When redirects land on a trusted host the final URL
/// is returned instead.
pub async fn validate_media<P: PlaceProvider + ?Sized>(
    provider: &P,
    url: &str,
    check: &MediaCheck,
) -> Result<String, ReconcileError> {
    let probe = provider
        .probe_media(url)
        .await
        .map_err(|e| ReconcileError::Invalid(e.to_string()))?;

    if !probe.is_image() {
        return Err(ReconcileError::Invalid(format!(
            "HTTP {} with content type {}",
            probe.status,
            probe.content_type.as_deref().unwrap_or("(none)")
        )));
    }

    if probe.final_url != url && check.is_trusted_url(&probe.final_url) {
        Ok(probe.final_url)
    } else {
        Ok(url.to_string())
    }
}

/// Run the whole chain for one entity.
pub async fn reconcile_entity<P: PlaceProvider + ?Sized>(
    provider: &P,
    entity: &CatalogEntity,
    options: &SyncOptions,
) -> EntityReport {
    let mut known_place_id = entity.cached_place_id().map(str::to_string);
    let state = options.media_check.classify(entity.media_url());

    let resolution = match options.mode {
        SyncMode::Audit => audit_existing(provider, entity, state, options).await,
        SyncMode::Reconcile => {
            if state.has_candidate_url()
                && existing_still_valid(provider, entity, state, options).await
            {
                Resolution::Valid
            } else {
                match repair(provider, entity, options, &mut known_place_id).await {
                    Ok(update) => Resolution::Validated(update),
                    Err(e) => Resolution::Failed(e),
                }
            }
        }
    };

    EntityReport {
        resolution,
        known_place_id,
    }
}

async fn audit_existing<P: PlaceProvider + ?Sized>(
    provider: &P,
    entity: &CatalogEntity,
    state: MediaState,
    options: &SyncOptions,
) -> Resolution {
    let Some(url) = entity.media_url().filter(|_| state.has_candidate_url()) else {
        return Resolution::Failed(ReconcileError::Invalid(format!("media is {}", state)));
    };
    match validate_media(provider, url, &options.media_check).await {
        Ok(_) => Resolution::Valid,
        Err(e) => Resolution::Failed(e),
    }
}

/// Live-check an existing URL before searching for a replacement. Trusted
/// media that was validated before skips the check unless revalidation is
/// forced.
async fn existing_still_valid<P: PlaceProvider + ?Sized>(
    provider: &P,
    entity: &CatalogEntity,
    state: MediaState,
    options: &SyncOptions,
) -> bool {
    let Some(url) = entity.media_url() else {
        return false;
    };
    if state == MediaState::Trusted
        && entity.media_updated_at.is_some()
        && !options.revalidate_trusted
    {
        return true;
    }
    match validate_media(provider, url, &options.media_check).await {
        Ok(_) => true,
        Err(e) => {
            log::debug!("Existing media for '{}' no longer valid: {}", entity.name, e);
            false
        }
    }
}

async fn repair<P: PlaceProvider + ?Sized>(
    provider: &P,
    entity: &CatalogEntity,
    options: &SyncOptions,
    known_place_id: &mut Option<String>,
) -> Result<MediaUpdate, ReconcileError> {
    let mut rating = entity.provider_rating;

    let (place_id, reference) = match entity.cached_place_id() {
        Some(cached) => match locate_media(provider, cached).await {
            Ok(reference) => (cached.to_string(), reference),
            Err(e) if e.is_stale_place() => {
                log::debug!(
                    "Cached place {} for '{}' rejected ({}), searching again",
                    cached,
                    entity.name,
                    e
                );
                *known_place_id = None;
                fresh_lookup(provider, entity, options, known_place_id, &mut rating).await?
            }
            Err(e) => return Err(e),
        },
        None => fresh_lookup(provider, entity, options, known_place_id, &mut rating).await?,
    };

    let built = provider.media_url(&reference.token);
    let mut media_url = validate_media(provider, &built, &options.media_check).await?;
    if media_url == built {
        // No redirect to a stable host; never store the credential.
        media_url = redact_key(&built);
    }

    Ok(MediaUpdate {
        entity_id: entity.id.clone(),
        media_url,
        provider_place_id: place_id,
        provider_rating: rating,
        updated_at: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

async fn fresh_lookup<P: PlaceProvider + ?Sized>(
    provider: &P,
    entity: &CatalogEntity,
    options: &SyncOptions,
    known_place_id: &mut Option<String>,
    rating: &mut Option<f64>,
) -> Result<(String, MediaReference), ReconcileError> {
    let query = build_query(&entity.name, &entity.location, &options.country_qualifier);
    let candidate = resolve_place(provider, &query, options.location_bias).await?;
    log::debug!("'{}' resolved to place {}", entity.name, candidate.place_id);

    *known_place_id = Some(candidate.place_id.clone());
    *rating = candidate.rating;

    let reference = locate_media(provider, &candidate.place_id).await?;
    Ok((candidate.place_id, reference))
}
