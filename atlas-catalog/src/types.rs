//! Data model types for the destination catalog.
//!
//! These types represent the persistent entity record, the media update the
//! pipeline writes back, per-entity reconciliation outcomes, and run history.

use serde::{Deserialize, Serialize};

// ── Entity ──────────────────────────────────────────────────────────────────

/// Free-text location hints used to disambiguate place searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationContext {
    /// Street address, when known.
    #[serde(default)]
    pub address: Option<String>,
    /// Administrative region (county, park unit, district).
    #[serde(default)]
    pub sub_region: Option<String>,
    /// Broader region (state, province).
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl LocationContext {
    /// True when every field is missing or blank.
    pub fn is_empty(&self) -> bool {
        [&self.address, &self.sub_region, &self.region, &self.country]
            .iter()
            .all(|f| non_blank(f.as_deref()).is_none())
    }
}

/// A destination in the catalog.
///
/// Only the media fields (`media_url`, `provider_place_id`, `provider_rating`,
/// `media_updated_at`) are ever written by the reconciliation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: LocationContext,
    #[serde(default)]
    pub media_url: Option<String>,
    /// Place identifier cached from a prior successful resolution.
    #[serde(default)]
    pub provider_place_id: Option<String>,
    #[serde(default)]
    pub provider_rating: Option<f64>,
    /// RFC 3339 timestamp of the last successful media update.
    #[serde(default)]
    pub media_updated_at: Option<String>,
}

impl CatalogEntity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: LocationContext::default(),
            media_url: None,
            provider_place_id: None,
            provider_rating: None,
            media_updated_at: None,
        }
    }

    /// The media URL, treating blank strings as absent.
    pub fn media_url(&self) -> Option<&str> {
        non_blank(self.media_url.as_deref())
    }

    /// The cached place identifier, treating blank strings as absent.
    pub fn cached_place_id(&self) -> Option<&str> {
        non_blank(self.provider_place_id.as_deref())
    }
}

/// Trim a value and drop it if nothing is left.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// ── Media Update ────────────────────────────────────────────────────────────

/// A validated media assignment, written to the store as a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaUpdate {
    pub entity_id: String,
    pub media_url: String,
    pub provider_place_id: String,
    #[serde(default)]
    pub provider_rating: Option<f64>,
    pub updated_at: String,
}

// ── Outcomes ────────────────────────────────────────────────────────────────

/// Final classification of an entity after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Pre-existing media was already trustworthy.
    Valid,
    /// Media was missing or invalid and has been replaced.
    Fixed,
    /// No trustworthy media could be obtained this pass.
    Failed,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Fixed => write!(f, "fixed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Why an entity failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    NoMedia,
    Invalid,
    Transport,
    Persistence,
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NoMedia => "no_media",
            Self::Invalid => "invalid",
            Self::Transport => "transport",
            Self::Persistence => "persistence",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of reconciling one entity in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub entity_id: String,
    pub entity_name: String,
    pub status: OutcomeStatus,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub provider_place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Pass number (1-based) that produced this outcome.
    pub pass: u32,
}

impl ReconciliationOutcome {
    pub fn valid(entity: &CatalogEntity, pass: u32) -> Self {
        Self {
            entity_id: entity.id.clone(),
            entity_name: entity.name.clone(),
            status: OutcomeStatus::Valid,
            media_url: entity.media_url().map(str::to_string),
            provider_place_id: entity.cached_place_id().map(str::to_string),
            error_kind: None,
            error_detail: None,
            pass,
        }
    }

    pub fn fixed(entity: &CatalogEntity, update: &MediaUpdate, pass: u32) -> Self {
        Self {
            entity_id: entity.id.clone(),
            entity_name: entity.name.clone(),
            status: OutcomeStatus::Fixed,
            media_url: Some(update.media_url.clone()),
            provider_place_id: Some(update.provider_place_id.clone()),
            error_kind: None,
            error_detail: None,
            pass,
        }
    }

    pub fn failed(
        entity: &CatalogEntity,
        kind: FailureKind,
        detail: impl Into<String>,
        pass: u32,
    ) -> Self {
        Self {
            entity_id: entity.id.clone(),
            entity_name: entity.name.clone(),
            status: OutcomeStatus::Failed,
            media_url: entity.media_url().map(str::to_string),
            provider_place_id: entity.cached_place_id().map(str::to_string),
            error_kind: Some(kind),
            error_detail: Some(detail.into()),
            pass,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

// ── Run History ─────────────────────────────────────────────────────────────

/// A finished reconciliation run, as recorded in the run history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: i64,
    pub started_at: String,
    pub finished_at: String,
    pub total: u32,
    pub valid: u32,
    pub fixed: u32,
    pub failed: u32,
    pub passes: u32,
    pub stop_reason: String,
    pub dry_run: bool,
}
