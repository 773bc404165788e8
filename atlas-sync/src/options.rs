//! Run options and the `[sync]` config file section.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use atlas_catalog::MediaCheck;
use atlas_places::{GooglePlacesClient, LocationBias, PlacesConfig};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_MAX_PASSES: u32 = 3;
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 0.9;
pub const DEFAULT_COUNTRY_QUALIFIER: &str = "USA";
const DEFAULT_BATCH_DELAY_MS: u64 = 2000;
const DEFAULT_PERSIST_ATTEMPTS: u32 = 3;
const DEFAULT_PERSIST_BACKOFF_MS: u64 = 250;

/// What a run does with each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Resolve, validate and persist replacement media.
    #[default]
    Reconcile,
    /// Live-check existing media only. No provider searches, no writes.
    Audit,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reconcile => write!(f, "reconcile"),
            Self::Audit => write!(f, "audit"),
        }
    }
}

/// Candidate ordering strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateOrder {
    /// Featured names first (in list order), then by name.
    #[default]
    FeaturedFirst,
    Alphabetical,
    /// Never-updated first, then oldest `media_updated_at`.
    StalestFirst,
}

impl std::str::FromStr for CandidateOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "featured" | "featured-first" => Ok(Self::FeaturedFirst),
            "alphabetical" | "name" => Ok(Self::Alphabetical),
            "stalest" | "stalest-first" => Ok(Self::StalestFirst),
            other => Err(format!(
                "unknown order '{}' (expected featured, alphabetical or stalest)",
                other
            )),
        }
    }
}

/// Which entities are eligible for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionScope {
    /// Only entities whose media fails the offline check.
    #[default]
    NeedsMedia,
    /// Every entity.
    All,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionPolicy {
    pub scope: SelectionScope,
    pub order: CandidateOrder,
    /// Names that sort first under `FeaturedFirst`. Exact or
    /// case-insensitive substring match.
    pub featured: Vec<String>,
}

/// Options for one reconciliation run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Maximum candidates selected for the first pass.
    pub limit: Option<usize>,
    pub max_passes: u32,
    /// Stop once `(valid + fixed) / total` reaches this.
    pub success_threshold: f64,
    /// A pass fixing fewer than this many entities counts as stalled.
    pub min_new_fixes: usize,
    /// Stop after this many consecutive stalled passes.
    pub max_stalled_passes: u32,
    pub batch_size: usize,
    pub batch_delay: Duration,
    /// Concurrent entity chains per batch, clamped to `1..=batch_size`.
    pub workers: usize,
    pub persist_attempts: u32,
    pub persist_backoff: Duration,
    pub selection: SelectionPolicy,
    pub media_check: MediaCheck,
    pub country_qualifier: String,
    pub location_bias: Option<LocationBias>,
    /// Live-check trusted URLs even when they were validated before.
    pub revalidate_trusted: bool,
    pub cancel: Arc<AtomicBool>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Reconcile,
            limit: None,
            max_passes: DEFAULT_MAX_PASSES,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            min_new_fixes: 1,
            max_stalled_passes: 2,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            workers: 1,
            persist_attempts: DEFAULT_PERSIST_ATTEMPTS,
            persist_backoff: Duration::from_millis(DEFAULT_PERSIST_BACKOFF_MS),
            selection: SelectionPolicy::default(),
            media_check: MediaCheck::default(),
            country_qualifier: DEFAULT_COUNTRY_QUALIFIER.to_string(),
            location_bias: None,
            revalidate_trusted: false,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SyncOptions {
    /// Defaults overlaid with the `[sync]` section of the config file.
    pub fn from_config() -> Self {
        let mut options = Self::default();
        if let Some(section) = load_sync_section() {
            options.apply(&section);
        }
        options
    }

    /// Overlay values present in a config section.
    pub fn apply(&mut self, section: &SyncSection) {
        if let Some(v) = &section.featured {
            self.selection.featured = v.clone();
        }
        if let Some(v) = section.order {
            self.selection.order = v;
        }
        if let Some(v) = &section.placeholder_patterns {
            self.media_check.placeholder_patterns = v.clone();
        }
        if let Some(v) = &section.trusted_hosts {
            self.media_check.trusted_hosts = v.clone();
        }
        if let Some(v) = &section.country_qualifier {
            self.country_qualifier = v.clone();
        }
        if let Some(v) = section.batch_size {
            self.batch_size = v;
        }
        if let Some(v) = section.batch_delay_ms {
            self.batch_delay = Duration::from_millis(v);
        }
        if let Some(v) = section.workers {
            self.workers = v;
        }
        if let Some(v) = section.max_passes {
            self.max_passes = v;
        }
        if let Some(v) = section.success_threshold {
            self.success_threshold = v;
        }
        if let Some(v) = section.min_new_fixes {
            self.min_new_fixes = v;
        }
        if let Some(v) = section.max_stalled_passes {
            self.max_stalled_passes = v;
        }
        if let Some(v) = section.persist_attempts {
            self.persist_attempts = v;
        }
        if let Some(v) = section.revalidate_trusted {
            self.revalidate_trusted = v;
        }
        if let (Some(lat), Some(lng)) = (section.bias_latitude, section.bias_longitude) {
            self.location_bias = Some(LocationBias {
                latitude: lat,
                longitude: lng,
                radius_m: section.bias_radius_m.unwrap_or(50_000),
            });
        }
    }

    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.batch_size == 0 {
            return Err(SyncError::InvalidOptions("batch_size must be at least 1".into()));
        }
        if self.max_passes == 0 {
            return Err(SyncError::InvalidOptions("max_passes must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.success_threshold) {
            return Err(SyncError::InvalidOptions(format!(
                "success_threshold must be between 0 and 1, got {}",
                self.success_threshold
            )));
        }
        Ok(())
    }

    /// Worker count actually used.
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, self.batch_size.max(1))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// `[sync]` section of the config file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSection {
    pub featured: Option<Vec<String>>,
    pub order: Option<CandidateOrder>,
    pub placeholder_patterns: Option<Vec<String>>,
    pub trusted_hosts: Option<Vec<String>>,
    pub country_qualifier: Option<String>,
    pub batch_size: Option<usize>,
    pub batch_delay_ms: Option<u64>,
    pub workers: Option<usize>,
    pub max_passes: Option<u32>,
    pub success_threshold: Option<f64>,
    pub min_new_fixes: Option<usize>,
    pub max_stalled_passes: Option<u32>,
    pub persist_attempts: Option<u32>,
    pub revalidate_trusted: Option<bool>,
    pub bias_latitude: Option<f64>,
    pub bias_longitude: Option<f64>,
    pub bias_radius_m: Option<u32>,
}

/// Read the `[sync]` section, if the config file has one.
pub fn load_sync_section() -> Option<SyncSection> {
    let file = atlas_places::load_config_file()?;
    let value = file.other.get("sync")?.clone();
    match value.try_into::<SyncSection>() {
        Ok(section) => Some(section),
        Err(e) => {
            log::warn!("Ignoring invalid [sync] config section: {}", e);
            None
        }
    }
}

/// Build the production provider from env and config file settings.
///
/// A missing API key is `SyncError::MissingCredentials`.
pub fn load_provider() -> Result<GooglePlacesClient, SyncError> {
    let config = PlacesConfig::load()?;
    Ok(GooglePlacesClient::new(config)?)
}
