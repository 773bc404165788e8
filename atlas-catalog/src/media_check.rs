//! Cheap, offline classification of an entity's media URL.
//!
//! No network access happens here; this is the format check the candidate
//! selector applies before anything is sent to the provider.

use serde::{Deserialize, Serialize};
use url::Url;

/// Hosts whose photo URLs are considered stable once validated.
pub const DEFAULT_TRUSTED_HOSTS: &[&str] = &[
    "googleusercontent.com",
    "maps.googleapis.com",
    "places.googleapis.com",
];

/// Substrings that mark a URL as a stand-in rather than a real photo.
pub const DEFAULT_PLACEHOLDER_PATTERNS: &[&str] = &[
    "placeholder",
    "placehold.co",
    "source.unsplash.com",
    "no-image",
    "default-destination",
];

/// What the offline check concluded about a media URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    /// Null or blank.
    Missing,
    /// Matches a configured placeholder pattern.
    Placeholder,
    /// Not a parseable http(s) URL with a host.
    Malformed,
    /// Well-formed, but the host is not on the trusted list.
    Untrusted,
    /// Well-formed and served from a trusted host.
    Trusted,
}

impl MediaState {
    /// True when the entity must go through reconciliation.
    pub fn needs_reconciliation(&self) -> bool {
        !matches!(self, MediaState::Trusted)
    }

    /// True when there is an existing URL worth live-checking before
    /// searching the provider.
    pub fn has_candidate_url(&self) -> bool {
        matches!(self, MediaState::Untrusted | MediaState::Trusted)
    }
}

impl std::fmt::Display for MediaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Placeholder => write!(f, "placeholder"),
            Self::Malformed => write!(f, "malformed"),
            Self::Untrusted => write!(f, "untrusted"),
            Self::Trusted => write!(f, "trusted"),
        }
    }
}

/// Placeholder and trusted-host rules, loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCheck {
    #[serde(default)]
    pub placeholder_patterns: Vec<String>,
    #[serde(default)]
    pub trusted_hosts: Vec<String>,
}

impl Default for MediaCheck {
    fn default() -> Self {
        Self {
            placeholder_patterns: DEFAULT_PLACEHOLDER_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            trusted_hosts: DEFAULT_TRUSTED_HOSTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MediaCheck {
    /// Classify a media URL.
    pub fn classify(&self, url: Option<&str>) -> MediaState {
        let Some(raw) = url.map(str::trim).filter(|s| !s.is_empty()) else {
            return MediaState::Missing;
        };

        let lower = raw.to_ascii_lowercase();
        if self
            .placeholder_patterns
            .iter()
            .any(|p| !p.is_empty() && lower.contains(&p.to_ascii_lowercase()))
        {
            return MediaState::Placeholder;
        }

        let parsed = match Url::parse(raw) {
            Ok(u) => u,
            Err(_) => return MediaState::Malformed,
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return MediaState::Malformed;
        }
        let Some(host) = parsed.host_str() else {
            return MediaState::Malformed;
        };

        if self.is_trusted_host(host) {
            MediaState::Trusted
        } else {
            MediaState::Untrusted
        }
    }

    /// True when `url` parses and its host is on the trusted list.
    pub fn is_trusted_url(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| self.is_trusted_host(h)))
            .unwrap_or(false)
    }

    /// Host match: exact, or a subdomain of a listed host. A leading `*.` on
    /// a pattern is accepted and ignored.
    pub fn is_trusted_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.trusted_hosts.iter().any(|pattern| {
            let pattern = pattern.trim().trim_start_matches("*.").to_ascii_lowercase();
            !pattern.is_empty()
                && (host == pattern || host.ends_with(&format!(".{}", pattern)))
        })
    }
}
