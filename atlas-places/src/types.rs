use serde::Deserialize;

// ── Wire types (Places web service JSON) ────────────────────────────────────

/// Response from `place/textsearch/json`.
#[derive(Debug, Deserialize)]
pub struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<TextSearchResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TextSearchResult {
    pub place_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub photos: Option<Vec<Photo>>,
}

/// Response from `place/details/json` with `fields=photos`.
#[derive(Debug, Deserialize)]
pub struct DetailsResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<DetailsResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DetailsResult {
    #[serde(default)]
    pub photos: Vec<Photo>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Photo {
    pub photo_reference: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub html_attributions: Vec<String>,
}

// ── Provider-neutral types ──────────────────────────────────────────────────

/// Circle used to bias a text search toward an area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationBias {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: u32,
}

impl LocationBias {
    /// Format for the `location`/`radius` query parameters.
    pub fn location_param(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// One text-search match, in provider relevance order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: Option<String>,
    pub rating: Option<f64>,
    /// Whether the search result advertised photos. `None` when the provider
    /// did not say.
    pub has_media: Option<bool>,
}

impl From<TextSearchResult> for PlaceCandidate {
    fn from(r: TextSearchResult) -> Self {
        Self {
            place_id: r.place_id,
            name: r.name,
            rating: r.rating,
            has_media: r.photos.map(|p| !p.is_empty()),
        }
    }
}

/// Opaque token addressing one photo of a place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub token: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub attributions: Vec<String>,
}

impl From<Photo> for MediaReference {
    fn from(p: Photo) -> Self {
        Self {
            token: p.photo_reference,
            width: p.width,
            height: p.height,
            attributions: p.html_attributions,
        }
    }
}

/// The media references a place details call returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceMedia {
    pub references: Vec<MediaReference>,
}

impl PlaceMedia {
    /// The provider's first photo, which it ranks as most representative.
    pub fn primary(&self) -> Option<&MediaReference> {
        self.references.first()
    }
}

/// Result of a header-only fetch of a media URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaProbe {
    /// URL the request ended on after redirects.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
}

impl MediaProbe {
    /// Accept only a successful response that declares an image type.
    pub fn is_image(&self) -> bool {
        (200..300).contains(&self.status)
            && self
                .content_type
                .as_deref()
                .map(crate::media::is_image_content_type)
                .unwrap_or(false)
    }
}
