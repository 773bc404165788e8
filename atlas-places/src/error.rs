/// Errors that can occur while talking to the place-search provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited by the Places API")]
    RateLimit,

    #[error("Places API rejected the key: {0}")]
    InvalidCredentials(String),

    #[error("Place '{0}' is unknown to the Places API")]
    PlaceNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// True when the provider says a previously valid place identifier no
    /// longer resolves, so a cached copy should be discarded.
    pub fn is_stale_place(&self) -> bool {
        matches!(self, Self::PlaceNotFound(_) | Self::InvalidRequest(_))
    }
}
