use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::credentials::PlacesConfig;
use crate::error::ProviderError;
use crate::media;
use crate::provider::PlaceProvider;
use crate::types::{
    DetailsResponse, LocationBias, MediaProbe, PlaceCandidate, PlaceMedia, TextSearchResponse,
};

/// HTTP client for the Places web service with global request pacing.
///
/// Every clone of the inner `Arc`s shares one pacing clock, so concurrent
/// workers together never exceed one request per `request_interval`.
pub struct GooglePlacesClient {
    http: reqwest::Client,
    config: PlacesConfig,
    last_request: Arc<Mutex<Instant>>,
}

impl GooglePlacesClient {
    pub fn new(config: PlacesConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let now = Instant::now();
        let start = now.checked_sub(config.request_interval).unwrap_or(now);
        let last_request = Arc::new(Mutex::new(start));
        Ok(Self {
            http,
            config,
            last_request,
        })
    }

    pub fn config(&self) -> &PlacesConfig {
        &self.config
    }

    /// Wait until at least `request_interval` has passed since the last
    /// provider request.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.config.request_interval {
            tokio::time::sleep(self.config.request_interval - elapsed).await;
        }
        *last = Instant::now();
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, ProviderError> {
        self.rate_limit().await;

        let resp = self
            .http
            .get(self.endpoint(path))
            .query(params)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimit);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::InvalidCredentials(format!("HTTP {}", status.as_u16())));
        }

        let text = resp.text().await.map_err(map_send_error)?;
        if !status.is_success() {
            return Err(ProviderError::ServerError {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl PlaceProvider for GooglePlacesClient {
    async fn text_search(
        &self,
        query: &str,
        bias: Option<LocationBias>,
    ) -> Result<Vec<PlaceCandidate>, ProviderError> {
        let mut params = vec![
            ("query", query.to_string()),
            ("key", self.config.api_key.clone()),
        ];
        if let Some(bias) = bias {
            params.push(("location", bias.location_param()));
            params.push(("radius", bias.radius_m.to_string()));
        }

        let body = self.get_json("textsearch/json", &params).await?;
        let candidates = parse_text_search(&body)?;
        log::debug!("Text search '{}' returned {} result(s)", query, candidates.len());
        Ok(candidates)
    }

    async fn place_media(&self, place_id: &str) -> Result<PlaceMedia, ProviderError> {
        let params = [
            ("place_id", place_id.to_string()),
            ("fields", "photos".to_string()),
            ("key", self.config.api_key.clone()),
        ];

        let body = self.get_json("details/json", &params).await?;
        parse_details(&body, place_id)
    }

    fn media_url(&self, reference: &str) -> String {
        media::photo_url(
            &self.config.base_url,
            reference,
            self.config.max_width,
            &self.config.api_key,
        )
    }

    async fn probe_media(&self, url: &str) -> Result<MediaProbe, ProviderError> {
        // Photo endpoint hits are billed like any other provider call;
        // third-party image hosts are not paced.
        if url.starts_with(&self.config.base_url) {
            self.rate_limit().await;
        }

        let resp = self.http.head(url).send().await.map_err(map_send_error)?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(MediaProbe {
            final_url: resp.url().to_string(),
            status: resp.status().as_u16(),
            content_type,
        })
    }
}

fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http(e)
    }
}

/// Map a provider `status` field onto an error, or `None` for success.
fn status_error(status: &str, message: Option<&str>, place_id: &str) -> Option<ProviderError> {
    let message = message.unwrap_or(status).to_string();
    match status {
        "OK" | "ZERO_RESULTS" => None,
        "OVER_QUERY_LIMIT" => Some(ProviderError::RateLimit),
        "REQUEST_DENIED" => Some(ProviderError::InvalidCredentials(message)),
        "NOT_FOUND" => Some(ProviderError::PlaceNotFound(place_id.to_string())),
        "INVALID_REQUEST" => Some(ProviderError::InvalidRequest(message)),
        _ => Some(ProviderError::Api(format!("{}: {}", status, message))),
    }
}

/// Parse a text-search body into candidates, keeping provider order.
pub fn parse_text_search(body: &str) -> Result<Vec<PlaceCandidate>, ProviderError> {
    let response: TextSearchResponse = serde_json::from_str(body)?;
    if let Some(err) = status_error(&response.status, response.error_message.as_deref(), "") {
        return Err(err);
    }
    Ok(response.results.into_iter().map(PlaceCandidate::from).collect())
}

/// Parse a details body into media references.
pub fn parse_details(body: &str, place_id: &str) -> Result<PlaceMedia, ProviderError> {
    let response: DetailsResponse = serde_json::from_str(body)?;
    if let Some(err) = status_error(&response.status, response.error_message.as_deref(), place_id)
    {
        return Err(err);
    }
    let photos = response.result.map(|r| r.photos).unwrap_or_default();
    Ok(PlaceMedia {
        references: photos.into_iter().map(Into::into).collect(),
    })
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
