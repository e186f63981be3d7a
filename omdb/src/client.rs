//! OMDb API client implementation

use crate::{
    error::OmdbError,
    types::{SearchEnvelope, SearchPage, SearchRequest},
};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;

/// Public OMDb endpoint
pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com";

/// Per-request timeout used unless overridden
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MOVIE_NOT_FOUND: &str = "Movie not found!";
const INVALID_API_KEY: &str = "Invalid API key!";
const REQUEST_LIMIT_REACHED: &str = "Request limit reached!";

/// OMDb API client
#[derive(Clone)]
pub struct OmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for OmdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OmdbClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OmdbClient {
    /// Create a new client with API key from environment
    ///
    /// # Errors
    ///
    /// Returns `OmdbError::MissingApiKey` if `OMDB_API_KEY` is not set or empty
    pub fn from_env() -> Result<Self, OmdbError> {
        let api_key = std::env::var("OMDB_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(OmdbError::MissingApiKey)?;

        Ok(Self::new(api_key))
    }

    /// Create a new client with explicit API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at another host (mock servers, proxies)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search titles
    ///
    /// `"Movie not found!"` is not an error: it yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, timeouts, rejected keys, quota
    /// exhaustion, non-success statuses, unparseable bodies, and any other
    /// `"Response": "False"` answer.
    #[tracing::instrument(skip(self), fields(term = %request.term))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchPage, OmdbError> {
        let mut query = request.query_pairs();
        query.push(("apikey", self.api_key.clone()));

        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(OmdbError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(OmdbError::RateLimited),
            status if status.is_success() => {
                let body = response.text().await?;
                parse_search_body(&body)
            },
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(OmdbError::Http {
                    status: status.as_u16(),
                    body,
                })
            },
        }
    }
}

fn parse_search_body(body: &str) -> Result<SearchPage, OmdbError> {
    let envelope: SearchEnvelope = serde_json::from_str(body)
        .map_err(|e| OmdbError::ResponseParseFailed(e.to_string()))?;

    if envelope.response.eq_ignore_ascii_case("true") {
        let total_results = envelope
            .total_results
            .and_then(|total| total.parse().ok())
            .unwrap_or(envelope.search.len() as u64);

        tracing::debug!(hits = envelope.search.len(), total_results, "OMDb search succeeded");

        return Ok(SearchPage {
            hits: envelope.search,
            total_results,
        });
    }

    match envelope.error.as_deref() {
        Some(MOVIE_NOT_FOUND) => Ok(SearchPage::empty()),
        Some(INVALID_API_KEY) => Err(OmdbError::Unauthorized),
        Some(REQUEST_LIMIT_REACHED) => Err(OmdbError::RateLimited),
        Some(message) => Err(OmdbError::Api(message.to_string())),
        None => Err(OmdbError::ResponseParseFailed(
            "Response was False without an Error message".to_string(),
        )),
    }
}
