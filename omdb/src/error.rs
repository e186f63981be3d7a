//! Error types for the OMDb client

use thiserror::Error;

/// Errors that can occur when talking to the OMDb API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OmdbError {
    /// Missing `OMDB_API_KEY` environment variable
    #[error("Missing OMDB_API_KEY environment variable")]
    MissingApiKey,

    /// The request never produced a response (DNS, connect, TLS, reset)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// API key rejected
    #[error("Unauthorized - invalid API key")]
    Unauthorized,

    /// Daily request limit reached, or HTTP 429
    #[error("Rate limited - request limit reached")]
    RateLimited,

    /// Non-success HTTP status
    #[error("HTTP error (status {status}): {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The body was not a valid OMDb search payload
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// OMDb answered `"Response": "False"` with an error message
    #[error("OMDb error: {0}")]
    Api(String),
}

impl OmdbError {
    /// Whether retrying the same request may succeed
    ///
    /// Network failures, timeouts and 5xx responses are transient. Key,
    /// quota, parse and logical API errors are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::Timeout => true,
            Self::Http { status, .. } => *status >= 500,
            Self::MissingApiKey
            | Self::Unauthorized
            | Self::RateLimited
            | Self::ResponseParseFailed(_)
            | Self::Api(_) => false,
        }
    }
}

impl From<reqwest::Error> for OmdbError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::ResponseParseFailed(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}
