//! Error types for movie search

use cinestate_omdb::OmdbError;
use cinestate_runtime::StoreError;
use thiserror::Error;

/// The movie catalog could not produce a result list
///
/// Carried inside actions, so it is `Clone` and comparable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No response from the catalog (network, DNS, connection reset)
    #[error("movie catalog unreachable: {0}")]
    Unreachable(String),

    /// The catalog did not answer in time
    #[error("movie catalog timed out")]
    Timeout,

    /// The catalog answered with something we could not interpret
    #[error("malformed catalog response: {0}")]
    Malformed(String),

    /// The catalog refused the request
    #[error("catalog rejected the request (status {status}): {message}")]
    Rejected {
        /// HTTP status, or 200 for logical rejections
        status: u16,
        /// Message reported by the catalog
        message: String,
    },

    /// Credentials were refused
    #[error("catalog credentials were rejected")]
    Unauthorized,

    /// Request quota exhausted
    #[error("catalog rate limit reached")]
    RateLimited,
}

impl From<OmdbError> for FetchError {
    fn from(error: OmdbError) -> Self {
        match error {
            OmdbError::RequestFailed(message) => Self::Unreachable(message),
            OmdbError::Timeout => Self::Timeout,
            OmdbError::ResponseParseFailed(message) => Self::Malformed(message),
            OmdbError::Http { status, body } => Self::Rejected {
                status,
                message: body,
            },
            OmdbError::Api(message) => Self::Rejected {
                status: 200,
                message,
            },
            OmdbError::MissingApiKey | OmdbError::Unauthorized => Self::Unauthorized,
            OmdbError::RateLimited => Self::RateLimited,
        }
    }
}

/// Errors returned to callers of the movie search store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The query was rejected before anything was dispatched
    #[error("invalid search query: {0}")]
    Validation(String),

    /// The catalog failed; previously held movies are untouched
    #[error("search failed: {0}")]
    Fetch(#[from] FetchError),

    /// The catalog answered with zero matches; previously held movies are untouched
    #[error("no movies found for '{term}'")]
    NoResults {
        /// The trimmed search term
        term: String,
    },

    /// A newer search was issued before this one resolved; its response was discarded
    #[error("search superseded by a newer request")]
    Superseded,

    /// The underlying store rejected the action or timed out
    #[error(transparent)]
    Store(#[from] StoreError),
}
