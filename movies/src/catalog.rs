//! OMDb-backed movie catalog

use crate::environment::MovieCatalog;
use crate::error::FetchError;
use crate::types::{Movie, SearchQuery};
use cinestate_omdb::{OmdbClient, OmdbError, SearchRequest};
use cinestate_runtime::retry::{RetryPolicy, retry_with_predicate};
use std::future::Future;
use std::pin::Pin;

/// [`MovieCatalog`] backed by the OMDb search endpoint
///
/// Transient failures (network errors, timeouts, 5xx) are retried with
/// exponential backoff before being reported.
#[derive(Debug, Clone)]
pub struct OmdbCatalog {
    client: OmdbClient,
    retry: RetryPolicy,
}

impl OmdbCatalog {
    /// Wrap a client using the default retry policy
    #[must_use]
    pub fn new(client: OmdbClient) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn to_request(query: &SearchQuery) -> SearchRequest {
    SearchRequest {
        term: query.term().to_string(),
        year: query.year(),
        kind: query.kind(),
        page: Some(query.page()),
    }
}

impl MovieCatalog for OmdbCatalog {
    fn search<'a>(
        &'a self,
        query: &'a SearchQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Movie>, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let request = to_request(query);

            let page = retry_with_predicate(
                &self.retry,
                || self.client.search(&request),
                OmdbError::is_transient,
            )
            .await
            .map_err(FetchError::from)?;

            tracing::debug!(
                term = query.term(),
                hits = page.hits.len(),
                total = page.total_results,
                "OMDb catalog answered"
            );

            Ok(page.hits.into_iter().map(Movie::from).collect())
        })
    }
}
