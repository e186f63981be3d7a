//! In-memory movie catalog for tests and offline demos

use crate::environment::MovieCatalog;
use crate::error::FetchError;
use crate::types::{Movie, SearchQuery};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, Result<Vec<Movie>, FetchError>>,
    latencies: HashMap<String, Duration>,
    calls: Vec<SearchQuery>,
}

/// Scripted catalog
///
/// Responses and latencies are keyed by the trimmed search term. Unknown
/// terms answer with an empty list. Every call is recorded, so tests can
/// assert that a rejected query never reached the catalog.
///
/// Clones share the same script and call log.
///
/// # Example
///
/// ```
/// use cinestate_movies::{mocks::MockMovieCatalog, Movie};
/// use std::time::Duration;
///
/// let catalog = MockMovieCatalog::new()
///     .with_movies("batman", vec![Movie::new("tt0372784", "Batman Begins")])
///     .with_latency("batman", Duration::from_millis(50));
///
/// assert_eq!(catalog.call_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockMovieCatalog {
    script: Arc<Mutex<Script>>,
}

impl MockMovieCatalog {
    /// Create a catalog that knows no titles
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog seeded with a few well-known titles
    #[must_use]
    pub fn with_fixtures() -> Self {
        Self::new()
            .with_movies(
                "batman",
                vec![
                    Movie::new("tt0372784", "Batman Begins").with_year("2005"),
                    Movie::new("tt0096895", "Batman").with_year("1989"),
                ],
            )
            .with_movies(
                "alien",
                vec![
                    Movie::new("tt0078748", "Alien").with_year("1979"),
                    Movie::new("tt0090605", "Aliens").with_year("1986"),
                ],
            )
            .with_movies(
                "heat",
                vec![Movie::new("tt0113277", "Heat").with_year("1995")],
            )
    }

    /// Answer `term` with `movies`
    #[must_use]
    pub fn with_movies(self, term: &str, movies: Vec<Movie>) -> Self {
        self.set_response(term, Ok(movies));
        self
    }

    /// Answer `term` with `error`
    #[must_use]
    pub fn with_failure(self, term: &str, error: FetchError) -> Self {
        self.set_response(term, Err(error));
        self
    }

    /// Delay answers for `term`
    #[must_use]
    pub fn with_latency(self, term: &str, latency: Duration) -> Self {
        self.lock().latencies.insert(term.trim().to_string(), latency);
        self
    }

    /// Replace the scripted answer for `term`
    pub fn set_response(&self, term: &str, response: Result<Vec<Movie>, FetchError>) {
        self.lock().responses.insert(term.trim().to_string(), response);
    }

    /// Every query received, in call order
    #[must_use]
    pub fn calls(&self) -> Vec<SearchQuery> {
        self.lock().calls.clone()
    }

    /// Number of queries received
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MovieCatalog for MockMovieCatalog {
    fn search<'a>(
        &'a self,
        query: &'a SearchQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Movie>, FetchError>> + Send + 'a>> {
        let (response, latency) = {
            let mut script = self.lock();
            script.calls.push(query.clone());
            (
                script
                    .responses
                    .get(query.term())
                    .cloned()
                    .unwrap_or_else(|| Ok(Vec::new())),
                script.latencies.get(query.term()).copied(),
            )
        };

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            response
        })
    }
}
