//! Injected dependencies for the movie search reducer

use crate::error::FetchError;
use crate::types::{Movie, SearchQuery};
use cinestate_core::environment::{Clock, SystemClock};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Source of movie search results
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so the reducer can hold an
/// `Arc<dyn MovieCatalog>` and move it into effects.
pub trait MovieCatalog: Send + Sync {
    /// Search for movies matching `query`
    ///
    /// An empty list means the catalog found nothing. Order is significant
    /// and preserved by the store.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the catalog cannot produce a list.
    fn search<'a>(
        &'a self,
        query: &'a SearchQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Movie>, FetchError>> + Send + 'a>>;
}

/// Environment for [`crate::reducer::MovieSearchReducer`]
#[derive(Clone)]
pub struct MovieSearchEnvironment {
    /// Where searches go
    pub catalog: Arc<dyn MovieCatalog>,
    /// Stamps `last_updated`
    pub clock: Arc<dyn Clock>,
}

impl MovieSearchEnvironment {
    /// Create an environment from a catalog and a clock
    #[must_use]
    pub fn new(catalog: Arc<dyn MovieCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, clock }
    }

    /// Use the wall clock
    #[must_use]
    pub fn with_system_clock(catalog: Arc<dyn MovieCatalog>) -> Self {
        Self::new(catalog, Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for MovieSearchEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieSearchEnvironment").finish_non_exhaustive()
    }
}
