//! `MovieSearchStore`: the public face of movie search
//!
//! Wraps a runtime [`Store`] and exposes a small typed API. Every search is
//! tagged with a fresh [`RequestId`]; the caller waits for the matching
//! `SearchSettled` notification and receives its outcome as a `Result`.

use crate::config::MovieSearchConfig;
use crate::environment::MovieSearchEnvironment;
use crate::error::SearchError;
use crate::reducer::MovieSearchReducer;
use crate::types::{
    Movie, MovieAction, MovieSearchState, RequestId, SearchOutcome, SearchQuery, SearchStatus,
    SearchSummary,
};
use chrono::{DateTime, Utc};
use cinestate_runtime::{Store, StoreConfig, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// How long `search` waits for settlement unless configured otherwise
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(35);

type InnerStore = Store<MovieSearchState, MovieAction, MovieSearchEnvironment, MovieSearchReducer>;

/// Movie search state container
///
/// Create one per application and pass it to whoever needs it. Clones share
/// the same state and request counter.
///
/// # Example
///
/// ```
/// use cinestate_movies::{mocks::MockMovieCatalog, MovieSearchEnvironment, MovieSearchStore};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let env = MovieSearchEnvironment::with_system_clock(Arc::new(MockMovieCatalog::with_fixtures()));
/// let store = MovieSearchStore::new(env);
///
/// store.search_movies("batman").await?;
/// assert_eq!(store.movie_ids().await, vec!["tt0372784", "tt0096895"]);
/// # Ok::<_, cinestate_movies::SearchError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct MovieSearchStore {
    store: InnerStore,
    next_request_id: Arc<AtomicU64>,
    search_timeout: Duration,
}

impl MovieSearchStore {
    /// Create a store with default runtime settings
    #[must_use]
    pub fn new(environment: MovieSearchEnvironment) -> Self {
        Self::with_config(environment, StoreConfig::default())
    }

    /// Create a store with custom runtime settings
    #[must_use]
    pub fn with_config(environment: MovieSearchEnvironment, config: StoreConfig) -> Self {
        Self {
            store: Store::with_config(
                MovieSearchState::default(),
                MovieSearchReducer::new(),
                environment,
                config,
            ),
            next_request_id: Arc::new(AtomicU64::new(1)),
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    /// Create a store from loaded configuration
    #[must_use]
    pub fn from_config(environment: MovieSearchEnvironment, config: &MovieSearchConfig) -> Self {
        Self::with_config(environment, config.store_config())
            .with_search_timeout(config.search_timeout())
    }

    /// Override how long `search` waits for settlement
    #[must_use]
    pub const fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Current movies, in catalog order
    pub async fn get_movies(&self) -> Vec<Movie> {
        self.store.state(|s| s.movies.clone()).await
    }

    /// Identifiers of the current movies, aligned with [`get_movies`](Self::get_movies)
    pub async fn movie_ids(&self) -> Vec<String> {
        self.store.state(MovieSearchState::movie_ids).await
    }

    /// Search lifecycle
    pub async fn status(&self) -> SearchStatus {
        self.store.state(|s| s.status).await
    }

    /// When the movie list was last replaced by a search
    ///
    /// `None` before the first successful search and after
    /// [`reset_movies`](Self::reset_movies).
    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.store.state(|s| s.last_updated).await
    }

    /// Clear the movie list
    ///
    /// Idempotent. Does not cancel searches in flight: a later response to
    /// the latest search still populates the list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    #[tracing::instrument(skip(self))]
    pub async fn reset_movies(&self) -> Result<(), StoreError> {
        self.store.send(MovieAction::ResetMovies).await?;
        Ok(())
    }

    /// Validate `term` and search for it
    ///
    /// # Errors
    ///
    /// See [`search`](Self::search). Blank terms fail with
    /// [`SearchError::Validation`] without contacting the catalog.
    pub async fn search_movies(&self, term: &str) -> Result<SearchSummary, SearchError> {
        let query = SearchQuery::new(term).inspect_err(|error| {
            tracing::debug!(error = %error, "Rejected search query");
        })?;
        self.search(query).await
    }

    /// Search with a validated query and wait for it to settle
    ///
    /// On success the movie list has been replaced by the deduplicated results.
    /// On any error the movie list is exactly what it was before.
    ///
    /// # Errors
    ///
    /// - [`SearchError::NoResults`]: the catalog found nothing
    /// - [`SearchError::Fetch`]: the catalog failed
    /// - [`SearchError::Superseded`]: a newer search was issued before this one resolved
    /// - [`SearchError::Store`]: the store is shutting down, or settlement did not
    ///   happen within the search timeout
    #[tracing::instrument(skip(self, query), fields(term = query.term()))]
    pub async fn search(&self, query: SearchQuery) -> Result<SearchSummary, SearchError> {
        let request_id = RequestId(self.next_request_id.fetch_add(1, Ordering::Relaxed));
        let term = query.term().to_string();

        tracing::debug!(%request_id, "Dispatching search");

        // Subscribe before sending so the settlement cannot be broadcast unseen.
        let mut actions = self.store.subscribe_actions();
        self.store
            .send(MovieAction::SearchMovies { request_id, query })
            .await?;

        let outcome = tokio::time::timeout(
            self.search_timeout,
            self.settlement_of(request_id, &mut actions),
        )
        .await
        .unwrap_or(Err(StoreError::Timeout))
        .inspect_err(|error| {
            tracing::warn!(%request_id, error = %error, "Search did not settle");
        })?;

        match outcome {
            SearchOutcome::Applied { count } => Ok(SearchSummary { request_id, count }),
            SearchOutcome::NoResults => Err(SearchError::NoResults { term }),
            SearchOutcome::Failed(error) => Err(SearchError::Fetch(error)),
            SearchOutcome::Superseded => Err(SearchError::Superseded),
        }
    }

    /// Wait for `request_id` to settle
    ///
    /// The broadcast drops the oldest actions for a receiver that falls
    /// behind, so after a lag the outcome is looked up in state instead.
    /// The reducer records it there before `SearchSettled` is broadcast.
    async fn settlement_of(
        &self,
        request_id: RequestId,
        actions: &mut broadcast::Receiver<MovieAction>,
    ) -> Result<SearchOutcome, StoreError> {
        loop {
            match actions.recv().await {
                Ok(MovieAction::SearchSettled { request_id: id, outcome }) if id == request_id => {
                    return Ok(outcome);
                },
                Ok(_) => {},
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(%request_id, skipped, "Settlement observer lagged");
                    if let Some(outcome) = self.store.state(|s| s.settlement(request_id)).await {
                        return Ok(outcome);
                    }
                },
                Err(RecvError::Closed) => return Err(StoreError::ChannelClosed),
            }
        }
    }

    /// Observe every action produced by the store's effects
    ///
    /// Includes `MoviesFetched` and `SearchSettled` for every search, stale
    /// ones included.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MovieAction> {
        self.store.subscribe_actions()
    }

    /// Stop accepting actions and wait for searches in flight
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if searches are still running
    /// after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}

impl std::fmt::Debug for MovieSearchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieSearchStore")
            .field("search_timeout", &self.search_timeout)
            .finish_non_exhaustive()
    }
}
