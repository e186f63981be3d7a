//! Reducer for movie search
//!
//! All state transitions live here. The only side effect is the catalog call
//! issued for `SearchMovies`; its response comes back as `MoviesFetched` and
//! is applied only if it belongs to the most recent request.

use crate::environment::MovieSearchEnvironment;
use crate::error::FetchError;
use crate::types::{Movie, MovieAction, MovieSearchState, RequestId, SearchOutcome, SearchStatus};
use cinestate_core::{async_effect, effect::Effect, reducer::Reducer, smallvec, SmallVec};
use std::collections::HashSet;
use std::sync::Arc;

/// Reducer for [`MovieSearchState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct MovieSearchReducer;

impl MovieSearchReducer {
    /// Create a new movie search reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Apply a catalog response and decide how the search settles
    fn apply_fetched(
        state: &mut MovieSearchState,
        request_id: RequestId,
        result: Result<Vec<Movie>, FetchError>,
        env: &MovieSearchEnvironment,
    ) -> SearchOutcome {
        if state.status.latest() != Some(request_id) {
            tracing::warn!(
                %request_id,
                latest = ?state.status.latest(),
                "Discarding stale search response"
            );
            metrics::counter!("movies.search.stale_discarded").increment(1);
            return SearchOutcome::Superseded;
        }

        state.status = SearchStatus::Idle;

        match result {
            Ok(movies) if movies.is_empty() => {
                tracing::debug!(%request_id, "Search returned no results");
                SearchOutcome::NoResults
            },
            Ok(movies) => {
                let movies = dedupe_by_imdb_id(movies);
                let count = movies.len();
                state.movies = movies;
                state.last_updated = Some(env.clock.now());
                tracing::debug!(%request_id, count, "Movies replaced");
                SearchOutcome::Applied { count }
            },
            Err(error) => {
                tracing::warn!(%request_id, error = %error, "Search failed");
                metrics::counter!("movies.search.failed").increment(1);
                SearchOutcome::Failed(error)
            },
        }
    }
}

/// Drop repeated `imdb_id`s, keeping the first occurrence and catalog order
#[must_use]
pub fn dedupe_by_imdb_id(movies: Vec<Movie>) -> Vec<Movie> {
    let mut seen = HashSet::with_capacity(movies.len());
    movies
        .into_iter()
        .filter(|movie| seen.insert(movie.imdb_id.clone()))
        .collect()
}

impl Reducer for MovieSearchReducer {
    type State = MovieSearchState;
    type Action = MovieAction;
    type Environment = MovieSearchEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            MovieAction::ResetMovies => {
                state.movies.clear();
                state.last_updated = None;
                tracing::debug!("Movies reset");
                smallvec![Effect::None]
            },

            MovieAction::SearchMovies { request_id, query } => {
                state.status = SearchStatus::Searching { latest: request_id };
                metrics::counter!("movies.search.issued").increment(1);
                tracing::debug!(%request_id, term = query.term(), "Search issued");

                let catalog = Arc::clone(&env.catalog);
                smallvec![async_effect! {
                    let result = catalog.search(&query).await;
                    Some(MovieAction::MoviesFetched { request_id, result })
                }]
            },

            MovieAction::MoviesFetched { request_id, result } => {
                let outcome = Self::apply_fetched(state, request_id, result, env);
                state.record_settlement(request_id, outcome.clone());

                // Settlement goes through an effect so it is broadcast after
                // this state change is visible.
                smallvec![async_effect! {
                    Some(MovieAction::SearchSettled { request_id, outcome })
                }]
            },

            MovieAction::SearchSettled { .. } => smallvec![Effect::None],
        }
    }
}
