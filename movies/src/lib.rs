//! # Cinestate Movies
//!
//! A movie search state container built on the cinestate runtime.
//!
//! The store holds the results of the most recent successful search and
//! exposes a handful of operations:
//!
//! - [`MovieSearchStore::get_movies`] / [`MovieSearchStore::movie_ids`]: read views
//! - [`MovieSearchStore::reset_movies`]: clear the list
//! - [`MovieSearchStore::search_movies`]: query a [`MovieCatalog`] and replace the list
//!
//! Overlapping searches are resolved in favour of the most recently issued
//! one. Slower, older responses are discarded and their callers receive
//! [`SearchError::Superseded`]. Failures and empty results never clear the
//! list.
//!
//! ## Example
//!
//! ```no_run
//! use cinestate_movies::{MovieSearchEnvironment, MovieSearchStore, OmdbCatalog};
//! use cinestate_omdb::OmdbClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = OmdbCatalog::new(OmdbClient::from_env()?);
//! let store = MovieSearchStore::new(MovieSearchEnvironment::with_system_clock(Arc::new(catalog)));
//!
//! let summary = store.search_movies("batman").await?;
//! println!("{} movies: {:?}", summary.count, store.movie_ids().await);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod environment;
pub mod error;
pub mod mocks;
pub mod reducer;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use catalog::OmdbCatalog;
pub use config::{ConfigError, MovieSearchConfig};
pub use environment::{MovieCatalog, MovieSearchEnvironment};
pub use error::{FetchError, SearchError};
pub use reducer::MovieSearchReducer;
pub use store::MovieSearchStore;
pub use types::{
    Movie, MovieAction, MovieSearchState, RequestId, SearchOutcome, SearchQuery, SearchStatus,
    SearchSummary,
};
