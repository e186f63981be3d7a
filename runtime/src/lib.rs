//! # Cinestate Runtime
//!
//! Executes reducers from `cinestate-core`.
//!
//! A [`Store`] owns one feature's state. [`Store::send`] runs the reducer
//! under a write lock and spawns whatever effects come back; actions those
//! effects yield are broadcast and then reduced in turn. [`retry`] holds the
//! backoff helpers used by network-backed environments.
//!
//! ```ignore
//! use cinestate_runtime::Store;
//!
//! let store = Store::new(MovieSearchState::default(), MovieSearchReducer, env);
//! store.send(MovieAction::ResetMovies).await?;
//! let shown = store.state(|s| s.movies.len()).await;
//! ```

pub mod config;
pub mod error;
mod handle;
/// Exponential backoff for fallible async operations
pub mod retry;
pub mod store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use handle::EffectHandle;
pub use store::Store;
