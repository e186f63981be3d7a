//! # OMDb API Client
//!
//! Small client for the title search endpoint of the
//! [OMDb API](https://www.omdbapi.com).
//!
//! ## Example
//!
//! ```no_run
//! use cinestate_omdb::{OmdbClient, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create client from OMDB_API_KEY environment variable
//!     let client = OmdbClient::from_env()?;
//!
//!     let page = client.search(&SearchRequest::new("batman")).await?;
//!     for hit in page.hits {
//!         println!("{} ({}) {}", hit.title, hit.year, hit.imdb_id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, OmdbClient};
pub use error::OmdbError;
pub use types::{SearchHit, SearchPage, SearchRequest, TitleKind};
