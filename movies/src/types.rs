//! Domain types for movie search: state, actions, and values

use crate::error::{FetchError, SearchError};
use chrono::{DateTime, Utc};
use cinestate_omdb::{SearchHit, TitleKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ============================================================================
// Values
// ============================================================================

/// One search result
///
/// Only `imdb_id` carries meaning for the store. The remaining fields are
/// passed through to consumers untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// IMDb identifier, unique among the movies a store holds
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    /// Display title
    #[serde(rename = "Title", default)]
    pub title: String,
    /// Release year or range
    #[serde(rename = "Year", default)]
    pub year: String,
    /// Poster URL or `"N/A"`
    #[serde(rename = "Poster", default)]
    pub poster: String,
    /// `movie`, `series`, `episode`, ...
    #[serde(rename = "Type", default)]
    pub kind: String,
    /// Fields we do not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Movie {
    /// Create a movie with an id and title, leaving other fields empty
    #[must_use]
    pub fn new(imdb_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            imdb_id: imdb_id.into(),
            title: title.into(),
            year: String::new(),
            poster: String::new(),
            kind: String::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Set the release year
    #[must_use]
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = year.into();
        self
    }
}

impl From<SearchHit> for Movie {
    fn from(hit: SearchHit) -> Self {
        Self {
            imdb_id: hit.imdb_id,
            title: hit.title,
            year: hit.year,
            poster: hit.poster,
            kind: hit.kind,
            extra: hit.extra,
        }
    }
}

/// A validated search query
///
/// Construction trims the term and rejects blank input, so a `SearchQuery`
/// that exists is always safe to hand to a catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    term: String,
    year: Option<u16>,
    kind: Option<TitleKind>,
    page: Option<u32>,
}

impl SearchQuery {
    /// Validate a free-text search term
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Validation`] if the term is empty or whitespace-only.
    pub fn new(term: &str) -> Result<Self, SearchError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(SearchError::Validation(
                "search term must not be empty".to_string(),
            ));
        }

        Ok(Self {
            term: term.to_string(),
            year: None,
            kind: None,
            page: None,
        })
    }

    /// Restrict results to a release year
    #[must_use]
    pub const fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    /// Restrict results to a title kind
    #[must_use]
    pub const fn with_kind(mut self, kind: TitleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Apply whichever of `year` and `kind` are given, keeping the rest
    #[must_use]
    pub fn filtered(mut self, year: Option<u16>, kind: Option<TitleKind>) -> Self {
        self.year = year.or(self.year);
        self.kind = kind.or(self.kind);
        self
    }

    /// Request a specific result page (1-based)
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Validation`] for page 0.
    pub fn with_page(mut self, page: u32) -> Result<Self, SearchError> {
        if page == 0 {
            return Err(SearchError::Validation(
                "page numbers start at 1".to_string(),
            ));
        }
        self.page = Some(page);
        Ok(self)
    }

    /// The trimmed search term
    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Year filter, if any
    #[must_use]
    pub const fn year(&self) -> Option<u16> {
        self.year
    }

    /// Kind filter, if any
    #[must_use]
    pub const fn kind(&self) -> Option<TitleKind> {
        self.kind
    }

    /// Requested page, defaulting to 1
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }
}

/// Correlates a search with its response
///
/// Allocated in increasing order by a store, so a larger id is always the
/// more recent request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// State
// ============================================================================

/// Whether a search is outstanding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchStatus {
    /// No search in flight
    #[default]
    Idle,
    /// At least one search in flight; only `latest` may change the movie list
    Searching {
        /// The most recently issued request
        latest: RequestId,
    },
}

impl SearchStatus {
    /// The request whose response will be applied, if any
    #[must_use]
    pub const fn latest(self) -> Option<RequestId> {
        match self {
            Self::Idle => None,
            Self::Searching { latest } => Some(latest),
        }
    }
}

/// Settlements kept in [`MovieSearchState`] for waiters that missed the broadcast
pub const RECENT_SETTLEMENTS: usize = 256;

/// State owned by the movie search store
#[derive(Clone, Debug, Default)]
pub struct MovieSearchState {
    /// Results of the most recent successful search, in catalog order
    pub movies: Vec<Movie>,
    /// Search lifecycle
    pub status: SearchStatus,
    /// When `movies` was last replaced by a search; cleared by a reset
    pub last_updated: Option<DateTime<Utc>>,
    /// Outcomes of the latest [`RECENT_SETTLEMENTS`] searches, oldest first.
    /// Each is recorded before its `SearchSettled` is broadcast.
    pub settlements: VecDeque<(RequestId, SearchOutcome)>,
}

impl MovieSearchState {
    /// Remember how `request_id` settled, evicting the oldest entry when full
    pub fn record_settlement(&mut self, request_id: RequestId, outcome: SearchOutcome) {
        if self.settlements.len() == RECENT_SETTLEMENTS {
            self.settlements.pop_front();
        }
        self.settlements.push_back((request_id, outcome));
    }

    /// Outcome of `request_id`, if it settled recently
    #[must_use]
    pub fn settlement(&self, request_id: RequestId) -> Option<SearchOutcome> {
        self.settlements
            .iter()
            .rev()
            .find(|(id, _)| *id == request_id)
            .map(|(_, outcome)| outcome.clone())
    }

    /// Identifiers of the held movies, positionally aligned with `movies`
    ///
    /// Recomputed on every call.
    #[must_use]
    pub fn movie_ids(&self) -> Vec<String> {
        self.movies.iter().map(|m| m.imdb_id.clone()).collect()
    }
}

// ============================================================================
// Actions
// ============================================================================

/// How a search ended, as seen by the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Movies were replaced with `count` results
    Applied {
        /// Number of movies now held
        count: usize,
    },
    /// The catalog found nothing; movies untouched
    NoResults,
    /// The catalog failed; movies untouched
    Failed(FetchError),
    /// A newer search was issued first; response discarded
    Superseded,
}

/// Actions for the movie search reducer
#[derive(Clone, Debug, PartialEq)]
pub enum MovieAction {
    // Commands
    /// Clear the movie list
    ResetMovies,
    /// Start a search
    SearchMovies {
        /// Correlation id allocated by the store
        request_id: RequestId,
        /// Validated query
        query: SearchQuery,
    },

    // Effect results
    /// Catalog answered
    MoviesFetched {
        /// Request this response belongs to
        request_id: RequestId,
        /// Movies in catalog order, or the failure
        result: Result<Vec<Movie>, FetchError>,
    },

    // Notifications
    /// A search has been fully processed; state already reflects it
    SearchSettled {
        /// Request that settled
        request_id: RequestId,
        /// What happened to it
        outcome: SearchOutcome,
    },
}

/// Successful search result reported to the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchSummary {
    /// Request that produced the current movie list
    pub request_id: RequestId,
    /// Number of movies now held
    pub count: usize,
}
