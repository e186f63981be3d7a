//! Request and response types for the OMDb search endpoint

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of title OMDb can filter on (`type` query parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleKind {
    /// Feature films
    Movie,
    /// TV series
    Series,
    /// Single episodes
    Episode,
}

impl TitleKind {
    /// Query-string value for this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
            Self::Episode => "episode",
        }
    }

    /// Parse a kind from its query-string value, case-insensitively
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "movie" => Some(Self::Movie),
            "series" => Some(Self::Series),
            "episode" => Some(Self::Episode),
            _ => None,
        }
    }
}

impl fmt::Display for TitleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one `?s=` search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Title search term (`s`)
    pub term: String,
    /// Release year filter (`y`)
    pub year: Option<u16>,
    /// Title kind filter (`type`)
    pub kind: Option<TitleKind>,
    /// Result page, 1-based (`page`)
    pub page: Option<u32>,
}

impl SearchRequest {
    /// Search for `term` with no filters
    #[must_use]
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            year: None,
            kind: None,
            page: None,
        }
    }

    /// Query-string pairs, excluding the API key
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("s", self.term.clone())];
        if let Some(year) = self.year {
            pairs.push(("y", year.to_string()));
        }
        if let Some(kind) = self.kind {
            pairs.push(("type", kind.as_str().to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        pairs
    }
}

/// One entry of the `Search` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Display title
    #[serde(rename = "Title")]
    pub title: String,
    /// Release year or year range (e.g. `"2005"`, `"2008-2013"`)
    #[serde(rename = "Year", default)]
    pub year: String,
    /// IMDb identifier, unique per title
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    /// `movie`, `series`, `episode` or `game`
    #[serde(rename = "Type", default)]
    pub kind: String,
    /// Poster URL or `"N/A"`
    #[serde(rename = "Poster", default)]
    pub poster: String,
    /// Any field OMDb adds that we do not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A successful page of search results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    /// Hits in upstream order
    pub hits: Vec<SearchHit>,
    /// Total number of matches across all pages
    pub total_results: u64,
}

impl SearchPage {
    /// Page with no hits
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Raw envelope as sent on the wire
///
/// OMDb answers HTTP 200 for logical failures and signals them with
/// `"Response": "False"` plus an `Error` message.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchEnvelope {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Search", default)]
    pub search: Vec<SearchHit>,
    #[serde(rename = "totalResults", default)]
    pub total_results: Option<String>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}
