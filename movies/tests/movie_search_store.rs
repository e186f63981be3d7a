//! Integration tests for `MovieSearchStore`
//!
//! Drives the full stack (facade, runtime store, reducer, effects) against a
//! scripted catalog.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use cinestate_movies::mocks::MockMovieCatalog;
use cinestate_movies::{
    FetchError, Movie, MovieAction, MovieSearchEnvironment, MovieSearchStore, SearchError,
    SearchOutcome, SearchStatus,
};
use cinestate_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;

fn batman() -> Vec<Movie> {
    vec![
        Movie::new("tt0372784", "Batman Begins").with_year("2005"),
        Movie::new("tt0096895", "Batman").with_year("1989"),
    ]
}

fn store_with(catalog: &MockMovieCatalog) -> MovieSearchStore {
    MovieSearchStore::new(MovieSearchEnvironment::new(
        Arc::new(catalog.clone()),
        Arc::new(test_clock()),
    ))
}

async fn assert_aligned(store: &MovieSearchStore) {
    let movies = store.get_movies().await;
    let ids = store.movie_ids().await;
    assert_eq!(ids.len(), movies.len());
    for (id, movie) in ids.iter().zip(&movies) {
        assert_eq!(id, &movie.imdb_id);
    }
}

#[tokio::test]
async fn test_new_store_is_empty() {
    let store = store_with(&MockMovieCatalog::new());

    assert!(store.get_movies().await.is_empty());
    assert!(store.movie_ids().await.is_empty());
    assert_eq!(store.status().await, SearchStatus::Idle);
}

#[tokio::test]
async fn test_successful_search_replaces_movies() {
    let catalog = MockMovieCatalog::new().with_movies("batman", batman());
    let store = store_with(&catalog);

    let summary = store.search_movies("batman").await.unwrap();

    assert_eq!(summary.count, 2);
    assert_eq!(store.get_movies().await, batman());
    assert_eq!(store.movie_ids().await, vec!["tt0372784", "tt0096895"]);
    assert_aligned(&store).await;
}

#[tokio::test]
async fn test_search_does_not_append() {
    let catalog = MockMovieCatalog::with_fixtures();
    let store = store_with(&catalog);

    store.search_movies("batman").await.unwrap();
    store.search_movies("heat").await.unwrap();

    assert_eq!(store.movie_ids().await, vec!["tt0113277"]);
}

#[tokio::test]
async fn test_blank_query_never_reaches_catalog() {
    let catalog = MockMovieCatalog::with_fixtures();
    let store = store_with(&catalog);
    store.search_movies("batman").await.unwrap();
    let before = store.get_movies().await;

    for term in ["", "   ", "\t"] {
        let err = store.search_movies(term).await.unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)), "{term:?} -> {err:?}");
    }

    assert_eq!(catalog.call_count(), 1);
    assert_eq!(store.get_movies().await, before);
}

#[tokio::test]
async fn test_slower_older_response_is_discarded() {
    let catalog = MockMovieCatalog::new()
        .with_movies("a", vec![Movie::new("tt-a", "A")])
        .with_latency("a", Duration::from_millis(150))
        .with_movies("b", vec![Movie::new("tt-b", "B")])
        .with_latency("b", Duration::from_millis(10));
    let store = store_with(&catalog);

    let slow_store = store.clone();
    let slow = tokio::spawn(async move { slow_store.search_movies("a").await });

    // Let "a" be dispatched first.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fast = store.search_movies("b").await.unwrap();
    let slow = slow.await.expect("search task panicked");

    assert_eq!(fast.count, 1);
    assert_eq!(slow.unwrap_err(), SearchError::Superseded);
    assert_eq!(store.movie_ids().await, vec!["tt-b"]);
    assert_eq!(store.status().await, SearchStatus::Idle);
    assert_eq!(catalog.call_count(), 2);
}

#[tokio::test]
async fn test_stale_response_after_newer_one_settled_stays_discarded() {
    let catalog = MockMovieCatalog::new()
        .with_movies("a", vec![Movie::new("tt-a", "A")])
        .with_latency("a", Duration::from_millis(100))
        .with_movies("b", vec![Movie::new("tt-b", "B")]);
    let store = store_with(&catalog);
    let mut actions = store.subscribe();

    let slow_store = store.clone();
    let slow = tokio::spawn(async move { slow_store.search_movies("a").await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.search_movies("b").await.unwrap();
    store.reset_movies().await.unwrap();

    assert_eq!(slow.await.unwrap(), Err(SearchError::Superseded));
    assert!(store.get_movies().await.is_empty());

    let mut settled = Vec::new();
    while let Ok(action) = actions.try_recv() {
        if let MovieAction::SearchSettled { outcome, .. } = action {
            settled.push(outcome);
        }
    }
    assert_eq!(
        settled,
        vec![SearchOutcome::Applied { count: 1 }, SearchOutcome::Superseded]
    );
}

#[tokio::test]
async fn test_failure_preserves_movies() {
    let catalog = MockMovieCatalog::new()
        .with_movies("batman", batman())
        .with_failure("x", FetchError::Unreachable("connection refused".into()));
    let store = store_with(&catalog);
    store.search_movies("batman").await.unwrap();

    let err = store.search_movies("x").await.unwrap_err();

    assert_eq!(
        err,
        SearchError::Fetch(FetchError::Unreachable("connection refused".into()))
    );
    assert_eq!(store.get_movies().await, batman());
}

#[tokio::test]
async fn test_no_results_is_distinct_and_preserves_movies() {
    let catalog = MockMovieCatalog::new().with_movies("batman", batman());
    let store = store_with(&catalog);
    store.search_movies("batman").await.unwrap();

    let err = store.search_movies("nothing at all").await.unwrap_err();

    assert_eq!(
        err,
        SearchError::NoResults {
            term: "nothing at all".into()
        }
    );
    assert_eq!(store.get_movies().await, batman());
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    let catalog = MockMovieCatalog::with_fixtures();
    let store = store_with(&catalog);
    store.search_movies("alien").await.unwrap();
    assert!(store.last_updated().await.is_some());

    store.reset_movies().await.unwrap();
    let once = (store.get_movies().await, store.status().await, store.last_updated().await);
    store.reset_movies().await.unwrap();
    let twice = (store.get_movies().await, store.status().await, store.last_updated().await);

    assert!(once.0.is_empty());
    assert_eq!(once.2, None);
    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_duplicate_ids_are_collapsed() {
    let catalog = MockMovieCatalog::new().with_movies(
        "dup",
        vec![
            Movie::new("tt1", "One"),
            Movie::new("tt2", "Two"),
            Movie::new("tt1", "One again"),
        ],
    );
    let store = store_with(&catalog);

    let summary = store.search_movies("dup").await.unwrap();

    assert_eq!(summary.count, 2);
    assert_eq!(store.movie_ids().await, vec!["tt1", "tt2"]);
    assert_eq!(store.get_movies().await[0].title, "One");
}

#[tokio::test]
async fn test_status_is_searching_while_in_flight() {
    let catalog = MockMovieCatalog::with_fixtures().with_latency("batman", Duration::from_millis(80));
    let store = store_with(&catalog);

    let background = store.clone();
    let search = tokio::spawn(async move { background.search_movies("batman").await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(matches!(store.status().await, SearchStatus::Searching { .. }));

    search.await.unwrap().unwrap();
    assert_eq!(store.status().await, SearchStatus::Idle);
}

/// A burst of type-ahead searches overflows the action broadcast. Every caller
/// must still learn its own outcome instead of waiting out the timeout.
#[tokio::test]
async fn test_burst_of_searches_all_settle() {
    let mut catalog = MockMovieCatalog::new();
    for i in 0..24u64 {
        let term = format!("t{i}");
        catalog = catalog
            .with_movies(&term, vec![Movie::new(format!("tt{i}"), term.clone())])
            .with_latency(&term, Duration::from_millis(30 - i));
    }
    let store = MovieSearchStore::with_config(
        MovieSearchEnvironment::new(Arc::new(catalog), Arc::new(test_clock())),
        cinestate_runtime::StoreConfig::default().with_broadcast_capacity(2),
    )
    .with_search_timeout(Duration::from_secs(2));

    let searches: Vec<_> = (0..24)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.search_movies(&format!("t{i}")).await })
        })
        .collect();

    let mut applied = 0;
    for search in searches {
        match search.await.expect("search task panicked") {
            Ok(summary) => {
                assert_eq!(summary.count, 1);
                applied += 1;
            },
            Err(SearchError::Superseded) => {},
            Err(other) => panic!("search settled with {other:?}"),
        }
    }

    assert!(applied >= 1);
    assert_eq!(store.movie_ids().await.len(), 1);
    assert_eq!(store.status().await, SearchStatus::Idle);
}
