//! `movie-search` binary
//!
//! Runs each term through one `MovieSearchStore` and prints the resulting
//! IMDb ids, or the typed failure.

use anyhow::Context;
use clap::Parser;
use cinestate_movies::{
    mocks::MockMovieCatalog, MovieCatalog, MovieSearchConfig, MovieSearchEnvironment,
    MovieSearchStore, OmdbCatalog, SearchError, SearchQuery,
};
use cinestate_omdb::TitleKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Search OMDb for movies and print their IMDb ids.
#[derive(Parser, Debug)]
#[command(name = "movie-search", version)]
struct Args {
    /// TOML configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Use a built-in offline catalog instead of OMDb.
    #[arg(long)]
    mock: bool,

    /// Only return titles released in this year.
    #[arg(long)]
    year: Option<u16>,

    /// Only return this kind of title (movie, series, episode).
    #[arg(long, value_parser = parse_kind)]
    kind: Option<TitleKind>,

    /// Search terms, searched in order.
    #[arg(required = true)]
    terms: Vec<String>,
}

fn parse_kind(value: &str) -> Result<TitleKind, String> {
    TitleKind::parse(value).ok_or_else(|| format!("unknown kind '{value}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_search=info,cinestate_movies=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config =
        MovieSearchConfig::load(args.config.as_deref()).context("failed to load configuration")?;

    let catalog: Arc<dyn MovieCatalog> = if args.mock {
        tracing::info!("Using offline mock catalog");
        Arc::new(MockMovieCatalog::with_fixtures())
    } else {
        let client = config.omdb_client().context("cannot reach OMDb")?;
        tracing::info!(base_url = client.base_url(), "Using OMDb catalog");
        Arc::new(OmdbCatalog::new(client).with_retry_policy(config.retry.policy()))
    };

    let store =
        MovieSearchStore::from_config(MovieSearchEnvironment::with_system_clock(catalog), &config);

    for term in &args.terms {
        let query = match SearchQuery::new(term) {
            Ok(query) => query,
            Err(error) => {
                println!("{term:?}: {error}");
                continue;
            },
        };
        let query = query.filtered(args.year, args.kind);

        match store.search(query).await {
            Ok(summary) => {
                println!("{term}: {} result(s)", summary.count);
                for movie in store.get_movies().await {
                    println!("  {}  {} ({})", movie.imdb_id, movie.title, movie.year);
                }
            },
            Err(SearchError::NoResults { term }) => println!("{term}: no results"),
            Err(error) => println!("{term}: {error}"),
        }
    }

    store
        .shutdown(config.search_timeout())
        .await
        .context("searches still running at shutdown")?;

    Ok(())
}
