//! hotel-search: runs the stock hotel queries against a configured engine
//!
//! This is the main entry point for the application.

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use hotel_search_rs::{
    config, Distance, GeoPoint, HighlightSpec, HotelDocument, Predicate, SearchClient, Sort,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Runs the stock hotel queries against a search engine
#[derive(Parser, Debug)]
#[command(name = "hotel-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = ENV_HELP)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Query to run
    #[arg(value_enum)]
    query: Demo,
}

/// Stock queries
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Demo {
    /// name matches 希尔顿, city in 北京/上海, price 1000-2000, by price desc
    MatchPage,
    /// price 0-150, by price desc
    Range,
    /// within 2km of (31.21, 121.5)
    Distance,
    /// inside (31.1, 121.5) - (30.5, 121.7)
    #[value(name = "box")]
    GeoBox,
    /// all matches 如家, name highlighted with <high> tags
    Highlight,
    /// every hotel, by price desc, 10 per page
    Scroll,
    /// each of the above in turn
    All,
}

impl Demo {
    fn selected(self) -> Vec<Demo> {
        match self {
            Self::All => vec![
                Self::MatchPage,
                Self::Range,
                Self::Distance,
                Self::GeoBox,
                Self::Highlight,
                Self::Scroll,
            ],
            one => vec![one],
        }
    }
}

const ENV_HELP: &str = "ENVIRONMENT VARIABLES:
    HOTEL_SEARCH_SETTINGS_PATH  Path to settings.yml
    HOTEL_SEARCH_URL            Engine base URL
    HOTEL_SEARCH_INDEX          Index name
    HOTEL_SEARCH_USERNAME       Basic auth user
    HOTEL_SEARCH_PASSWORD       Basic auth password
    HOTEL_SEARCH_TIMEOUT        Per-request timeout in seconds
    RUST_LOG                    Log filter (default: info)";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting hotel-search v{}", hotel_search_rs::VERSION);
    let settings = config::load(cli.config.as_deref())?;
    let client = SearchClient::new(&settings)?;

    for demo in cli.query.selected() {
        info!("Running {:?}", demo);
        run(&client, demo).await?;
    }

    client.close();
    Ok(())
}

async fn run(client: &SearchClient, demo: Demo) -> Result<()> {
    match demo {
        Demo::MatchPage => {
            let query = client
                .query_builder()
                .filter(Predicate::matches("name", "希尔顿"))
                .filter(Predicate::one_of("city", ["北京", "上海"]))
                .filter(Predicate::between("price", 1000.0, 2000.0))
                .page(0)
                .size(10)
                .sort(Sort::desc("price"))
                .build()?;
            print_documents(client.search(&query).await?.documents())?;
        }
        Demo::Range => {
            let query = client
                .query_builder()
                .filter(Predicate::between("price", 0.0, 150.0))
                .page(0)
                .size(10)
                .sort(Sort::desc("price"))
                .build()?;
            print_documents(client.search(&query).await?.documents())?;
        }
        Demo::Distance => {
            let query = client
                .query_builder()
                .filter(Predicate::within(
                    "location",
                    GeoPoint::new(31.21, 121.5),
                    "2km".parse::<Distance>()?,
                ))
                .build()?;
            print_documents(client.search(&query).await?.documents())?;
        }
        Demo::GeoBox => {
            let query = client
                .query_builder()
                .filter(Predicate::bounded_by(
                    "location",
                    GeoPoint::new(31.1, 121.5),
                    GeoPoint::new(30.5, 121.7),
                ))
                .build()?;
            print_documents(client.search(&query).await?.documents())?;
        }
        Demo::Highlight => {
            let query = client
                .query_builder()
                .filter(Predicate::matches("all", "如家"))
                .highlight(
                    HighlightSpec::new(["name"])
                        .with_tags("<high>", "</high>")
                        .with_require_field_match(false),
                )
                .build()?;
            let page = client.search(&query).await?;
            for (i, hit) in page.hits.iter().enumerate() {
                println!("{}>>>highlight>>{}", i + 1, serde_json::to_string(hit)?);
            }
        }
        Demo::Scroll => {
            let query = client
                .scroll_query_builder()
                .size(10)
                .sort(Sort::desc("price"))
                .build()?;
            let mut scroll = client.scroll(&query)?;
            let mut n = 0;
            while let Some(page) = scroll.next_page().await? {
                for doc in page.documents() {
                    n += 1;
                    println!("{}---{}", n, serde_json::to_string(doc)?);
                }
            }
            info!("Scrolled through {} hotels", n);
        }
        Demo::All => bail!("'all' runs each query separately"),
    }
    Ok(())
}

fn print_documents<'a>(docs: impl Iterator<Item = &'a HotelDocument>) -> Result<()> {
    for (i, doc) in docs.enumerate() {
        println!("{}---{}", i + 1, serde_json::to_string(doc)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_and_config() {
        let cli = Cli::try_parse_from(["hotel-search", "-c", "conf/settings.yml", "box"]).unwrap();
        assert_eq!(cli.query, Demo::GeoBox);
        assert_eq!(cli.config, Some(PathBuf::from("conf/settings.yml")));

        let cli = Cli::try_parse_from(["hotel-search", "match-page"]).unwrap();
        assert_eq!(cli.query.selected(), vec![Demo::MatchPage]);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_all_expands_to_every_query() {
        let cli = Cli::try_parse_from(["hotel-search", "all"]).unwrap();
        let selected = cli.query.selected();
        assert_eq!(selected.len(), 6);
        assert!(!selected.contains(&Demo::All));
    }

    #[test]
    fn test_unknown_query_rejected() {
        assert!(Cli::try_parse_from(["hotel-search", "nearby"]).is_err());
        assert!(Cli::try_parse_from(["hotel-search"]).is_err());
    }
}
