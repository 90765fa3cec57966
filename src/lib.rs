//! hotel-search-rs: a typed query client for a hotel index
//!
//! Builds validated queries (full-text, exact, set, range, geo radius, geo box),
//! sends them to an Elasticsearch-compatible engine over HTTP, and maps the
//! hits back into [`HotelDocument`]s, with highlighting and scroll support.

pub mod client;
pub mod config;
pub mod documents;
pub mod error;
pub mod network;
pub mod query;
pub mod results;

pub use client::{Scroll, ScrollState, SearchClient};
pub use config::Settings;
pub use documents::{GeoPoint, HotelDocument};
pub use error::{Result, SearchError};
pub use query::{Criteria, Distance, HighlightSpec, Predicate, Query, Sort};
pub use results::{ResultPage, SearchHit};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timeout for engine requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 5;

/// Index holding hotel documents
pub const DEFAULT_INDEX: &str = "hotel";

/// Hits per page when none is given
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest `from + size` the engine serves without a scroll
pub const MAX_RESULT_WINDOW: u64 = 10_000;
