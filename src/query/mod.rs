//! Query building module
//!
//! Turns typed predicates plus pagination, sort and highlight settings into
//! the JSON query document sent to the engine:
//! - Full-text match (optionally fuzzy): scored, goes to `bool.must`
//! - Exact match and set membership: `term` / `terms` filters
//! - Numeric ranges, open on either side: `range` filter
//! - Geo radius and geo bounding box on a `geo_point` field
//!
//! Validation happens once, in [`QueryBuilder::build`], so a malformed query
//! never reaches the network.

mod builder;
mod criteria;
mod dsl;

pub use builder::{HighlightSpec, Query, QueryBuilder, Sort, SortDirection, MIN_KEEP_ALIVE};
pub use criteria::{Criteria, Distance, DistanceUnit, Predicate};
pub(crate) use dsl::format_keep_alive;
