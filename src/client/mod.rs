//! Search client module
//!
//! [`SearchClient`] issues paged, counted and scrolled queries against one index.
//! Scrolls are driven through [`Scroll`], whose progress is tracked by the
//! [`ScrollCursor`] state machine.

mod scroll;
mod search;

pub use scroll::{Scroll, ScrollCursor, ScrollState};
pub use search::SearchClient;
