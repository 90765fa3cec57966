//! Result types and mapping of raw engine responses
//!
//! Hits are mapped into typed [`HotelDocument`](crate::documents::HotelDocument)s;
//! highlight fragments are kept beside the document, never written into it.

mod mapper;
mod types;

pub use mapper::ResultMapper;
pub use types::*;
