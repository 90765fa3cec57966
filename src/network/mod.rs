//! HTTP networking module
//!
//! Provides the transport used to talk to the search engine.

mod client;
mod retry;
mod transport;

pub use client::HttpTransport;
pub use retry::Backoff;
pub use transport::*;
