//! Scroll cursor state machine and the driver that walks it

use super::search::SearchClient;
use crate::error::{Result, SearchError};
use crate::query::Query;
use crate::results::{ResultMapper, ResultPage, SearchHit};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a scroll stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    /// Nothing fetched yet
    Started,
    /// At least one non-empty page fetched; a continuation token is held
    Continuing,
    /// Terminal: no more pages will be fetched
    Exhausted,
}

/// Tracks the server-issued token across continuation calls.
///
/// The token is stored exactly as the engine sent it and handed back verbatim.
#[derive(Debug, Clone)]
pub struct ScrollCursor {
    state: ScrollState,
    token: Option<String>,
    pages: u32,
    hits: u64,
}

impl Default for ScrollCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollCursor {
    pub fn new() -> Self {
        Self {
            state: ScrollState::Started,
            token: None,
            pages: 0,
            hits: 0,
        }
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Token for the next continuation call
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Non-empty pages seen so far
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Hits seen so far
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == ScrollState::Exhausted
    }

    /// Record a fetched page and move to the next state
    pub fn advance(&mut self, page: &ResultPage) -> Result<()> {
        if self.is_exhausted() {
            return Err(SearchError::CursorExpired(
                "scroll is exhausted; start a new one".to_string(),
            ));
        }

        if let Some(ref id) = page.scroll_id {
            self.token = Some(id.clone());
        }

        if page.is_empty() {
            self.state = ScrollState::Exhausted;
            return Ok(());
        }

        if self.token.is_none() {
            self.state = ScrollState::Exhausted;
            return Err(SearchError::mapping(
                "scroll response carried hits but no _scroll_id",
            ));
        }

        self.pages += 1;
        self.hits += page.len() as u64;
        self.state = ScrollState::Continuing;
        Ok(())
    }

    /// The engine no longer knows the token
    pub fn expire(&mut self) {
        self.state = ScrollState::Exhausted;
        self.token = None;
    }

    /// Stop the scroll, handing back any token that still needs releasing
    pub fn finish(&mut self) -> Option<String> {
        self.state = ScrollState::Exhausted;
        self.token.take()
    }
}

/// A scroll in progress over one query.
///
/// Pages must be pulled one after another; `&mut self` keeps a single cursor
/// from being advanced from two places at once.
pub struct Scroll<'a> {
    client: &'a SearchClient,
    query: Query,
    keep_alive: Duration,
    mapper: ResultMapper,
    cursor: ScrollCursor,
}

impl<'a> Scroll<'a> {
    pub(crate) fn new(client: &'a SearchClient, query: Query, keep_alive: Duration) -> Self {
        let mapper = ResultMapper::new(query.highlight().cloned());
        Self {
            client,
            query,
            keep_alive,
            mapper,
            cursor: ScrollCursor::new(),
        }
    }

    pub fn state(&self) -> ScrollState {
        self.cursor.state()
    }

    pub fn cursor(&self) -> &ScrollCursor {
        &self.cursor
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Fetch the next page; `None` once the scroll is exhausted.
    ///
    /// An empty page ends the scroll and releases the server-side context.
    /// A missing context surfaces as [`SearchError::CursorExpired`] and also ends it.
    pub async fn next_page(&mut self) -> Result<Option<ResultPage>> {
        let fetched = match self.cursor.state() {
            ScrollState::Exhausted => return Ok(None),
            ScrollState::Started => {
                self.client
                    .open_scroll(&self.query, self.keep_alive, &self.mapper)
                    .await
            }
            ScrollState::Continuing => {
                let token = self
                    .cursor
                    .token()
                    .map(str::to_string)
                    .ok_or_else(|| SearchError::mapping("continuing scroll without a token"))?;
                self.client
                    .continue_scroll(&self.query, &token, self.keep_alive, &self.mapper)
                    .await
            }
        };

        let page = match fetched {
            Ok(page) => page,
            Err(SearchError::CursorExpired(reason)) => {
                warn!(
                    "Scroll context expired after {} pages: {}",
                    self.cursor.pages(),
                    reason
                );
                self.cursor.expire();
                return Err(SearchError::CursorExpired(reason));
            }
            Err(e) => return Err(e),
        };

        let was_started = self.cursor.state() == ScrollState::Started;
        self.cursor.advance(&page)?;

        if self.cursor.is_exhausted() {
            if was_started {
                info!("Scroll matched no documents");
            } else {
                info!(
                    "Scroll exhausted after {} pages, {} hits",
                    self.cursor.pages(),
                    self.cursor.hits()
                );
            }
            self.release_context().await;
            return Ok(None);
        }

        debug!(
            "Scroll page {} with {} hits",
            self.cursor.pages(),
            page.len()
        );
        Ok(Some(page))
    }

    /// Pull every remaining page and return the hits in order
    pub async fn collect_all(mut self) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();
        loop {
            match self.next_page().await {
                Ok(Some(page)) => hits.extend(page.hits),
                Ok(None) => return Ok(hits),
                Err(e) => {
                    if let Err(release_err) = self.release().await {
                        warn!("Failed to release scroll context: {}", release_err);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Stop early and free the server-side context
    pub async fn release(mut self) -> Result<()> {
        match self.cursor.finish() {
            Some(token) => self.client.clear_scroll(&token).await,
            None => Ok(()),
        }
    }

    async fn release_context(&mut self) {
        if let Some(token) = self.cursor.finish() {
            if let Err(e) = self.client.clear_scroll(&token).await {
                warn!("Failed to release scroll context: {}", e);
            }
        }
    }
}

impl Drop for Scroll<'_> {
    fn drop(&mut self) {
        if self.cursor.token().is_some() {
            warn!(
                "Scroll dropped without release; its server-side context lives until the {:?} keep-alive runs out",
                self.keep_alive
            );
        }
    }
}
