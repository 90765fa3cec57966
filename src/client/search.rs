//! Search client: paged queries, counts and scroll plumbing

use super::scroll::Scroll;
use crate::config::{HighlightSettings, ScrollSettings, SearchSettings, Settings};
use crate::error::{Result, SearchError};
use crate::network::{ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::query::{
    format_keep_alive, Criteria, HighlightSpec, Query, QueryBuilder, MIN_KEEP_ALIVE,
};
use crate::results::{ResultMapper, ResultPage};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Engine error type for an unknown or expired scroll context
const SCROLL_MISSING: &str = "search_context_missing_exception";

/// Client for one hotel index. Owned by the caller and released with [`SearchClient::close`].
pub struct SearchClient {
    transport: Arc<dyn Transport>,
    index: String,
    search: SearchSettings,
    scroll: ScrollSettings,
    highlight: HighlightSettings,
    violations: AtomicU64,
}

impl SearchClient {
    /// Create a client talking HTTP to the configured engine
    pub fn new(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let transport = HttpTransport::new(&settings.connection, &settings.retry)?;
        info!(
            "Search client for index '{}' at {}",
            settings.connection.index,
            transport.base_url()
        );
        Ok(Self::with_transport(Arc::new(transport), settings))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>, settings: &Settings) -> Self {
        Self {
            transport,
            index: settings.connection.index.clone(),
            search: settings.search.clone(),
            scroll: settings.scroll.clone(),
            highlight: settings.highlight.clone(),
            violations: AtomicU64::new(0),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Query builder preset with the configured page size and result window
    pub fn query_builder(&self) -> QueryBuilder {
        Query::builder()
            .size(self.search.default_page_size)
            .max_result_window(self.search.max_result_window)
    }

    /// Query builder preset for scrolling with the configured page size and keep-alive
    pub fn scroll_query_builder(&self) -> QueryBuilder {
        Query::builder()
            .size(self.scroll.page_size)
            .scroll(self.scroll.keep_alive())
    }

    /// Hits seen so far that break a filter of their query; only counted with `search.verify_hits`
    pub fn filter_violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    /// Highlight spec using the configured markers
    pub fn highlight_spec<I, S>(&self, fields: I) -> HighlightSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HighlightSpec::new(fields).with_tags(&self.highlight.pre_tag, &self.highlight.post_tag)
    }

    /// Run a paged query
    pub async fn search(&self, query: &Query) -> Result<ResultPage> {
        if query.scroll_keep_alive().is_some() {
            debug!("Query carries a scroll keep-alive; running it as a plain page");
        }
        info!(
            "Searching '{}' (page {}, size {})",
            self.index,
            query.page(),
            query.size()
        );

        let start = Instant::now();
        let request = ApiRequest::post(format!("{}/_search", self.index)).json(query.to_search_body());
        let response = self.transport.send(request).await?.error_for_status()?;

        let page = ResultMapper::new(query.highlight().cloned()).map_text(&response.text)?;
        debug!(
            "{} of {} hits in {:?}",
            page.len(),
            page.total.value,
            start.elapsed()
        );
        self.verify(query, &page);
        Ok(page)
    }

    /// Number of documents matching the criteria
    pub async fn count(&self, criteria: &Criteria) -> Result<u64> {
        #[derive(Deserialize)]
        struct CountResponse {
            count: u64,
        }

        criteria.validate()?;
        let request = ApiRequest::post(format!("{}/_count", self.index))
            .json(json!({ "query": criteria.to_dsl() }));
        let response = self.transport.send(request).await?.error_for_status()?;
        Ok(response.json::<CountResponse>()?.count)
    }

    /// Prepare a scroll over every hit of the query. Nothing is sent until the first page is pulled.
    ///
    /// The keep-alive comes from the query, or from the settings when the query has none.
    pub fn scroll(&self, query: &Query) -> Result<Scroll<'_>> {
        if query.page() != 0 {
            return Err(SearchError::invalid("a scroll always starts at page 0"));
        }
        let keep_alive = query
            .scroll_keep_alive()
            .unwrap_or_else(|| self.scroll.keep_alive());
        if keep_alive < MIN_KEEP_ALIVE {
            return Err(SearchError::invalid(format!(
                "scroll keep-alive must be at least 1ms, got {:?}",
                keep_alive
            )));
        }
        Ok(Scroll::new(self, query.clone(), keep_alive))
    }

    /// Release the client and its connection pool
    pub fn close(self) {
        info!("Closing search client for index '{}'", self.index);
    }

    pub(crate) async fn open_scroll(
        &self,
        query: &Query,
        keep_alive: Duration,
        mapper: &ResultMapper,
    ) -> Result<ResultPage> {
        info!(
            "Opening scroll on '{}' (size {}, keep-alive {:?})",
            self.index,
            query.size(),
            keep_alive
        );
        let request = ApiRequest::post(format!("{}/_search", self.index))
            .param("scroll", format_keep_alive(keep_alive))
            .json(query.to_scroll_body());
        let response = self.transport.send(request).await?.error_for_status()?;

        let page = mapper.map_text(&response.text)?;
        self.verify(query, &page);
        Ok(page)
    }

    pub(crate) async fn continue_scroll(
        &self,
        query: &Query,
        scroll_id: &str,
        keep_alive: Duration,
        mapper: &ResultMapper,
    ) -> Result<ResultPage> {
        let request = ApiRequest::post("_search/scroll")
            .json(json!({
                "scroll": format_keep_alive(keep_alive),
                "scroll_id": scroll_id
            }))
            .not_idempotent();
        let response = self.transport.send(request).await?;
        if is_missing_scroll(&response) {
            return Err(SearchError::CursorExpired(response.error_reason()));
        }
        let response = response.error_for_status()?;
        let page = mapper.map_text(&response.text)?;
        self.verify(query, &page);
        Ok(page)
    }

    pub(crate) async fn clear_scroll(&self, scroll_id: &str) -> Result<()> {
        let request =
            ApiRequest::delete("_search/scroll").json(json!({ "scroll_id": [scroll_id] }));
        let response = self.transport.send(request).await?;
        if response.status == 404 {
            debug!("Scroll context already gone on the server");
            return Ok(());
        }
        response.error_for_status()?;
        debug!("Released scroll context");
        Ok(())
    }

    /// Log and count hits that break a filter of the query. Returns the number of violations.
    fn verify(&self, query: &Query, page: &ResultPage) -> u64 {
        if !self.search.verify_hits {
            return 0;
        }
        let mut found = 0;
        for hit in &page.hits {
            for predicate in query.criteria().violated_filters(&hit.document) {
                warn!(
                    "Hit '{}' does not satisfy the filter on '{}'",
                    hit.id,
                    predicate.field()
                );
                found += 1;
            }
        }
        if found > 0 {
            self.violations.fetch_add(found, Ordering::Relaxed);
        }
        found
    }
}

fn is_missing_scroll(response: &ApiResponse) -> bool {
    !response.is_success()
        && (response.status == 404 || response.mentions_error_type(SCROLL_MISSING))
}
