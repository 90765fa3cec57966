//! Query assembly and validation

use super::criteria::{Criteria, Predicate};
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest scroll keep-alive the engine can be sent
pub const MIN_KEEP_ALIVE: Duration = Duration::from_millis(1);

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sort on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Which fields to highlight and how to mark the matched parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpec {
    pub fields: Vec<String>,
    pub pre_tag: String,
    pub post_tag: String,
    /// Only highlight fields the query actually matched on
    pub require_field_match: bool,
}

impl HighlightSpec {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            pre_tag: "<em>".to_string(),
            post_tag: "</em>".to_string(),
            require_field_match: true,
        }
    }

    pub fn with_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.pre_tag = pre.into();
        self.post_tag = post.into();
        self
    }

    pub fn with_require_field_match(mut self, require: bool) -> Self {
        self.require_field_match = require;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(SearchError::invalid("highlight needs at least one field"));
        }
        if self.fields.iter().any(|f| f.trim().is_empty()) {
            return Err(SearchError::invalid("highlight field name is empty"));
        }
        Ok(())
    }
}

/// A validated query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    criteria: Criteria,
    page: u32,
    size: u32,
    sort: Vec<Sort>,
    highlight: Option<HighlightSpec>,
    scroll: Option<Duration>,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Zero-based page index
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Offset of the first hit
    pub fn from(&self) -> u64 {
        self.page as u64 * self.size as u64
    }

    pub fn sort(&self) -> &[Sort] {
        &self.sort
    }

    pub fn highlight(&self) -> Option<&HighlightSpec> {
        self.highlight.as_ref()
    }

    /// Scroll keep-alive, when this query is meant to be scrolled
    pub fn scroll_keep_alive(&self) -> Option<Duration> {
        self.scroll
    }
}

/// Builder for [`Query`]; every setter consumes and returns the builder
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    criteria: Criteria,
    page: u32,
    size: u32,
    sort: Vec<Sort>,
    highlight: Option<HighlightSpec>,
    scroll: Option<Duration>,
    max_result_window: u64,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            criteria: Criteria::new(),
            page: 0,
            size: crate::DEFAULT_PAGE_SIZE,
            sort: Vec::new(),
            highlight: None,
            scroll: None,
            max_result_window: crate::MAX_RESULT_WINDOW,
        }
    }

    /// Replace the criteria
    pub fn criteria(mut self, criteria: impl Into<Criteria>) -> Self {
        self.criteria = criteria.into();
        self
    }

    /// Add one predicate to the criteria
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.criteria = self.criteria.and(predicate);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn highlight(mut self, spec: HighlightSpec) -> Self {
        self.highlight = Some(spec);
        self
    }

    /// Mark the query for scrolling with the given server-side keep-alive
    pub fn scroll(mut self, keep_alive: Duration) -> Self {
        self.scroll = Some(keep_alive);
        self
    }

    pub fn max_result_window(mut self, window: u64) -> Self {
        self.max_result_window = window;
        self
    }

    /// Validate everything and produce the query
    pub fn build(self) -> Result<Query> {
        self.criteria.validate()?;

        if self.size == 0 {
            return Err(SearchError::invalid("page size must be at least 1"));
        }
        let window_end = (self.page as u64 + 1) * self.size as u64;
        if self.scroll.is_none() && window_end > self.max_result_window {
            return Err(SearchError::invalid(format!(
                "page {} of size {} reaches past the result window of {}; use a scroll",
                self.page, self.size, self.max_result_window
            )));
        }

        if self.sort.iter().any(|s| s.field.trim().is_empty()) {
            return Err(SearchError::invalid("sort field name is empty"));
        }
        if let Some(ref spec) = self.highlight {
            spec.validate()?;
        }

        if let Some(keep_alive) = self.scroll {
            if keep_alive < MIN_KEEP_ALIVE {
                return Err(SearchError::invalid(format!(
                    "scroll keep-alive must be at least 1ms, got {:?}",
                    keep_alive
                )));
            }
            if self.page != 0 {
                return Err(SearchError::invalid("a scroll always starts at page 0"));
            }
        }

        Ok(Query {
            criteria: self.criteria,
            page: self.page,
            size: self.size,
            sort: self.sort,
            highlight: self.highlight,
            scroll: self.scroll,
        })
    }
}
