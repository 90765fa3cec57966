//! Mapping of raw `_search` / `_search/scroll` responses into result pages

use super::types::*;
use crate::documents::HotelDocument;
use crate::error::{Result, SearchError};
use crate::query::HighlightSpec;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Separator placed between multiple fragments of one field
const FRAGMENT_SEPARATOR: &str = " ... ";

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    #[serde(default)]
    took: u64,
    hits: RawHits,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    total: Option<RawTotal>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// Older engines report a bare number, newer ones an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Count(u64),
    Object { value: u64, relation: TotalRelation },
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: Option<Value>,
    #[serde(default)]
    highlight: HashMap<String, Vec<String>>,
    #[serde(default)]
    sort: Vec<Value>,
}

/// Converts raw responses into [`ResultPage`]s for one query
#[derive(Debug, Clone, Default)]
pub struct ResultMapper {
    highlight: Option<HighlightSpec>,
}

impl ResultMapper {
    pub fn new(highlight: Option<HighlightSpec>) -> Self {
        Self { highlight }
    }

    /// Parse and map a response body
    pub fn map_text(&self, text: &str) -> Result<ResultPage> {
        let raw: RawResponse = serde_json::from_str(text)
            .map_err(|e| SearchError::mapping(format!("unexpected response shape: {}", e)))?;
        self.map_raw(raw)
    }

    /// Map an already parsed response body
    pub fn map_value(&self, value: Value) -> Result<ResultPage> {
        let raw: RawResponse = serde_json::from_value(value)
            .map_err(|e| SearchError::mapping(format!("unexpected response shape: {}", e)))?;
        self.map_raw(raw)
    }

    fn map_raw(&self, raw: RawResponse) -> Result<ResultPage> {
        let hits = raw
            .hits
            .hits
            .into_iter()
            .map(map_hit)
            .collect::<Result<Vec<_>>>()?;

        let total = match raw.hits.total {
            Some(RawTotal::Count(value)) => TotalHits::exact(value),
            Some(RawTotal::Object { value, relation }) => TotalHits { value, relation },
            None => TotalHits::exact(hits.len() as u64),
        };

        let mut page = ResultPage {
            hits,
            total,
            scroll_id: raw.scroll_id,
            took_ms: raw.took,
        };
        self.merge_highlights(&mut page);
        Ok(page)
    }

    /// Recompute every hit's display map from its document and fragments.
    ///
    /// The display map is derived only from inputs the merge never changes,
    /// so applying it again yields the same map.
    pub fn merge_highlights(&self, page: &mut ResultPage) {
        let Some(spec) = &self.highlight else {
            return;
        };
        for hit in &mut page.hits {
            hit.display = Some(display_fields(&hit.document, &hit.highlight_fields, spec));
        }
    }
}

fn map_hit(raw: RawHit) -> Result<SearchHit> {
    let source = raw.source.ok_or_else(|| {
        SearchError::mapping(format!("hit '{}' carries no _source", raw.id))
    })?;
    let document: HotelDocument = serde_json::from_value(source)
        .map_err(|e| SearchError::mapping(format!("hit '{}': {}", raw.id, e)))?;

    Ok(SearchHit {
        id: raw.id,
        score: raw.score,
        document,
        highlight_fields: raw.highlight,
        display: None,
        sort_values: raw.sort,
    })
}

fn display_fields(
    doc: &HotelDocument,
    fragments: &HashMap<String, Vec<String>>,
    spec: &HighlightSpec,
) -> BTreeMap<String, String> {
    let mut display: BTreeMap<String, String> = HotelDocument::TEXT_FIELDS
        .iter()
        .filter_map(|f| doc.text_field(f).map(|v| (f.to_string(), v.to_string())))
        .collect();
    display.insert("id".to_string(), doc.id.clone());
    display.insert("price".to_string(), doc.price.to_string());
    if let Some(score) = doc.score {
        display.insert("score".to_string(), score.to_string());
    }
    display.insert("location".to_string(), doc.location.to_string());

    for field in &spec.fields {
        if let Some(parts) = fragments.get(field).filter(|p| !p.is_empty()) {
            display.insert(field.clone(), parts.join(FRAGMENT_SEPARATOR));
        }
    }
    display
}
