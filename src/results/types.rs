//! Result type definitions

use crate::documents::HotelDocument;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One matched document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Engine document id
    pub id: String,
    /// Relevance score; absent when sorting by a field
    pub score: Option<f64>,
    pub document: HotelDocument,
    /// Raw highlight fragments per field, as returned by the engine
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub highlight_fields: HashMap<String, Vec<String>>,
    /// Plain field values overlaid with highlighted fragments, for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<BTreeMap<String, String>>,
    /// Sort values of this hit
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort_values: Vec<serde_json::Value>,
}

/// Whether the total is exact or a lower bound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalRelation {
    #[default]
    Eq,
    Gte,
}

/// Number of documents matching the query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    pub relation: TotalRelation,
}

impl TotalHits {
    pub fn exact(value: u64) -> Self {
        Self {
            value,
            relation: TotalRelation::Eq,
        }
    }
}

/// One page of hits
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultPage {
    pub hits: Vec<SearchHit>,
    pub total: TotalHits,
    /// Cursor token for the next scroll continuation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
    /// Server-side processing time in milliseconds
    pub took_ms: u64,
}

impl ResultPage {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Documents in hit order
    pub fn documents(&self) -> impl Iterator<Item = &HotelDocument> {
        self.hits.iter().map(|h| &h.document)
    }

    pub fn into_documents(self) -> Vec<HotelDocument> {
        self.hits.into_iter().map(|h| h.document).collect()
    }
}
