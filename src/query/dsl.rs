//! Rendering of queries into the engine's JSON query DSL

use super::builder::{HighlightSpec, Query, Sort};
use super::criteria::{Criteria, Predicate};
use serde_json::{json, Map, Value};
use std::time::Duration;

impl Predicate {
    /// The DSL clause for this predicate
    pub fn to_dsl(&self) -> Value {
        match self {
            Self::Equals { field, value } => json!({ "term": { field: value } }),
            Self::In { field, values } => json!({ "terms": { field: values } }),
            Self::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(l) = gte {
                    bounds.insert("gte".to_string(), json!(l));
                }
                if let Some(u) = lte {
                    bounds.insert("lte".to_string(), json!(u));
                }
                json!({ "range": { field: bounds } })
            }
            Self::GeoRadius {
                field,
                center,
                distance,
            } => json!({
                "geo_distance": {
                    "distance": distance.to_string(),
                    field: { "lat": center.lat, "lon": center.lon }
                }
            }),
            Self::GeoBox {
                field,
                top_left,
                bottom_right,
            } => json!({
                "geo_bounding_box": {
                    field: {
                        "top_left": { "lat": top_left.lat, "lon": top_left.lon },
                        "bottom_right": { "lat": bottom_right.lat, "lon": bottom_right.lon }
                    }
                }
            }),
            Self::Match { field, text, fuzzy } => {
                let mut clause = Map::new();
                clause.insert("query".to_string(), json!(text));
                if *fuzzy {
                    clause.insert("fuzziness".to_string(), json!("AUTO"));
                }
                json!({ "match": { field: clause } })
            }
        }
    }
}

impl Criteria {
    /// The `query` section: full-text matches score, everything else filters
    pub fn to_dsl(&self) -> Value {
        if self.is_empty() {
            return json!({ "match_all": {} });
        }

        let (filters, matches): (Vec<&Predicate>, Vec<&Predicate>) =
            self.predicates().iter().partition(|p| p.is_filter());

        let mut bool_query = Map::new();
        if !matches.is_empty() {
            bool_query.insert(
                "must".to_string(),
                Value::Array(matches.iter().map(|p| p.to_dsl()).collect()),
            );
        }
        if !filters.is_empty() {
            bool_query.insert(
                "filter".to_string(),
                Value::Array(filters.iter().map(|p| p.to_dsl()).collect()),
            );
        }
        json!({ "bool": bool_query })
    }
}

impl Sort {
    fn to_dsl(&self) -> Value {
        json!({ &self.field: { "order": self.direction.as_str() } })
    }
}

impl HighlightSpec {
    fn to_dsl(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.clone(), json!({})))
            .collect();
        json!({
            "pre_tags": [&self.pre_tag],
            "post_tags": [&self.post_tag],
            "require_field_match": self.require_field_match,
            "fields": fields
        })
    }
}

impl Query {
    /// Body for a paged `_search` request
    pub fn to_search_body(&self) -> Value {
        let mut body = self.base_body();
        body.insert("from".to_string(), json!(self.from()));
        Value::Object(body)
    }

    /// Body for the request that opens a scroll; scrolls always start at the first hit
    pub fn to_scroll_body(&self) -> Value {
        Value::Object(self.base_body())
    }

    fn base_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("query".to_string(), self.criteria().to_dsl());
        body.insert("size".to_string(), json!(self.size()));
        body.insert("track_total_hits".to_string(), json!(true));
        if !self.sort().is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(self.sort().iter().map(Sort::to_dsl).collect()),
            );
        }
        if let Some(spec) = self.highlight() {
            body.insert("highlight".to_string(), spec.to_dsl());
        }
        body
    }
}

/// Time value in the engine's notation, e.g. `60s` or `1500ms`
pub fn format_keep_alive(keep_alive: Duration) -> String {
    if keep_alive.subsec_millis() == 0 {
        format!("{}s", keep_alive.as_secs())
    } else {
        format!("{}ms", keep_alive.as_millis())
    }
}
