//! Hotel document as indexed by the engine

use super::geo::GeoPoint;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of one indexed hotel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDocument {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub star_name: Option<String>,
    /// Business district
    #[serde(default)]
    pub business: Option<String>,
    pub location: GeoPoint,
    #[serde(default)]
    pub pic: Option<String>,
}

impl HotelDocument {
    /// Index field names of the plain text fields, in display order
    pub const TEXT_FIELDS: [&'static str; 7] = [
        "name", "address", "brand", "city", "starName", "business", "pic",
    ];

    /// Value of a text field by its index name
    pub fn text_field(&self, field: &str) -> Option<&str> {
        match field {
            "id" => Some(self.id.as_str()),
            "name" => Some(self.name.as_str()),
            "address" => self.address.as_deref(),
            "brand" => self.brand.as_deref(),
            "city" => self.city.as_deref(),
            "starName" => self.star_name.as_deref(),
            "business" => self.business.as_deref(),
            "pic" => self.pic.as_deref(),
            _ => None,
        }
    }

    /// Value of a numeric field by its index name
    pub fn numeric_field(&self, field: &str) -> Option<f64> {
        match field {
            "price" => Some(self.price as f64),
            "score" => self.score.map(|s| s as f64),
            _ => None,
        }
    }

    /// Text fields copied into the catch-all `all` field of the index
    pub fn all_text(&self) -> impl Iterator<Item = &str> {
        ["name", "brand", "business", "city", "starName"]
            .into_iter()
            .filter_map(move |f| self.text_field(f))
    }
}

/// Ids come back as numbers or strings depending on how the index was fed
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("invalid id: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_source() {
        let source = json!({
            "id": 36934,
            "name": "7天连锁酒店(上海宝山路地铁站店)",
            "address": "静安交通路40号",
            "price": 336,
            "score": 37,
            "brand": "7天酒店",
            "city": "上海",
            "starName": "二钻",
            "business": "四川北路商业区",
            "location": "31.251433, 121.47522",
            "pic": "https://example.com/pic.jpg"
        });

        let hotel: HotelDocument = serde_json::from_value(source).unwrap();
        assert_eq!(hotel.id, "36934");
        assert_eq!(hotel.star_name.as_deref(), Some("二钻"));
        assert_eq!(hotel.location, GeoPoint::new(31.251433, 121.47522));
        assert_eq!(hotel.numeric_field("price"), Some(336.0));
        assert_eq!(hotel.text_field("starName"), Some("二钻"));
    }

    #[test]
    fn test_missing_required_field() {
        let source = json!({ "id": "1", "name": "如家", "location": "31.2, 121.5" });
        let err = serde_json::from_value::<HotelDocument>(source).unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_optional_fields_default() {
        let source = json!({ "id": "1", "name": "如家", "price": 199, "location": [121.5, 31.2] });
        let hotel: HotelDocument = serde_json::from_value(source).unwrap();
        assert!(hotel.brand.is_none());
        assert_eq!(hotel.all_text().collect::<Vec<_>>(), vec!["如家"]);
    }
}
