//! Predicates and their AND-combination

use crate::documents::{GeoPoint, HotelDocument};
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// A single filter on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Exact value
    Equals { field: String, value: Value },
    /// Value is one of a set
    In { field: String, values: Vec<Value> },
    /// Numeric range, inclusive on both ends; a missing bound leaves that side open
    Range {
        field: String,
        gte: Option<f64>,
        lte: Option<f64>,
    },
    /// Location within a distance of a center point
    GeoRadius {
        field: String,
        center: GeoPoint,
        distance: Distance,
    },
    /// Location inside a rectangle
    GeoBox {
        field: String,
        top_left: GeoPoint,
        bottom_right: GeoPoint,
    },
    /// Analyzed full-text match
    Match {
        field: String,
        text: String,
        fuzzy: bool,
    },
}

impl Predicate {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn one_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn between(field: impl Into<String>, gte: f64, lte: f64) -> Self {
        Self::Range {
            field: field.into(),
            gte: Some(gte),
            lte: Some(lte),
        }
    }

    pub fn at_least(field: impl Into<String>, gte: f64) -> Self {
        Self::Range {
            field: field.into(),
            gte: Some(gte),
            lte: None,
        }
    }

    pub fn at_most(field: impl Into<String>, lte: f64) -> Self {
        Self::Range {
            field: field.into(),
            gte: None,
            lte: Some(lte),
        }
    }

    pub fn within(field: impl Into<String>, center: GeoPoint, distance: Distance) -> Self {
        Self::GeoRadius {
            field: field.into(),
            center,
            distance,
        }
    }

    pub fn bounded_by(field: impl Into<String>, top_left: GeoPoint, bottom_right: GeoPoint) -> Self {
        Self::GeoBox {
            field: field.into(),
            top_left,
            bottom_right,
        }
    }

    pub fn matches(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Match {
            field: field.into(),
            text: text.into(),
            fuzzy: false,
        }
    }

    pub fn fuzzy(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Match {
            field: field.into(),
            text: text.into(),
            fuzzy: true,
        }
    }

    /// Field this predicate constrains
    pub fn field(&self) -> &str {
        match self {
            Self::Equals { field, .. }
            | Self::In { field, .. }
            | Self::Range { field, .. }
            | Self::GeoRadius { field, .. }
            | Self::GeoBox { field, .. }
            | Self::Match { field, .. } => field,
        }
    }

    /// Whether this is a non-scoring filter (everything except full-text match)
    pub fn is_filter(&self) -> bool {
        !matches!(self, Self::Match { .. })
    }

    /// Check the predicate's own constraints
    pub fn validate(&self) -> Result<()> {
        if self.field().trim().is_empty() {
            return Err(SearchError::invalid("predicate field name is empty"));
        }

        match self {
            Self::Equals { field, value } => {
                if value.is_null() {
                    return Err(SearchError::invalid(format!(
                        "equality on '{}' needs a non-null value",
                        field
                    )));
                }
            }
            Self::In { field, values } => {
                if values.is_empty() {
                    return Err(SearchError::invalid(format!(
                        "set membership on '{}' needs at least one value",
                        field
                    )));
                }
            }
            Self::Range { field, gte, lte } => {
                if gte.is_none() && lte.is_none() {
                    return Err(SearchError::invalid(format!(
                        "range on '{}' needs at least one bound",
                        field
                    )));
                }
                if gte.iter().chain(lte.iter()).any(|b| !b.is_finite()) {
                    return Err(SearchError::invalid(format!(
                        "range on '{}' has a non-finite bound",
                        field
                    )));
                }
                if let (Some(lower), Some(upper)) = (gte, lte) {
                    if lower > upper {
                        return Err(SearchError::invalid(format!(
                            "range on '{}' has lower bound {} above upper bound {}",
                            field, lower, upper
                        )));
                    }
                }
            }
            Self::GeoRadius {
                field,
                center,
                distance,
            } => {
                if !center.is_valid() {
                    return Err(SearchError::invalid(format!(
                        "geo radius on '{}' has an invalid center ({})",
                        field, center
                    )));
                }
                if !(distance.value.is_finite() && distance.value > 0.0) {
                    return Err(SearchError::invalid(format!(
                        "geo radius on '{}' needs a positive distance, got {}",
                        field, distance
                    )));
                }
            }
            Self::GeoBox {
                field,
                top_left,
                bottom_right,
            } => {
                if !top_left.is_valid() || !bottom_right.is_valid() {
                    return Err(SearchError::invalid(format!(
                        "geo box on '{}' has an invalid corner",
                        field
                    )));
                }
                if top_left.lat < bottom_right.lat {
                    return Err(SearchError::invalid(format!(
                        "geo box on '{}': top-left latitude {} is below bottom-right latitude {}",
                        field, top_left.lat, bottom_right.lat
                    )));
                }
            }
            Self::Match { field, text, .. } => {
                if text.trim().is_empty() {
                    return Err(SearchError::invalid(format!(
                        "match on '{}' needs non-empty text",
                        field
                    )));
                }
            }
        }

        Ok(())
    }

    /// Evaluate the predicate against a document locally.
    ///
    /// Full-text matching is approximated by a case-insensitive substring test
    /// on any whitespace-separated term; the engine's analyzers decide the real answer.
    pub fn is_satisfied_by(&self, doc: &HotelDocument) -> bool {
        match self {
            Self::Equals { field, value } => field_equals(doc, field, value),
            Self::In { field, values } => values.iter().any(|v| field_equals(doc, field, v)),
            Self::Range { field, gte, lte } => match doc.numeric_field(field) {
                Some(v) => gte.map_or(true, |l| v >= l) && lte.map_or(true, |u| v <= u),
                None => false,
            },
            Self::GeoRadius {
                field,
                center,
                distance,
            } => geo_field(doc, field)
                .map_or(false, |p| p.distance_km(center) <= distance.to_km()),
            Self::GeoBox {
                field,
                top_left,
                bottom_right,
            } => geo_field(doc, field).map_or(false, |p| p.within_box(top_left, bottom_right)),
            Self::Match { field, text, .. } => {
                let terms: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
                let contains = |haystack: &str| {
                    let haystack = haystack.to_lowercase();
                    terms.iter().any(|t| haystack.contains(t.as_str()))
                };
                if field == "all" {
                    doc.all_text().any(contains)
                } else {
                    doc.text_field(field).map_or(false, contains)
                }
            }
        }
    }
}

fn field_equals(doc: &HotelDocument, field: &str, value: &Value) -> bool {
    match value {
        Value::Number(n) => match (doc.numeric_field(field), n.as_f64()) {
            (Some(actual), Some(expected)) => actual == expected,
            _ => doc.text_field(field) == Some(n.to_string().as_str()),
        },
        Value::String(s) => doc.text_field(field) == Some(s.as_str()),
        _ => false,
    }
}

fn geo_field<'a>(doc: &'a HotelDocument, field: &str) -> Option<&'a GeoPoint> {
    (field == "location").then_some(&doc.location)
}

/// Predicates combined with logical AND. Empty criteria match every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    predicates: Vec<Predicate>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.predicates.iter().try_for_each(Predicate::validate)
    }

    /// Every predicate holds for the document
    pub fn is_satisfied_by(&self, doc: &HotelDocument) -> bool {
        self.predicates.iter().all(|p| p.is_satisfied_by(doc))
    }

    /// Filter predicates that the document violates
    pub fn violated_filters<'a>(&'a self, doc: &'a HotelDocument) -> impl Iterator<Item = &'a Predicate> {
        self.predicates
            .iter()
            .filter(move |p| p.is_filter() && !p.is_satisfied_by(doc))
    }
}

impl From<Predicate> for Criteria {
    fn from(predicate: Predicate) -> Self {
        Self::new().and(predicate)
    }
}

impl FromIterator<Predicate> for Criteria {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self {
            predicates: iter.into_iter().collect(),
        }
    }
}

/// Distance units understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Millimeters,
    Centimeters,
    Meters,
    Kilometers,
    Inches,
    Feet,
    Yards,
    Miles,
    NauticalMiles,
}

impl DistanceUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Millimeters => "mm",
            Self::Centimeters => "cm",
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Inches => "in",
            Self::Feet => "ft",
            Self::Yards => "yd",
            Self::Miles => "mi",
            Self::NauticalMiles => "nmi",
        }
    }

    fn km_factor(&self) -> f64 {
        match self {
            Self::Millimeters => 1e-6,
            Self::Centimeters => 1e-5,
            Self::Meters => 1e-3,
            Self::Kilometers => 1.0,
            Self::Inches => 0.0000254,
            Self::Feet => 0.0003048,
            Self::Yards => 0.0009144,
            Self::Miles => 1.609344,
            Self::NauticalMiles => 1.852,
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        let unit = match suffix.to_ascii_lowercase().as_str() {
            "mm" | "millimeters" => Self::Millimeters,
            "cm" | "centimeters" => Self::Centimeters,
            "" | "m" | "meters" => Self::Meters,
            "km" | "kilometers" => Self::Kilometers,
            "in" | "inch" => Self::Inches,
            "ft" | "feet" => Self::Feet,
            "yd" | "yards" => Self::Yards,
            "mi" | "miles" => Self::Miles,
            "nmi" | "nm" => Self::NauticalMiles,
            _ => return None,
        };
        Some(unit)
    }
}

/// A distance with unit, written like `2km`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    pub const fn new(value: f64, unit: DistanceUnit) -> Self {
        Self { value, unit }
    }

    pub const fn km(value: f64) -> Self {
        Self::new(value, DistanceUnit::Kilometers)
    }

    pub const fn meters(value: f64) -> Self {
        Self::new(value, DistanceUnit::Meters)
    }

    pub fn to_km(&self) -> f64 {
        self.value * self.unit.km_factor()
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for Distance {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        // the unit is the trailing run of letters, so "1e3m" keeps its exponent
        let number = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        let suffix = &s[number.len()..];
        let value = number
            .trim()
            .parse::<f64>()
            .map_err(|_| SearchError::invalid(format!("invalid distance '{}'", s)))?;
        let unit = DistanceUnit::from_suffix(suffix.trim())
            .ok_or_else(|| SearchError::invalid(format!("unknown distance unit in '{}'", s)))?;
        Ok(Self { value, unit })
    }
}

impl TryFrom<String> for Distance {
    type Error = SearchError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Distance> for String {
    fn from(distance: Distance) -> Self {
        distance.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotel(price: i64, city: &str, lat: f64, lon: f64) -> HotelDocument {
        HotelDocument {
            id: "1".into(),
            name: "上海希尔顿酒店".into(),
            address: Some("华山路250号".into()),
            price,
            score: Some(45),
            brand: Some("希尔顿".into()),
            city: Some(city.into()),
            star_name: Some("五星级".into()),
            business: Some("静安寺地区".into()),
            location: GeoPoint::new(lat, lon),
            pic: None,
        }
    }

    #[test]
    fn test_distance_parse() {
        let d: Distance = "2km".parse().unwrap();
        assert_eq!(d, Distance::km(2.0));
        assert_eq!(d.to_string(), "2km");

        let d: Distance = "1.5 mi".parse().unwrap();
        assert_eq!(d.unit, DistanceUnit::Miles);
        assert!((d.to_km() - 2.414016).abs() < 1e-9);

        let d: Distance = "500".parse().unwrap();
        assert_eq!(d, Distance::meters(500.0));

        let d: Distance = "2KM".parse().unwrap();
        assert_eq!(d, Distance::km(2.0));

        let d: Distance = "1e3m".parse().unwrap();
        assert_eq!(d, Distance::meters(1000.0));
        assert!((d.to_km() - 1.0).abs() < 1e-12);

        let d: Distance = "2.5e-1 Km".parse().unwrap();
        assert_eq!(d, Distance::km(0.25));

        let d: Distance = "3NM".parse().unwrap();
        assert_eq!(d.unit, DistanceUnit::NauticalMiles);

        assert!("km".parse::<Distance>().is_err());
        assert!("3 parsecs".parse::<Distance>().is_err());
    }

    #[test]
    fn test_range_validation() {
        assert!(Predicate::between("price", 1000.0, 2000.0).validate().is_ok());
        assert!(Predicate::at_least("price", 1000.0).validate().is_ok());
        assert!(Predicate::at_most("price", 150.0).validate().is_ok());
        assert!(Predicate::between("price", 150.0, 150.0).validate().is_ok());

        let err = Predicate::between("price", 2000.0, 1000.0).validate().unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));

        let open = Predicate::Range {
            field: "price".into(),
            gte: None,
            lte: None,
        };
        assert!(open.validate().is_err());
        assert!(Predicate::at_least("price", f64::NAN).validate().is_err());
    }

    #[test]
    fn test_geo_validation() {
        let center = GeoPoint::new(31.21, 121.5);
        assert!(Predicate::within("location", center, Distance::km(2.0)).validate().is_ok());
        assert!(Predicate::within("location", center, Distance::km(0.0)).validate().is_err());
        assert!(Predicate::within("location", GeoPoint::new(91.0, 0.0), Distance::km(1.0))
            .validate()
            .is_err());

        let tl = GeoPoint::new(31.1, 121.5);
        let br = GeoPoint::new(30.5, 121.7);
        assert!(Predicate::bounded_by("location", tl, br).validate().is_ok());
        assert!(Predicate::bounded_by("location", br, tl).validate().is_err());
    }

    #[test]
    fn test_other_validation() {
        assert!(Predicate::matches("name", "  ").validate().is_err());
        assert!(Predicate::matches("", "如家").validate().is_err());
        assert!(Predicate::one_of("city", Vec::<String>::new()).validate().is_err());
        assert!(Predicate::equals("brand", Value::Null).validate().is_err());
    }

    #[test]
    fn test_local_evaluation() {
        let doc = hotel(1500, "上海", 30.8, 121.6);

        let criteria = Criteria::new()
            .and(Predicate::matches("name", "希尔顿"))
            .and(Predicate::one_of("city", ["北京", "上海"]))
            .and(Predicate::between("price", 1000.0, 2000.0));
        assert!(criteria.is_satisfied_by(&doc));

        assert!(!Predicate::between("price", 0.0, 150.0).is_satisfied_by(&doc));
        assert!(Predicate::equals("price", 1500).is_satisfied_by(&doc));
        assert!(Predicate::equals("brand", "希尔顿").is_satisfied_by(&doc));
        assert!(Predicate::matches("all", "静安寺").is_satisfied_by(&doc));
        assert!(!Predicate::matches("all", "如家").is_satisfied_by(&doc));

        let in_box = Predicate::bounded_by(
            "location",
            GeoPoint::new(31.1, 121.5),
            GeoPoint::new(30.5, 121.7),
        );
        assert!(in_box.is_satisfied_by(&doc));

        let near = Predicate::within("location", GeoPoint::new(30.8, 121.61), Distance::km(2.0));
        assert!(near.is_satisfied_by(&doc));
        let far = Predicate::within("location", GeoPoint::new(31.21, 121.5), Distance::km(2.0));
        assert!(!far.is_satisfied_by(&doc));
    }

    #[test]
    fn test_violated_filters_skip_full_text() {
        let doc = hotel(1500, "上海", 30.8, 121.6);
        let criteria = Criteria::new()
            .and(Predicate::matches("name", "如家"))
            .and(Predicate::between("price", 0.0, 150.0));

        let violated: Vec<_> = criteria.violated_filters(&doc).collect();
        assert_eq!(violated.len(), 1);
        assert_eq!(violated[0].field(), "price");
    }

    #[test]
    fn test_predicate_serde_shape() {
        let p = Predicate::within("location", GeoPoint::new(31.21, 121.5), Distance::km(2.0));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["kind"], "geo_radius");
        assert_eq!(json["distance"], "2km");

        let back: Predicate = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
