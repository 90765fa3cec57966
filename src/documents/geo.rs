//! Geographic points as stored in a `geo_point` field

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographical point with latitude and longitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Haversine distance to another point in kilometers
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }

    /// Whether this point lies inside the rectangle spanned by two corners.
    /// A top-left longitude east of the bottom-right one wraps across the antimeridian.
    pub fn within_box(&self, top_left: &GeoPoint, bottom_right: &GeoPoint) -> bool {
        let lat_ok = self.lat <= top_left.lat && self.lat >= bottom_right.lat;
        let lon_ok = if top_left.lon <= bottom_right.lon {
            self.lon >= top_left.lon && self.lon <= bottom_right.lon
        } else {
            self.lon >= top_left.lon || self.lon <= bottom_right.lon
        };
        lat_ok && lon_ok
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// The shapes an engine accepts for a geo_point
#[derive(Deserialize)]
#[serde(untagged)]
enum GeoPointRepr {
    Object { lat: f64, lon: f64 },
    /// "lat, lon"
    Text(String),
    /// [lon, lat]
    Array([f64; 2]),
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let point = match GeoPointRepr::deserialize(deserializer)? {
            GeoPointRepr::Object { lat, lon } => GeoPoint::new(lat, lon),
            GeoPointRepr::Array([lon, lat]) => GeoPoint::new(lat, lon),
            GeoPointRepr::Text(text) => {
                let (lat, lon) = text
                    .split_once(',')
                    .ok_or_else(|| de::Error::custom(format!("invalid geo point '{}'", text)))?;
                let lat = lat.trim().parse::<f64>().map_err(de::Error::custom)?;
                let lon = lon.trim().parse::<f64>().map_err(de::Error::custom)?;
                GeoPoint::new(lat, lon)
            }
        };

        if !point.is_valid() {
            return Err(de::Error::custom(format!(
                "geo point out of range: {}",
                point
            )));
        }
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_all_shapes() {
        let from_text: GeoPoint = serde_json::from_str("\"31.21, 121.5\"").unwrap();
        let from_object: GeoPoint = serde_json::from_str(r#"{"lat":31.21,"lon":121.5}"#).unwrap();
        let from_array: GeoPoint = serde_json::from_str("[121.5, 31.21]").unwrap();

        assert_eq!(from_text, GeoPoint::new(31.21, 121.5));
        assert_eq!(from_object, from_text);
        assert_eq!(from_array, from_text);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<GeoPoint>("\"shanghai\"").is_err());
        assert!(serde_json::from_str::<GeoPoint>(r#"{"lat":95.0,"lon":0.0}"#).is_err());
    }

    #[test]
    fn test_distance() {
        let bund = GeoPoint::new(31.2400, 121.4900);
        let lujiazui = GeoPoint::new(31.2397, 121.4998);
        let d = bund.distance_km(&lujiazui);
        assert!(d > 0.8 && d < 1.1, "distance was {}", d);
        assert_eq!(bund.distance_km(&bund), 0.0);
    }

    #[test]
    fn test_within_box() {
        let top_left = GeoPoint::new(31.1, 121.5);
        let bottom_right = GeoPoint::new(30.5, 121.7);
        assert!(GeoPoint::new(30.8, 121.6).within_box(&top_left, &bottom_right));
        assert!(!GeoPoint::new(31.2, 121.6).within_box(&top_left, &bottom_right));
        assert!(!GeoPoint::new(30.8, 121.8).within_box(&top_left, &bottom_right));

        let wrap_tl = GeoPoint::new(10.0, 170.0);
        let wrap_br = GeoPoint::new(-10.0, -170.0);
        assert!(GeoPoint::new(0.0, 179.0).within_box(&wrap_tl, &wrap_br));
        assert!(GeoPoint::new(0.0, -175.0).within_box(&wrap_tl, &wrap_br));
        assert!(!GeoPoint::new(0.0, 0.0).within_box(&wrap_tl, &wrap_br));
    }
}
