use serde::{Deserialize, Serialize};

/// A latitude/longitude pair. Serialized as a two-element `[lat, lng]` array
/// to match the persisted marker format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {} out of range [-90, 90]", lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(format!("longitude {} out of range [-180, 180]", lng));
        }
        Ok(GeoPoint { lat, lng })
    }

    /// Position formatted the way pin popups show it: 4 decimal places.
    pub fn display(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lng)
    }
}

impl TryFrom<[f64; 2]> for GeoPoint {
    type Error = String;
    fn try_from(pair: [f64; 2]) -> Result<Self, Self::Error> {
        GeoPoint::new(pair[0], pair[1])
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> [f64; 2] {
        [p.lat, p.lng]
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> geo::Point<f64> {
        // geo points are (x, y) = (lng, lat)
        geo::Point::new(p.lng, p.lat)
    }
}

/// A user-created pin. Never mutated after creation; the collection only
/// ever appends or clears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: u64,
    pub position: GeoPoint,
    pub name: String,
}

/// The point the map view is currently centered on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Focus {
    pub name: String,
    pub position: GeoPoint,
}

impl Focus {
    pub fn at(name: &str, position: GeoPoint) -> Self {
        Focus {
            name: name.to_string(),
            position,
        }
    }
}

impl From<&Marker> for Focus {
    fn from(m: &Marker) -> Focus {
        Focus {
            name: m.name.clone(),
            position: m.position,
        }
    }
}

/// What flavor of pin a point renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinKind {
    Default,
    Predefined,
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(-90.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 180.1).is_err());
        assert!(GeoPoint::new(22.41, 114.20).is_ok());
    }

    #[test]
    fn serializes_as_lat_lng_pair() {
        let p = GeoPoint::new(22.4130455, 114.2087379).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[22.4130455,114.2087379]");

        let back: GeoPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn marker_matches_persisted_shape() {
        let m = Marker {
            id: 1730000000000,
            position: GeoPoint::new(22.41, 114.20).unwrap(),
            name: "Marker 1".to_string(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["position"][0], 22.41);
        assert_eq!(json["position"][1], 114.20);
        assert_eq!(json["name"], "Marker 1");
    }

    #[test]
    fn display_rounds_to_four_places() {
        let p = GeoPoint::new(22.4130455, 114.2087379).unwrap();
        assert_eq!(p.display(), "22.4130, 114.2087");
    }
}
