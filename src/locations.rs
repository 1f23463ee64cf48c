//! The fixed points of interest shipped with the map. Not persisted, always
//! shown alongside user markers.

use crate::types::{Focus, GeoPoint};

pub struct PredefinedLocation {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

/// Where the map opens, and where Focus falls back to.
pub const DEFAULT_LOCATION: PredefinedLocation = PredefinedLocation {
    name: "Chung Chi Gate",
    lat: 22.4130455,
    lng: 114.2087379,
};

pub const PREDEFINED: [PredefinedLocation; 3] = [
    PredefinedLocation {
        name: "Fusion (CUHK)",
        lat: 22.4181318,
        lng: 114.2046143,
    },
    PredefinedLocation {
        name: "Fusion (Science Park)",
        lat: 22.4270461,
        lng: 114.2091983,
    },
    PredefinedLocation {
        name: "Fusion (Fotan)",
        lat: 22.3997618,
        lng: 114.2019665,
    },
];

impl PredefinedLocation {
    pub fn position(&self) -> GeoPoint {
        // Coordinates above are compile-time constants inside valid range.
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }

    pub fn focus(&self) -> Focus {
        Focus::at(self.name, self.position())
    }
}

/// Look up a predefined location (including the default) by its exact name.
pub fn find(name: &str) -> Option<&'static PredefinedLocation> {
    if DEFAULT_LOCATION.name == name {
        return Some(&DEFAULT_LOCATION);
    }
    PREDEFINED.iter().find(|loc| loc.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_locations_are_in_range() {
        for loc in PREDEFINED.iter().chain(std::iter::once(&DEFAULT_LOCATION)) {
            assert!(GeoPoint::new(loc.lat, loc.lng).is_ok(), "{}", loc.name);
        }
    }

    #[test]
    fn find_covers_default_and_shops() {
        assert_eq!(find("Chung Chi Gate").unwrap().lat, 22.4130455);
        let cuhk = find("Fusion (CUHK)").unwrap();
        assert_eq!(cuhk.position(), GeoPoint::new(22.4181318, 114.2046143).unwrap());
        assert!(find("nowhere").is_none());
    }
}
