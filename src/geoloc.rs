//! Device-location capability. The browser's geolocation API sits outside
//! this system; the server consumes whatever source the config wires in.

use crate::config::GeolocationConfig;
use crate::types::GeoPoint;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("Unable to get your location. Please enable location services.")]
    Denied,
    #[error("Geolocation is not supported in this environment.")]
    Unavailable,
}

pub trait LocationSource: Send {
    fn current(&self) -> Result<GeoPoint, GeolocationError>;
}

/// A fixed position, or a scripted failure, taken from config.
pub struct ConfiguredLocation {
    outcome: Result<GeoPoint, GeolocationError>,
}

impl ConfiguredLocation {
    pub fn from_config(config: &GeolocationConfig) -> Self {
        let outcome = if config.denied {
            Err(GeolocationError::Denied)
        } else {
            match (config.lat, config.lng) {
                (Some(lat), Some(lng)) => {
                    GeoPoint::new(lat, lng).map_err(|_| GeolocationError::Unavailable)
                }
                _ => Err(GeolocationError::Unavailable),
            }
        };
        ConfiguredLocation { outcome }
    }
}

impl LocationSource for ConfiguredLocation {
    fn current(&self) -> Result<GeoPoint, GeolocationError> {
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_comes_from_config() {
        let source = ConfiguredLocation::from_config(&GeolocationConfig {
            lat: Some(22.41),
            lng: Some(114.20),
            denied: false,
        });
        assert_eq!(source.current().unwrap(), GeoPoint::new(22.41, 114.20).unwrap());
    }

    #[test]
    fn denied_wins_over_position() {
        let source = ConfiguredLocation::from_config(&GeolocationConfig {
            lat: Some(22.41),
            lng: Some(114.20),
            denied: true,
        });
        assert_eq!(source.current(), Err(GeolocationError::Denied));
    }

    #[test]
    fn missing_position_is_unavailable() {
        let source = ConfiguredLocation::from_config(&GeolocationConfig::default());
        assert_eq!(source.current(), Err(GeolocationError::Unavailable));
    }
}
