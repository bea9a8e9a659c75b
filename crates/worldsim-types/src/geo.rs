//! Geographic coordinates and great-circle distance.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rejected coordinate input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    /// Latitude outside `[-90, 90]` or not finite.
    #[error("latitude {lat} is outside [-90, 90]")]
    Latitude {
        /// The offending latitude.
        lat: f64,
    },

    /// Longitude outside `[-180, 180]` or not finite.
    #[error("longitude {lng} is outside [-180, 180]")]
    Longitude {
        /// The offending longitude.
        lng: f64,
    },
}

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinates {
    /// Latitude, `-90..=90`.
    pub lat: f64,
    /// Longitude, `-180..=180`.
    pub lng: f64,
}

impl Coordinates {
    /// Build validated coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if either component is out of range or
    /// not a finite number.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::Latitude { lat });
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinateError::Longitude { lng });
        }
        Ok(Self { lat, lng })
    }

    /// Re-check the range invariants of a deserialized value.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if either component is out of range.
    pub fn validated(self) -> Result<Self, CoordinateError> {
        Self::new(self.lat, self.lng)
    }

    /// Great-circle distance to `other` in kilometres (haversine).
    pub fn distance_km(&self, other: &Self) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let lat_term = (d_lat / 2.0).sin().powi(2);
        let lng_term = lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        let a = lat_term + lng_term;
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_KM * c
    }

    /// Point a `fraction` of the way from `self` to `other`.
    ///
    /// Linear in degrees, which is accurate enough for the theatre-scale
    /// distances units travel. `fraction` is clamped to `[0, 1]`.
    pub fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        let t = fraction.clamp(0.0, 1.0);
        Self {
            lat: (other.lat - self.lat).mul_add(t, self.lat),
            lng: (other.lng - self.lng).mul_add(t, self.lng),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = Coordinates::new(31.0, 35.0).unwrap();
        assert!(p.distance_km(&p).abs() < 1e-9);
    }

    #[test]
    fn known_distance_is_close() {
        // London to Paris is roughly 344 km.
        let london = Coordinates::new(51.5074, -0.1278).unwrap();
        let paris = Coordinates::new(48.8566, 2.3522).unwrap();
        let d = london.distance_km(&paris);
        assert!((d - 343.5).abs() < 2.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinates::new(31.0, 35.0).unwrap();
        let b = Coordinates::new(32.0, 34.5).unwrap();
        assert!((a.distance_km(&b) - b.distance_km(&a)).abs() < 1e-9);
        assert!((a.distance_km(&b) - 120.9).abs() < 1.0);
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn interpolate_midpoint() {
        let a = Coordinates::new(10.0, 20.0).unwrap();
        let b = Coordinates::new(20.0, 40.0).unwrap();
        let mid = a.interpolate(&b, 0.5);
        assert!((mid.lat - 15.0).abs() < 1e-9);
        assert!((mid.lng - 30.0).abs() < 1e-9);
        let end = a.interpolate(&b, 3.0);
        assert!((end.lat - 20.0).abs() < 1e-9);
    }
}
