//! Great-circle distance and radius filtering.

use super::errors::DomainError;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, DomainError> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        if !valid {
            return Err(DomainError::InvalidCoordinate { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

/// Anything that may carry a position.
pub trait Located {
    fn location(&self) -> Option<Coordinate>;
}

impl Located for Coordinate {
    fn location(&self) -> Option<Coordinate> {
        Some(*self)
    }
}

/// Haversine distance in kilometers.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Keeps the candidates whose location is within `radius_km` of `origin`
/// (inclusive). Input order is preserved; candidates without a location are
/// dropped.
pub fn within_radius<T, I>(origin: Coordinate, candidates: I, radius_km: f64) -> Vec<T>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    candidates
        .into_iter()
        .filter(|c| {
            c.location()
                .is_some_and(|loc| distance_km(origin, loc) <= radius_km)
        })
        .collect()
}

/// Rejects radii that cannot bound a search.
pub fn validate_radius(radius_km: f64) -> Result<f64, DomainError> {
    if radius_km.is_finite() && radius_km > 0.0 {
        Ok(radius_km)
    } else {
        Err(DomainError::InvalidRadius(radius_km))
    }
}

/// Human-readable distance: meters below 1 km, otherwise km to one decimal.
pub fn format_distance(km: f64) -> String {
    let meters = (km * 1000.0).round();
    if meters < 1000.0 {
        format!("{} m", meters as i64)
    } else {
        format!("{:.1} km", km)
    }
}
