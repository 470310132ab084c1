use serde::{Deserialize, Serialize};

/// An angle in degrees
pub type Degrees = f64;

/// Mean radius of the earth used for great-circle distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, specta::Type)]
/// Some point on the globe, in degrees
pub struct Coordinate {
    /// Latitude, -90 to 90
    pub latitude: Degrees,
    /// Longitude, -180 to 180
    pub longitude: Degrees,
}

impl Coordinate {
    pub const fn new(latitude: Degrees, longitude: Degrees) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and within their ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn bearing_to(&self, other: &Coordinate) -> Degrees {
        bearing(*self, *other)
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance(*self, *other)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Wrap any angle into `[0, 360)`
pub fn wrap_360(degrees: Degrees) -> Degrees {
    // fmod keeps the result strictly below 360, rem_euclid can round up to it
    ((degrees % 360.0) + 360.0) % 360.0
}

/// Initial great-circle bearing from `from` to `to`, in `[0, 360)` with 0 being north.
///
/// Identical points give a bearing of 0.
pub fn bearing(from: Coordinate, to: Coordinate) -> Degrees {
    let lat_from = from.latitude.to_radians();
    let lat_to = to.latitude.to_radians();
    let d_long = (to.longitude - from.longitude).to_radians();

    let y = d_long.sin() * lat_to.cos();
    let x = lat_from.cos() * lat_to.sin() - lat_from.sin() * lat_to.cos() * d_long.cos();

    // atan2(0, 0) is 0, so coincident points never produce NaN
    wrap_360(y.atan2(x).to_degrees())
}

/// Haversine great-circle distance between two points in kilometers
pub fn distance(from: Coordinate, to: Coordinate) -> f64 {
    let lat_from = from.latitude.to_radians();
    let lat_to = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_long = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat_from.cos() * lat_to.cos() * (d_long / 2.0).sin().powi(2);
    // Rounding can push `a` a hair outside [0, 1] for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
