//! Spherical geodesy: coordinates, great-circle projection, and cardinal probes.
//!
//! Everything here works on a sphere of radius 6,371 km. Good to well under a
//! metre for the ~100 m probe offsets used by the resolver.

use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const DEFAULT_PROBE_DISTANCE_M: f64 = 100.0;

const DEG: f64 = PI / 180.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Checked constructor. Returns `None` for non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self { lat, lng })
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Both components rounded to 7 decimal places.
    pub fn rounded(&self) -> Self {
        Self {
            lat: round_to(self.lat, 7),
            lng: round_to(self.lng, 7),
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.7}, {:.7}", self.lat, self.lng)
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Compass direction of a probe point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    pub fn bearing(self) -> f64 {
        match self {
            Self::North => 0.0,
            Self::East => 90.0,
            Self::South => 180.0,
            Self::West => 270.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::North => write!(f, "north"),
            Self::East => write!(f, "east"),
            Self::South => write!(f, "south"),
            Self::West => write!(f, "west"),
        }
    }
}

/// Four probe points around a center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardinalSet {
    pub north: GeoPoint,
    pub east: GeoPoint,
    pub south: GeoPoint,
    pub west: GeoPoint,
}

impl CardinalSet {
    pub fn get(&self, direction: Direction) -> GeoPoint {
        match direction {
            Direction::North => self.north,
            Direction::East => self.east,
            Direction::South => self.south,
            Direction::West => self.west,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, GeoPoint)> + '_ {
        Direction::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

/// Destination reached from `origin` after travelling `distance_m` metres
/// along the great circle with initial bearing `bearing_deg` (clockwise from north).
///
/// Longitude is normalized into (-180, 180].
pub fn destination(origin: GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let d = distance_m / EARTH_RADIUS_M;
    let phi1 = origin.lat * DEG;
    let lambda1 = origin.lng * DEG;
    let theta = bearing_deg * DEG;

    let phi2 = (phi1.sin() * d.cos() + phi1.cos() * d.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * d.sin() * phi1.cos()).atan2(d.cos() - phi1.sin() * phi2.sin());

    GeoPoint {
        lat: phi2 / DEG,
        lng: normalize_longitude(lambda2 / DEG),
    }
}

fn normalize_longitude(lng: f64) -> f64 {
    let wrapped = (lng + 540.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Probe points at bearings 0/90/180/270 from `center`.
pub fn cardinal_points(center: GeoPoint, distance_m: f64) -> CardinalSet {
    CardinalSet {
        north: destination(center, Direction::North.bearing(), distance_m),
        east: destination(center, Direction::East.bearing(), distance_m),
        south: destination(center, Direction::South.bearing(), distance_m),
        west: destination(center, Direction::West.bearing(), distance_m),
    }
}

/// Haversine great-circle distance in metres.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat * DEG;
    let phi2 = b.lat * DEG;
    let dphi = (b.lat - a.lat) * DEG;
    let dlambda = (b.lng - a.lng) * DEG;

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sf() -> GeoPoint {
        GeoPoint::new(37.7749, -122.4194).unwrap()
    }

    #[test]
    fn test_geopoint_rejects_out_of_range() {
        assert!(GeoPoint::new(90.0, 180.0).is_some());
        assert!(GeoPoint::new(-90.0, -180.0).is_some());
        assert!(GeoPoint::new(90.0001, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -180.5).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_zero_distance_is_identity() {
        let origin = sf();
        for bearing in [0.0, 45.0, 90.0, 213.0, 359.0] {
            let p = destination(origin, bearing, 0.0);
            assert_abs_diff_eq!(p.lat, origin.lat, epsilon = 1e-9);
            assert_abs_diff_eq!(p.lng, origin.lng, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_north_moves_latitude_only() {
        let p = destination(GeoPoint { lat: 0.0, lng: 0.0 }, 0.0, 111_194.93);
        // One degree of arc on a 6371 km sphere
        assert_abs_diff_eq!(p.lat, 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(p.lng, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cardinal_points_equidistant() {
        let center = sf();
        let set = cardinal_points(center, DEFAULT_PROBE_DISTANCE_M);
        for (direction, p) in set.iter() {
            let d = distance_m(center, p);
            assert_abs_diff_eq!(d, DEFAULT_PROBE_DISTANCE_M, epsilon = 1e-3);
            assert!(p.is_finite(), "{} probe not finite", direction);
        }
    }

    #[test]
    fn test_cardinal_points_directions() {
        let center = sf();
        let set = cardinal_points(center, 100.0);
        assert!(set.north.lat > center.lat);
        assert!(set.south.lat < center.lat);
        assert!(set.east.lng > center.lng);
        assert!(set.west.lng < center.lng);
        assert_abs_diff_eq!(set.north.lng, center.lng, epsilon = 1e-9);
    }

    #[test]
    fn test_longitude_wraps_across_antimeridian() {
        let origin = GeoPoint::new(0.0, 179.9995).unwrap();
        let p = destination(origin, 90.0, 200.0);
        assert!(p.lng < -179.0, "expected wrap, got {}", p.lng);
        assert!(p.lng > -180.0 && p.lng <= 180.0);
    }

    #[test]
    fn test_normalize_longitude() {
        assert_abs_diff_eq!(normalize_longitude(190.0), -170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(-190.0), 170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(45.0), 45.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(-540.0), 180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(180.0), 180.0, epsilon = 1e-12);
    }

    #[test]
    fn test_round_to_seven_places() {
        assert_eq!(round_to(37.774929512345, 7), 37.7749295);
        assert_eq!(round_to(-122.41941551, 7), -122.4194155);
    }

    #[test]
    fn test_display_seven_decimals() {
        let p = GeoPoint::new(40.0, -75.0).unwrap();
        assert_eq!(p.to_string(), "40.0000000, -75.0000000");
    }
}
