use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Geographic position in degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl Point {
    /// Great-circle distance in meters, spherical law of cosines.
    pub fn distance(&self, other: &Self) -> f64 {
        let lat_lhs = self.latitude.to_radians();
        let lat_rhs = other.latitude.to_radians();
        let lon_delta = (self.longitude - other.longitude).abs().to_radians();
        let cos_arc = lat_lhs.sin() * lat_rhs.sin() + lat_lhs.cos() * lat_rhs.cos() * lon_delta.cos();
        // Rounding can push the cosine a hair outside [-1, 1] for near-identical points
        cos_arc.clamp(-1.0, 1.0).acos() * EARTH_RADIUS
    }
}

#[test]
fn distance_test() {
    let tolstopaltsevo = Point {
        latitude: 55.611087,
        longitude: 37.20829,
    };
    let marushkino = Point {
        latitude: 55.595884,
        longitude: 37.209755,
    };
    let d = tolstopaltsevo.distance(&marushkino);
    assert!((d - 1693.0).abs() < 5.0, "unexpected distance {d}");
}

#[test]
fn distance_zero_test() {
    let point = Point {
        latitude: 55.574371,
        longitude: 37.6517,
    };
    assert_eq!(point.distance(&point), 0.0);
}

#[test]
fn distance_symmetry_test() {
    let a = Point {
        latitude: 43.587795,
        longitude: 39.716901,
    };
    let b = Point {
        latitude: 43.581969,
        longitude: 39.719848,
    };
    assert_eq!(a.distance(&b), b.distance(&a));
}
