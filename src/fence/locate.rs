//! Containment and ranking: which polygons hold a point, and which is smallest.

use std::f64::consts::PI;

use tracing::trace;

use super::types::{Catalog, Polygon};
use crate::geodesy::{GeoPoint, EARTH_RADIUS_M};

const DEG: f64 = PI / 180.0;

/// Even-odd ray casting, treating (lat, lng) as planar coordinates.
///
/// Not valid across the antimeridian or near the poles.
pub fn contains(point: GeoPoint, ring: &[GeoPoint]) -> bool {
    if ring.is_empty() {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        // The straddle test guarantees a.lng != b.lng before the division.
        if (a.lng > point.lng) != (b.lng > point.lng) {
            let edge_lat = (b.lat - a.lat) * (point.lng - a.lng) / (b.lng - a.lng) + a.lat;
            if point.lat < edge_lat {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// All polygons containing `point`, in catalog order.
pub fn find_containing(point: GeoPoint, catalog: &Catalog) -> Vec<&Polygon> {
    catalog.iter().filter(|p| contains(point, &p.ring)).collect()
}

/// Approximate spherical area of a ring in square metres.
pub fn ring_area(ring: &[GeoPoint]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        let (phi1, phi2) = (a.lat * DEG, b.lat * DEG);
        let (lambda1, lambda2) = (a.lng * DEG, b.lng * DEG);
        sum += (lambda2 - lambda1) * (2.0 + phi1.sin() + phi2.sin());
    }

    (sum * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0).abs()
}

/// The smallest polygon containing `point`. Equal areas keep the earlier entry.
pub fn smallest_containing(point: GeoPoint, catalog: &Catalog) -> Option<&Polygon> {
    let candidates = find_containing(point, catalog);
    trace!("{} candidate fences contain {}", candidates.len(), point);

    match candidates.as_slice() {
        [] => None,
        [only] => Some(*only),
        _ => {
            let mut best: Option<(&Polygon, f64)> = None;
            for candidate in candidates.iter().copied() {
                let area = candidate.area();
                match best {
                    Some((_, best_area)) if area >= best_area => {}
                    _ => best = Some((candidate, area)),
                }
            }
            best.map(|(p, _)| p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pt(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    fn square(id: &str, lat0: f64, lng0: f64, size: f64) -> Polygon {
        Polygon {
            id: id.into(),
            name: format!("Fence {}", id),
            ring: vec![
                pt(lat0, lng0),
                pt(lat0, lng0 + size),
                pt(lat0 + size, lng0 + size),
                pt(lat0 + size, lng0),
            ],
        }
    }

    fn unit_ring() -> Vec<GeoPoint> {
        vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0), pt(1.0, 0.0)]
    }

    #[test]
    fn test_unit_square_containment() {
        let ring = unit_ring();
        assert!(contains(pt(0.5, 0.5), &ring));
        assert!(!contains(pt(2.0, 2.0), &ring));
        assert!(!contains(pt(-0.5, 0.5), &ring));
        assert!(!contains(pt(0.5, 1.5), &ring));
    }

    #[test]
    fn test_empty_ring_contains_nothing() {
        assert!(!contains(pt(0.0, 0.0), &[]));
    }

    #[test]
    fn test_concave_ring() {
        // U shape opening north
        let ring = vec![
            pt(0.0, 0.0),
            pt(0.0, 3.0),
            pt(3.0, 3.0),
            pt(3.0, 2.0),
            pt(1.0, 2.0),
            pt(1.0, 1.0),
            pt(3.0, 1.0),
            pt(3.0, 0.0),
        ];
        assert!(contains(pt(2.0, 0.5), &ring));
        assert!(contains(pt(2.0, 2.5), &ring));
        assert!(!contains(pt(2.0, 1.5), &ring));
        assert!(contains(pt(0.5, 1.5), &ring));
    }

    #[test]
    fn test_constant_longitude_edges_do_not_divide() {
        // Probes sharing a longitude with the constant-longitude edges.
        let ring = unit_ring();
        assert!(contains(pt(0.5, 0.0), &ring));
        assert!(!contains(pt(0.5, 1.0), &ring));
        assert!(!contains(pt(5.0, 1.0), &ring));
    }

    #[test]
    fn test_area_rotation_and_winding_invariant() {
        let ring = unit_ring();
        let base = ring_area(&ring);
        assert!(base > 0.0);

        for shift in 1..ring.len() {
            let mut rotated = ring.clone();
            rotated.rotate_left(shift);
            assert_relative_eq!(ring_area(&rotated), base, max_relative = 1e-9);
        }

        let mut reversed = ring.clone();
        reversed.reverse();
        assert_relative_eq!(ring_area(&reversed), base, max_relative = 1e-9);
    }

    #[test]
    fn test_area_of_one_degree_square_near_equator() {
        // About 111.2 km on a side
        let area = ring_area(&unit_ring());
        assert_relative_eq!(area, 1.2364e10, max_relative = 0.01);
    }

    #[test]
    fn test_area_degenerate_ring() {
        assert_eq!(ring_area(&[]), 0.0);
        assert_eq!(ring_area(&[pt(0.0, 0.0), pt(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn test_empty_catalog_finds_nothing() {
        let catalog = Catalog::default();
        assert!(smallest_containing(pt(10.0, 10.0), &catalog).is_none());
        assert!(find_containing(pt(10.0, 10.0), &catalog).is_empty());
    }

    #[test]
    fn test_find_containing_preserves_order() {
        let catalog = Catalog::new(vec![
            square("big", 0.0, 0.0, 10.0),
            square("far", 50.0, 50.0, 1.0),
            square("small", 4.0, 4.0, 1.0),
        ]);
        let hits: Vec<&str> = find_containing(pt(4.5, 4.5), &catalog)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(hits, vec!["big", "small"]);
    }

    #[test]
    fn test_smallest_containing_prefers_nested() {
        let catalog = Catalog::new(vec![
            square("big", 0.0, 0.0, 10.0),
            square("small", 4.0, 4.0, 1.0),
        ]);
        let hit = smallest_containing(pt(4.5, 4.5), &catalog).unwrap();
        assert_eq!(hit.id, "small");

        let hit = smallest_containing(pt(8.0, 8.0), &catalog).unwrap();
        assert_eq!(hit.id, "big");
    }

    #[test]
    fn test_smallest_containing_order_independent_for_nested() {
        let catalog = Catalog::new(vec![
            square("small", 4.0, 4.0, 1.0),
            square("big", 0.0, 0.0, 10.0),
        ]);
        assert_eq!(smallest_containing(pt(4.5, 4.5), &catalog).unwrap().id, "small");
    }

    #[test]
    fn test_equal_area_keeps_first() {
        let catalog = Catalog::new(vec![
            square("first", 0.0, 0.0, 2.0),
            square("second", 0.0, 0.0, 2.0),
        ]);
        assert_eq!(smallest_containing(pt(1.0, 1.0), &catalog).unwrap().id, "first");
    }
}
