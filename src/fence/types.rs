//! Core types for the geofence catalog.

use serde::Serialize;

use crate::geodesy::GeoPoint;

/// A named geofence. The ring is implicitly closed (last vertex joins the first).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    pub id: String,
    pub name: String,
    pub ring: Vec<GeoPoint>,
}

impl Polygon {
    /// Approximate surface area in square metres. Only meaningful for ranking.
    pub fn area(&self) -> f64 {
        super::locate::ring_area(&self.ring)
    }
}

/// An ordered, non-deduplicated set of polygons loaded for one resolution.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    polygons: Vec<Polygon>,
}

impl Catalog {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Polygon> {
        self.polygons.iter()
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Summary rows for listing endpoints.
    pub fn summaries(&self) -> Vec<FenceSummary> {
        self.polygons
            .iter()
            .map(|p| FenceSummary {
                id: p.id.clone(),
                name: p.name.clone(),
                vertices: p.ring.len(),
                area_m2: p.area().round(),
            })
            .collect()
    }
}

/// Lightweight description of a catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct FenceSummary {
    pub id: String,
    pub name: String,
    pub vertices: usize,
    pub area_m2: f64,
}
