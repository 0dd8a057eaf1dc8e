//! Geofence catalog: loading named polygons and locating points within them.

pub mod catalog;
pub mod locate;
pub mod types;

pub use catalog::{parse_catalog, CatalogSource};
pub use locate::{contains, find_containing, ring_area, smallest_containing};
pub use types::{Catalog, FenceSummary, Polygon};
