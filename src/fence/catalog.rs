//! Tab-separated polygon catalog loader.
//!
//! Rows look like either of:
//!
//! ```text
//! id<TAB>name<TAB>(lng, lat),(lng, lat),(lng, lat)[<TAB>extra]
//! id<TAB>name<TAB>lat<TAB>lng<TAB>lat<TAB>lng<TAB>...
//! ```
//!
//! Malformed rows are skipped, never reported. An unusable dataset is just an
//! empty catalog.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use super::types::{Catalog, Polygon};
use crate::geodesy::GeoPoint;

const BUILTIN_DATASET: &str = include_str!("../../data/polygons.tsv");
const MIN_VERTICES: usize = 3;

/// Where the raw catalog text comes from. File sources are re-read on every load.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Builtin,
    Inline(String),
    File(PathBuf),
}

impl CatalogSource {
    /// `~/.geofence/polygons.tsv` if present, otherwise the built-in dataset.
    pub fn discover() -> Self {
        let path = Self::default_path();
        if path.is_file() {
            Self::File(path)
        } else {
            Self::Builtin
        }
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".geofence")
            .join("polygons.tsv")
    }

    pub fn read(&self) -> io::Result<String> {
        match self {
            Self::Builtin => Ok(BUILTIN_DATASET.to_string()),
            Self::Inline(text) => Ok(text.clone()),
            Self::File(path) => fs::read_to_string(path),
        }
    }

    /// Read and parse in one step.
    pub fn load(&self) -> io::Result<Catalog> {
        let text = self.read()?;
        let catalog = parse_catalog(&text);
        debug!("Loaded {} fences from {}", catalog.len(), self.describe());
        Ok(catalog)
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Builtin => "built-in dataset".into(),
            Self::Inline(_) => "inline text".into(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Parse the raw catalog text. Never fails.
pub fn parse_catalog(text: &str) -> Catalog {
    let lines: Vec<&str> = text.trim().split('\n').collect();
    let Some(first) = lines.first() else {
        return Catalog::default();
    };

    let header = first.to_lowercase();
    let start = if header.contains("id") || header.contains("city") { 1 } else { 0 };

    let mut polygons = Vec::new();
    for (index, raw) in lines.iter().enumerate().skip(start) {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match parse_row(line) {
            Ok(polygon) => polygons.push(polygon),
            Err(reason) => debug!("Skipping catalog line {}: {}", index + 1, reason),
        }
    }

    Catalog::new(polygons)
}

fn parse_row(line: &str) -> Result<Polygon, &'static str> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() < 3 {
        return Err("fewer than 3 fields");
    }

    let id = fields[0].to_string();
    let name = fields[1].to_string();

    let last = fields[fields.len() - 1];
    let second_last = fields[fields.len() - 2];
    let ring = if is_parenthesized(last) {
        parse_pair_list(last)
    } else if is_parenthesized(second_last) {
        parse_pair_list(second_last)
    } else {
        parse_flat_columns(&fields[2..])
    };

    if ring.len() < MIN_VERTICES {
        return Err("ring has fewer than 3 vertices");
    }

    Ok(Polygon { id, name, ring })
}

fn is_parenthesized(field: &str) -> bool {
    field.contains('(') && field.contains(')')
}

/// `(lng, lat),(lng, lat),...` reordered to (lat, lng). Bad pairs are dropped individually.
fn parse_pair_list(field: &str) -> Vec<GeoPoint> {
    field
        .split("),")
        .filter_map(|pair| {
            let cleaned: String = pair.chars().filter(|c| *c != '(' && *c != ')').collect();
            let mut parts = cleaned.split(',');
            let lng = parse_number(parts.next()?)?;
            let lat = parse_number(parts.next()?)?;
            Some(GeoPoint { lat, lng })
        })
        .collect()
}

/// `lat, lng, lat, lng, ...` columns. The first unparsable pair ends the ring.
fn parse_flat_columns(fields: &[&str]) -> Vec<GeoPoint> {
    let mut ring = Vec::new();
    for pair in fields.chunks_exact(2) {
        match (parse_number(pair[0]), parse_number(pair[1])) {
            (Some(lat), Some(lng)) => ring.push(GeoPoint { lat, lng }),
            _ => break,
        }
    }
    ring
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parenthesized_row_reorders_to_lat_lng() {
        let catalog = parse_catalog("A\tAlpha\t(0,0),(0,1),(1,1)");
        assert_eq!(catalog.len(), 1);
        let polygon = &catalog.polygons()[0];
        assert_eq!(polygon.id, "A");
        assert_eq!(polygon.name, "Alpha");
        assert_eq!(
            polygon.ring,
            vec![
                GeoPoint { lat: 0.0, lng: 0.0 },
                GeoPoint { lat: 1.0, lng: 0.0 },
                GeoPoint { lat: 1.0, lng: 1.0 },
            ]
        );
    }

    #[test]
    fn test_two_pairs_is_dropped() {
        let catalog = parse_catalog("A\tAlpha\t(0,0),(0,1)");
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_header_skipped_when_marked() {
        let text = "ID\tCity Name\tBoundary\nA\tAlpha\t(0,0),(0,1),(1,1)";
        assert_eq!(parse_catalog(text).len(), 1);

        let text = "City\tName\tWKT\nB\tBeta\t(0,0),(0,1),(1,1)";
        assert_eq!(parse_catalog(text).len(), 1);
    }

    #[test]
    fn test_first_row_kept_without_header_marker() {
        let text = "A\tAlpha\t(0,0),(0,1),(1,1)\nB\tBeta\t(5,5),(5,6),(6,6)";
        let catalog = parse_catalog(text);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.polygons()[0].name, "Alpha");
    }

    #[test]
    fn test_header_marker_matches_case_insensitively_and_loosely() {
        // "Idaho" contains "id", so the first data row is taken as a header.
        let text = "X\tIdaho\t(0,0),(0,1),(1,1)\nB\tBeta\t(5,5),(5,6),(6,6)";
        let catalog = parse_catalog(text);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.polygons()[0].id, "B");
    }

    #[test]
    fn test_pair_field_in_second_to_last_column() {
        let text = "A\tAlpha\t(10, 20),(11, 20),(11, 21)\tnotes";
        let catalog = parse_catalog(text);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.polygons()[0].ring[0], GeoPoint { lat: 20.0, lng: 10.0 });
    }

    #[test]
    fn test_bad_pair_dropped_individually() {
        let text = "A\tAlpha\t(0,0),(x,1),(0,1),(1,1)";
        let catalog = parse_catalog(text);
        assert_eq!(catalog.polygons()[0].ring.len(), 3);
    }

    #[test]
    fn test_flat_columns() {
        let text = "A\tAlpha\t1.0\t2.0\t3.0\t4.0\t5.0\t6.0";
        let catalog = parse_catalog(text);
        assert_eq!(
            catalog.polygons()[0].ring,
            vec![
                GeoPoint { lat: 1.0, lng: 2.0 },
                GeoPoint { lat: 3.0, lng: 4.0 },
                GeoPoint { lat: 5.0, lng: 6.0 },
            ]
        );
    }

    #[test]
    fn test_flat_columns_stop_at_bad_pair() {
        let text = "A\tAlpha\t1\t2\t3\t4\tbad\t6\t7\t8";
        assert!(parse_catalog(text).is_empty());

        let text = "A\tAlpha\t1\t2\t3\t4\t5\t6\tbad\t8";
        assert_eq!(parse_catalog(text).polygons()[0].ring.len(), 3);
    }

    #[test]
    fn test_short_rows_and_blanks_skipped() {
        let text = "A\tAlpha\n\n   \nB\tBeta\t(0,0),(0,1),(1,1)\nC";
        let catalog = parse_catalog(text);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.polygons()[0].id, "B");
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert!(parse_catalog("").is_empty());
        assert!(parse_catalog("\n\n").is_empty());
        assert!(parse_catalog("lorem ipsum\tdolor\tsit amet").is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let row = "A\tAlpha\t(0,0),(0,1),(1,1)";
        let text = format!("{}\n{}", row, row);
        assert_eq!(parse_catalog(&text).len(), 2);
    }

    #[test]
    fn test_builtin_dataset_parses() {
        let catalog = CatalogSource::Builtin.load().unwrap();
        assert!(!catalog.is_empty());
        assert!(catalog.iter().all(|p| p.ring.len() >= 3));
    }

    #[test]
    fn test_file_source_reads_fresh() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id\tname\tboundary").unwrap();
        writeln!(file, "Z\tZeta\t(0,0),(0,1),(1,1),(1,0)").unwrap();
        file.flush().unwrap();

        let source = CatalogSource::File(file.path().to_path_buf());
        assert_eq!(source.load().unwrap().len(), 1);

        writeln!(file, "Y\tYpsilon\t(2,2),(2,3),(3,3)").unwrap();
        file.flush().unwrap();
        assert_eq!(source.load().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = CatalogSource::File(dir.path().join("absent.tsv"));
        assert!(source.load().is_err());
    }
}
