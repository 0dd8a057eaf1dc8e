//! Geofence resolution: point or address in, five fence names out.
//!
//! Each call loads its own catalog and runs its own geocoding lookups, so
//! concurrent resolutions share nothing mutable.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::fence::{smallest_containing, Catalog, CatalogSource};
use crate::geocoding::{AddressResolver, GeocodingProvider};
use crate::geodesy::{cardinal_points, Direction, GeoPoint, DEFAULT_PROBE_DISTANCE_M};

/// Reported in place of a fence name when nothing contains the point.
pub const NO_FENCE: &str = "None";

const MISSING_INPUT: &str = "Missing required parameter: provide 'address' or both 'lat' and 'lng'";
const AMBIGUOUS_INPUT: &str = "Provide either 'address' or both 'lat' and 'lng', not both";
const INVALID_NUMBERS: &str = "Invalid lat/lng values";
const OUT_OF_RANGE: &str = "Coordinates out of valid range";

/// Resolution failures, as reported to callers.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Bad, missing, or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// The geocoding chain was exhausted; carries its message verbatim.
    #[error("{0}")]
    Geocoding(String),

    /// Anything else. The detail is logged, never shown.
    #[error("Internal server error")]
    Internal(String),
}

impl ResolveError {
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Raw boundary input. Values stay textual so both query strings and numbers fit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolutionRequest {
    pub address: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
}

impl ResolutionRequest {
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    pub fn coordinates(lat: impl ToString, lng: impl ToString) -> Self {
        Self {
            address: None,
            lat: Some(lat.to_string()),
            lng: Some(lng.to_string()),
        }
    }

    fn validate(&self) -> Result<LocationQuery, ResolveError> {
        let address = provided(&self.address);
        let coords = provided(&self.lat).zip(provided(&self.lng));

        match (address, coords) {
            (Some(_), Some(_)) => Err(ResolveError::Validation(AMBIGUOUS_INPUT.into())),
            (None, None) => Err(ResolveError::Validation(MISSING_INPUT.into())),
            (Some(address), None) => Ok(LocationQuery::Address(address.to_string())),
            (None, Some((lat, lng))) => parse_point(lat, lng).map(LocationQuery::Point),
        }
    }
}

/// Empty strings count as absent.
fn provided(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn parse_point(lat: &str, lng: &str) -> Result<GeoPoint, ResolveError> {
    let parse = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
    let (Some(lat), Some(lng)) = (parse(lat), parse(lng)) else {
        return Err(ResolveError::Validation(INVALID_NUMBERS.into()));
    };
    GeoPoint::new(lat, lng).ok_or_else(|| ResolveError::Validation(OUT_OF_RANGE.into()))
}

enum LocationQuery {
    Address(String),
    Point(GeoPoint),
}

/// Tunables for a resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionOptions {
    /// Offset of the four cardinal probes from the center, in metres.
    pub probe_distance_m: f64,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            probe_distance_m: DEFAULT_PROBE_DISTANCE_M,
        }
    }
}

/// The fences around one point.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub center: GeoPoint,
    pub polygon: String,
    pub north: String,
    pub south: String,
    pub east: String,
    pub west: String,
    pub formatted_address: Option<String>,
}

impl ResolutionResult {
    pub fn neighbour(&self, direction: Direction) -> &str {
        match direction {
            Direction::North => &self.north,
            Direction::South => &self.south,
            Direction::East => &self.east,
            Direction::West => &self.west,
        }
    }
}

// ─── Wire format ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoData {
    pub lat: String,
    pub lon: String,
    pub polygon: String,
    pub polygon_north: String,
    pub polygon_south: String,
    pub polygon_east: String,
    pub polygon_west: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
}

impl From<&ResolutionResult> for GeoData {
    fn from(r: &ResolutionResult) -> Self {
        Self {
            lat: format!("{:.7}", r.center.lat),
            lon: format!("{:.7}", r.center.lng),
            polygon: r.polygon.clone(),
            polygon_north: r.north.clone(),
            polygon_south: r.south.clone(),
            polygon_east: r.east.clone(),
            polygon_west: r.west.clone(),
            formatted_address: r.formatted_address.clone(),
        }
    }
}

/// `{ success, data }` or `{ success, error }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<GeoData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn from_result(result: &Result<ResolutionResult, ResolveError>) -> Self {
        match result {
            Ok(r) => Self {
                success: true,
                data: Some(GeoData::from(r)),
                error: None,
            },
            Err(e) => Self {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

// ─── Orchestrator ────────────────────────────────────────────────

/// Resolves requests against a catalog source and a geocoding provider.
pub struct GeofenceLocator<P> {
    catalog: CatalogSource,
    geocoder: AddressResolver<P>,
    options: ResolutionOptions,
}

impl<P: GeocodingProvider> GeofenceLocator<P> {
    pub fn new(catalog: CatalogSource, provider: P, options: ResolutionOptions) -> Self {
        Self {
            catalog,
            geocoder: AddressResolver::new(provider),
            options,
        }
    }

    /// Resolve one request, converting even a panic into `ResolveError::Internal`.
    pub fn resolve(&self, request: &ResolutionRequest) -> Result<ResolutionResult, ResolveError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.resolve_inner(request)))
            .unwrap_or_else(|_| Err(ResolveError::Internal("resolution panicked".into())));

        if let Err(ResolveError::Internal(detail)) = &outcome {
            error!("Resolution failed: {}", detail);
        }
        outcome
    }

    fn resolve_inner(&self, request: &ResolutionRequest) -> Result<ResolutionResult, ResolveError> {
        let (center, formatted_address) = match request.validate()? {
            LocationQuery::Point(point) => (point, None),
            LocationQuery::Address(address) => {
                let hit = self
                    .geocoder
                    .resolve(&address)
                    .into_result()
                    .map_err(ResolveError::Geocoding)?;
                let formatted = Some(hit.formatted_address).filter(|s| !s.is_empty());
                (hit.point, formatted)
            }
        };

        let catalog = self.load_catalog()?;
        let mut result = self.locate(center, &catalog)?;
        result.formatted_address = formatted_address;

        info!(
            "{} -> {} [N: {}, S: {}, E: {}, W: {}]",
            center, result.polygon, result.north, result.south, result.east, result.west
        );
        Ok(result)
    }

    /// Load a fresh catalog from the configured source.
    pub fn load_catalog(&self) -> Result<Catalog, ResolveError> {
        self.catalog.load().map_err(|e| {
            ResolveError::Internal(format!(
                "cannot read catalog from {}: {}",
                self.catalog.describe(),
                e
            ))
        })
    }

    /// Smallest fence for `center` and for each cardinal probe around it.
    pub fn locate(
        &self,
        center: GeoPoint,
        catalog: &Catalog,
    ) -> Result<ResolutionResult, ResolveError> {
        let probes = cardinal_points(center, self.options.probe_distance_m);
        if let Some((direction, _)) = probes.iter().find(|(_, p)| !p.is_finite()) {
            return Err(ResolveError::Internal(format!(
                "{} probe from {} is not finite",
                direction, center
            )));
        }

        let name_at = |point: GeoPoint| {
            smallest_containing(point, catalog)
                .map(|fence| fence.name.clone())
                .unwrap_or_else(|| NO_FENCE.to_string())
        };

        Ok(ResolutionResult {
            center,
            polygon: name_at(center),
            north: name_at(probes.north),
            south: name_at(probes.south),
            east: name_at(probes.east),
            west: name_at(probes.west),
            formatted_address: None,
        })
    }
}
