//! Core types for the geocoding subsystem.

use std::time::Duration;
use thiserror::Error;

use crate::geodesy::GeoPoint;

pub const EMPTY_ADDRESS: &str = "empty address";
pub const NO_RESULTS: &str = "No results found";
pub const SERVICE_UNAVAILABLE: &str = "Geocoding service unavailable";

/// A single usable answer from a provider or from the literal-coordinate scan.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub point: GeoPoint,
    pub formatted_address: String,
}

/// Outcome of resolving one address. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodingResult {
    pub coordinates: GeoPoint,
    pub formatted_address: String,
    pub success: bool,
    pub error: Option<String>,
}

impl GeocodingResult {
    pub fn found(hit: GeocodedAddress) -> Self {
        Self {
            coordinates: hit.point,
            formatted_address: hit.formatted_address,
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            coordinates: GeoPoint { lat: 0.0, lng: 0.0 },
            formatted_address: String::new(),
            success: false,
            error: Some(message.into()),
        }
    }

    /// Convert into a `Result`, keeping the error message verbatim.
    pub fn into_result(self) -> Result<GeocodedAddress, String> {
        if self.success {
            Ok(GeocodedAddress {
                point: self.coordinates,
                formatted_address: self.formatted_address,
            })
        } else {
            Err(self.error.unwrap_or_else(|| NO_RESULTS.to_string()))
        }
    }
}

/// How much detail to request from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupDetail {
    /// Full address breakdown, localized display names.
    Full,
    Basic,
}

/// Provider settings.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Per-request deadline; the request is aborted when it expires.
    pub timeout: Duration,
    pub accept_language: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org/search".into(),
            user_agent: concat!("GeofenceLocator/", env!("CARGO_PKG_VERSION")).into(),
            timeout: Duration::from_secs(5),
            accept_language: "en".into(),
        }
    }
}

/// Provider-level failures. Only `Fatal` escapes the fallback chain.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// The provider cannot be used at all (e.g. a malformed endpoint URL).
    #[error("geocoder misconfigured: {0}")]
    Fatal(String),
}

impl GeocodeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
