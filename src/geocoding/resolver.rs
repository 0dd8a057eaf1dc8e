//! Address resolver: runs the geocoding fallback chain.
//!
//! Flow:  blank check → provider (as typed) → provider (sanitized) → literal pair → error
//!
//! Provider failures are swallowed stage by stage. A fatal provider fault, or a
//! panic anywhere in the chain, ends it as "Geocoding service unavailable".

use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::providers::GeocodingProvider;
use super::types::{
    GeocodeError, GeocodedAddress, GeocodingResult, LookupDetail, EMPTY_ADDRESS, NO_RESULTS,
    SERVICE_UNAVAILABLE,
};
use crate::geodesy::GeoPoint;

static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s,]").unwrap_or_else(|_| unreachable!()));

static COORDINATE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([-+]?[0-9]+\.?[0-9]*)[\s,]+([-+]?[0-9]+\.?[0-9]*)")
        .unwrap_or_else(|_| unreachable!())
});

#[derive(Debug, Clone, Copy)]
enum Stage {
    Primary,
    Sanitized,
}

/// Resolves free-text addresses through a single provider.
pub struct AddressResolver<P> {
    provider: P,
}

impl<P: GeocodingProvider> AddressResolver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Resolve an address. Always returns a well-formed result.
    pub fn resolve(&self, address: &str) -> GeocodingResult {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return GeocodingResult::failed(EMPTY_ADDRESS);
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_chain(address, trimmed)));
        let Ok(outcome) = outcome else {
            warn!("Geocoding chain panicked for '{}'", trimmed);
            return GeocodingResult::failed(SERVICE_UNAVAILABLE);
        };

        match outcome {
            Ok(Some(hit)) => {
                info!("Resolved '{}' -> {} ({})", trimmed, hit.point, hit.formatted_address);
                GeocodingResult::found(hit)
            }
            Ok(None) => {
                info!("No location found for '{}'", trimmed);
                GeocodingResult::failed(NO_RESULTS)
            }
            Err(e) => {
                warn!("Geocoding aborted for '{}': {}", trimmed, e);
                GeocodingResult::failed(SERVICE_UNAVAILABLE)
            }
        }
    }

    fn run_chain(
        &self,
        original: &str,
        trimmed: &str,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        if let Some(hit) = self.lookup(Stage::Primary, trimmed, LookupDetail::Full)? {
            return Ok(Some(hit));
        }

        let sanitized = sanitize_address(trimmed);
        if sanitized != trimmed {
            if let Some(hit) = self.lookup(Stage::Sanitized, &sanitized, LookupDetail::Basic)? {
                return Ok(Some(hit));
            }
        }

        Ok(extract_coordinates(original))
    }

    /// One provider stage. `Ok(None)` falls through to the next stage.
    fn lookup(
        &self,
        stage: Stage,
        query: &str,
        detail: LookupDetail,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        match self.provider.search(query, detail) {
            Ok(Some(hit)) => Ok(Some(hit)),
            Ok(None) => {
                debug!("{:?} lookup for '{}' returned nothing", stage, query);
                Ok(None)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!("{:?} lookup for '{}' failed: {}", stage, query, e);
                Ok(None)
            }
        }
    }
}

/// Replace everything except word characters, whitespace, and commas with spaces.
pub fn sanitize_address(address: &str) -> String {
    DISALLOWED_CHARS.replace_all(address, " ").trim().to_string()
}

/// First "number, number" pair in the text, read as (lat, lng).
pub fn extract_coordinates(text: &str) -> Option<GeocodedAddress> {
    let caps = COORDINATE_PAIR.captures(text)?;
    let lat: f64 = caps[1].parse().ok()?;
    let lng: f64 = caps[2].parse().ok()?;
    let point = GeoPoint::new(lat, lng)?;
    Some(GeocodedAddress {
        point,
        formatted_address: format!("{}, {}", lat, lng),
    })
}
