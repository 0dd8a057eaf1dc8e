//! Geocoding providers: the provider seam and the Nominatim client.

use std::io;

use serde::Deserialize;
use tracing::debug;

use super::types::{GeocodeError, GeocodedAddress, GeocoderConfig, LookupDetail};
use crate::geodesy::GeoPoint;

/// Something that turns free text into at most one location.
///
/// `Ok(None)` means the provider answered but found nothing.
pub trait GeocodingProvider: Send + Sync {
    fn search(
        &self,
        query: &str,
        detail: LookupDetail,
    ) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

impl<P: GeocodingProvider + ?Sized> GeocodingProvider for Box<P> {
    fn search(
        &self,
        query: &str,
        detail: LookupDetail,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        (**self).search(query, detail)
    }
}

/// A provider that never reaches the network. Used by `--offline`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl GeocodingProvider for Offline {
    fn search(
        &self,
        _query: &str,
        _detail: LookupDetail,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        Err(GeocodeError::Transport("offline mode".into()))
    }
}

// ─── Nominatim ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// OpenStreetMap Nominatim search client.
///
/// The agent-level timeout bounds the whole exchange, body included; on expiry
/// the socket is dropped, so a late response can never be observed.
pub struct Nominatim {
    agent: ureq::Agent,
    config: GeocoderConfig,
}

impl Nominatim {
    pub fn new(config: GeocoderConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        Self { agent, config }
    }
}

impl GeocodingProvider for Nominatim {
    fn search(
        &self,
        query: &str,
        detail: LookupDetail,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let mut request = self
            .agent
            .get(&self.config.base_url)
            .query("q", query)
            .query("format", "json")
            .query("limit", "1")
            .set("Accept-Language", &self.config.accept_language);

        if detail == LookupDetail::Full {
            request = request
                .query("addressdetails", "1")
                .query("accept-language", &self.config.accept_language);
        }

        debug!("Nominatim lookup ({:?}): {}", detail, query);

        let response = request.call().map_err(map_ureq_error)?;
        let places: Vec<NominatimPlace> = response.into_json().map_err(map_body_error)?;
        first_place(places)
    }
}

fn first_place(places: Vec<NominatimPlace>) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    let lat = parse_coordinate(&place.lat, "lat")?;
    let lng = parse_coordinate(&place.lon, "lon")?;
    let point = GeoPoint::new(lat, lng)
        .ok_or_else(|| {
            GeocodeError::InvalidResponse(format!("coordinates out of range: {}, {}", lat, lng))
        })?;

    Ok(Some(GeocodedAddress {
        point: point.rounded(),
        formatted_address: place.display_name,
    }))
}

fn parse_coordinate(raw: &str, field: &str) -> Result<f64, GeocodeError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeocodeError::InvalidResponse(format!("bad {} '{}'", field, raw)))
}

fn map_ureq_error(err: ureq::Error) -> GeocodeError {
    match err {
        ureq::Error::Status(code, _) => GeocodeError::Status(code),
        ureq::Error::Transport(transport) => match transport.kind() {
            ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
                GeocodeError::Fatal(transport.to_string())
            }
            _ if is_timeout(&transport) => GeocodeError::Timeout,
            _ => GeocodeError::Transport(transport.to_string()),
        },
    }
}

fn map_body_error(err: io::Error) -> GeocodeError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => GeocodeError::Timeout,
        _ => GeocodeError::InvalidResponse(err.to_string()),
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<io::Error>())
        .map(|e| matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock))
        .unwrap_or(false)
}
