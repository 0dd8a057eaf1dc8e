//! Address geocoding for the geofence locator.
//!
//! A staged fallback chain over a pluggable provider (Nominatim in production),
//! ending in a literal "lat, lng" scan of the input text.

pub mod providers;
pub mod resolver;
pub mod types;

pub use providers::{GeocodingProvider, Nominatim, Offline};
pub use resolver::{extract_coordinates, sanitize_address, AddressResolver};
pub use types::{GeocodeError, GeocodedAddress, GeocoderConfig, GeocodingResult, LookupDetail};
