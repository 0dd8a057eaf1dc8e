use crate::geocoding::GeocodingProvider;
use crate::resolution::GeofenceLocator;

pub type DynProvider = Box<dyn GeocodingProvider>;

/// Immutable per-server configuration. Nothing here is mutated by requests.
pub struct AppState {
    pub locator: GeofenceLocator<DynProvider>,
}
