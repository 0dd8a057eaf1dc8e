use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use geofence_locator::fence::CatalogSource;
use geofence_locator::geocoding::{GeocoderConfig, Nominatim, Offline};
use geofence_locator::geodesy::{cardinal_points, distance_m, DEFAULT_PROBE_DISTANCE_M};
use geofence_locator::resolution::{
    ApiResponse, GeofenceLocator, ResolutionOptions, ResolutionRequest,
};
use geofence_locator::server::{self, DynProvider};
use serde::Serialize;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Geofence Locator: find the smallest named region around a point
///
/// Resolves an address or a lat/lng pair to the enclosing geofence and the
/// fences 100 m to the north, south, east, and west.
///
/// Examples:
///   geofence "1 Dr Carlton B Goodlett Pl, San Francisco"
///   geofence --lat 37.7749 --lng -122.4194
///   geofence --catalog fences.tsv --distance 250 --lat 37.77 --lng -122.42
///   geofence --list
///   geofence --serve --port 8080
#[derive(Parser)]
#[command(name = "geofence", version, about, long_about = None)]
struct Cli {
    /// Free-text address (positional). Example: geofence "Union Square, SF"
    #[arg(index = 1)]
    address: Option<String>,

    /// Latitude (-90 to 90).
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<String>,

    /// Longitude (-180 to 180).
    #[arg(long, allow_hyphen_values = true)]
    lng: Option<String>,

    /// Polygon catalog (tab-separated). Defaults to ~/.geofence/polygons.tsv,
    /// then the built-in dataset.
    #[arg(long, env = "GEOFENCE_CATALOG")]
    catalog: Option<PathBuf>,

    /// Distance of the cardinal probes from the center, in metres.
    #[arg(
        long,
        env = "GEOFENCE_PROBE_DISTANCE",
        default_value_t = DEFAULT_PROBE_DISTANCE_M,
        value_parser = parse_distance
    )]
    distance: f64,

    /// Per-request geocoding timeout in seconds.
    #[arg(long, env = "GEOFENCE_TIMEOUT", default_value = "5", value_parser = parse_timeout)]
    timeout: Duration,

    /// Nominatim-compatible search endpoint.
    #[arg(long, env = "GEOFENCE_NOMINATIM_URL")]
    nominatim_url: Option<String>,

    /// Offline mode: never call the geocoder; only literal coordinates resolve.
    #[arg(long)]
    offline: bool,

    /// Print the active catalog and exit.
    #[arg(long)]
    list: bool,

    /// Run the HTTP server instead of a one-shot lookup.
    #[arg(long)]
    serve: bool,

    /// Server bind address.
    #[arg(long, env = "GEOFENCE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(long, env = "GEOFENCE_PORT", default_value_t = 3000)]
    port: u16,
}

fn parse_distance(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(d) if d.is_finite() && d > 0.0 => Ok(d),
        _ => Err(format!("Invalid distance '{}'. Use a positive number of metres.", s)),
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    match s.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Ok(Duration::from_secs_f64(secs)),
        _ => Err(format!("Invalid timeout '{}'. Use a positive number of seconds.", s)),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let locator = build_locator(&cli);

    if cli.list {
        return match locator.load_catalog() {
            Ok(catalog) => print_json(&catalog.summaries()),
            Err(e) => {
                error!("{:?}", e);
                ExitCode::FAILURE
            }
        };
    }

    if cli.serve {
        return serve(&cli, locator);
    }

    let request = ResolutionRequest {
        address: cli.address.clone(),
        lat: cli.lat.clone(),
        lng: cli.lng.clone(),
    };
    let outcome = locator.resolve(&request);

    if let Ok(result) = &outcome {
        for (direction, probe) in cardinal_points(result.center, cli.distance).iter() {
            debug!(
                "{} probe at {} ({:.2} m) -> {}",
                direction,
                probe,
                distance_m(result.center, probe),
                result.neighbour(direction)
            );
        }
    }

    let code = print_json(&ApiResponse::from_result(&outcome));
    if outcome.is_ok() {
        code
    } else {
        ExitCode::FAILURE
    }
}

fn build_locator(cli: &Cli) -> GeofenceLocator<DynProvider> {
    let catalog = match &cli.catalog {
        Some(path) => CatalogSource::File(path.clone()),
        None => CatalogSource::discover(),
    };
    debug!("Catalog source: {}", catalog.describe());

    let provider: DynProvider = if cli.offline {
        Box::new(Offline)
    } else {
        let defaults = GeocoderConfig::default();
        Box::new(Nominatim::new(GeocoderConfig {
            base_url: cli.nominatim_url.clone().unwrap_or(defaults.base_url),
            timeout: cli.timeout,
            ..defaults
        }))
    };

    let options = ResolutionOptions {
        probe_distance_m: cli.distance,
    };
    GeofenceLocator::new(catalog, provider, options)
}

fn serve(cli: &Cli, locator: GeofenceLocator<DynProvider>) -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Cannot start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server::start(&cli.host, cli.port, locator)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error on {}:{}: {}", cli.host, cli.port, e);
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Cannot serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}
