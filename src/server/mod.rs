mod handlers;
mod state;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::{AppState, DynProvider};

use crate::resolution::GeofenceLocator;

pub fn build_router(locator: GeofenceLocator<DynProvider>) -> Router {
    let state = Arc::new(AppState { locator });

    Router::new()
        .route("/api/geo-data", get(handlers::geo_data))
        .route("/api/fences", get(handlers::fence_list))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(
    host: &str,
    port: u16,
    locator: GeofenceLocator<DynProvider>,
) -> std::io::Result<()> {
    let app = build_router(locator);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Geofence server listening on http://{}", addr);
    info!("Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}
