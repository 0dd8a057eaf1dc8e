use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::fence::FenceSummary;
use crate::resolution::{ApiResponse, ResolutionRequest, ResolveError};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn status_for(outcome: &Result<impl Sized, ResolveError>) -> StatusCode {
    match outcome {
        Ok(_) => StatusCode::OK,
        Err(ResolveError::Validation(_)) | Err(ResolveError::Geocoding(_)) => {
            StatusCode::BAD_REQUEST
        }
        Err(ResolveError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ─── GET /api/geo-data ───────────────────────────────────────────

pub async fn geo_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolutionRequest>,
) -> Response {
    let start = Instant::now();
    let label = params.address.clone().unwrap_or_else(|| {
        format!(
            "{}, {}",
            params.lat.as_deref().unwrap_or("?"),
            params.lng.as_deref().unwrap_or("?")
        )
    });

    // Geocoding blocks on outbound HTTP; keep it off the async workers.
    let worker = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || worker.locator.resolve(&params))
        .await
        .unwrap_or_else(|e| Err(ResolveError::Internal(format!("resolution task failed: {}", e))));

    let status = status_for(&outcome);
    info!(
        "GET /api/geo-data [{}] -> {} ({:.1}ms)",
        label,
        status.as_u16(),
        start.elapsed().as_secs_f64() * 1000.0,
    );

    (status, Json(ApiResponse::from_result(&outcome))).into_response()
}

// ─── GET /api/fences ─────────────────────────────────────────────

pub async fn fence_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FenceSummary>>, ApiError> {
    let worker = Arc::clone(&state);
    let catalog = tokio::task::spawn_blocking(move || worker.locator.load_catalog())
        .await
        .unwrap_or_else(|e| Err(ResolveError::Internal(e.to_string())))
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(catalog.summaries()))
}
