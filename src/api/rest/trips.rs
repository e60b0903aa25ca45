use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

/// Trip lifecycle endpoints used by driver apps once a trip is underway. They
/// go through the driver store for every state change and emit the matching
/// lifecycle event.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trip/:trip_id/cancel", post(cancel_trip))
        .route("/trip/:trip_id/start", post(start_trip))
        .route("/trip/:trip_id/end", post(end_trip))
}

#[derive(Deserialize)]
pub struct CancelTripRequest {
    pub driver_id: String,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct TripActionRequest {
    pub driver_id: String,
}

async fn cancel_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Json(payload): Json<CancelTripRequest>,
) -> Result<StatusCode, AppError> {
    if state.drivers.release(&payload.driver_id)? {
        state.metrics.drivers_assigned.dec();
    }

    state.publisher.trip_cancelled(&trip_id, &payload.reason)?;

    info!(
        trip_id = %trip_id,
        driver_id = %payload.driver_id,
        reason = %payload.reason,
        "trip cancelled by driver"
    );
    Ok(StatusCode::OK)
}

async fn start_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Json(payload): Json<TripActionRequest>,
) -> Result<StatusCode, AppError> {
    let record = state
        .drivers
        .get(&payload.driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", payload.driver_id)))?;

    if record.current_trip_id.as_deref() != Some(trip_id.as_str()) {
        return Err(AppError::Conflict(format!(
            "driver {} is not assigned to trip {trip_id}",
            payload.driver_id
        )));
    }

    state.publisher.trip_started(&trip_id)?;

    info!(trip_id = %trip_id, driver_id = %payload.driver_id, "trip started");
    Ok(StatusCode::OK)
}

async fn end_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Json(payload): Json<TripActionRequest>,
) -> Result<StatusCode, AppError> {
    if state.drivers.release(&payload.driver_id)? {
        state.metrics.drivers_assigned.dec();
    }

    state.publisher.trip_ended(&trip_id)?;

    info!(trip_id = %trip_id, driver_id = %payload.driver_id, "trip ended");
    Ok(StatusCode::OK)
}
