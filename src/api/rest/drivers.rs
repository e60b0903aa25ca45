use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::driver::DriverRecord;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(register_driver).get(list_drivers))
        .route("/drivers/:id", get(get_driver))
}

#[derive(Deserialize)]
pub struct RegisterDriverRequest {
    pub driver_id: String,
    pub contact_address: String,
}

async fn register_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterDriverRequest>,
) -> Result<Json<DriverRecord>, AppError> {
    if payload.driver_id.trim().is_empty() {
        return Err(AppError::BadRequest("driver_id cannot be empty".to_string()));
    }

    if payload.contact_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "contact_address cannot be empty".to_string(),
        ));
    }

    let record = state
        .drivers
        .register(payload.driver_id, payload.contact_address)?;

    Ok(Json(record))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<DriverRecord>> {
    Json(state.drivers.all())
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DriverRecord>, AppError> {
    let record = state
        .drivers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    Ok(Json(record))
}
