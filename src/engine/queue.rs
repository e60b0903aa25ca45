use crate::error::AppError;
use crate::state::AppState;

/// Producer side of the consumption port. A broker bridge (or a test) pushes
/// raw broker messages here; the coordinator drains them in delivery order.
pub async fn enqueue_trip_event(state: &AppState, raw: String) -> Result<(), AppError> {
    state
        .trip_tx
        .send(raw)
        .await
        .map_err(|err| AppError::Internal(format!("trip queue send failed: {err}")))?;

    state.metrics.trips_in_queue.inc();
    Ok(())
}
