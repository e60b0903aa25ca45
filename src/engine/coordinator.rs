use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::engine::confirm::{run_offer_race, ConfirmOutcome};
use crate::error::DispatchError;
use crate::models::event::{Envelope, TRIP_CREATED};
use crate::models::trip::{DispatchOutcome, TripCreated};
use crate::state::AppState;

pub const NO_AVAILABLE_DRIVERS: &str = "no available drivers";
pub const DRIVER_UNAVAILABLE: &str = "driver unavailable";

/// Top-level dispatch loop. Consumes raw broker messages one at a time and
/// takes each trip through lookup, the offer race, the assignment transition
/// and outcome publication. A shutdown signal stops the pull between
/// dispatches; a dispatch already underway runs to its own bounded end.
pub async fn run_dispatch_loop(
    state: Arc<AppState>,
    mut trip_rx: mpsc::Receiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("dispatch loop started");

    loop {
        let raw = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("dispatch loop stopping: shutdown requested");
                    break;
                }
                continue;
            }
            received = trip_rx.recv() => match received {
                Some(raw) => raw,
                None => {
                    warn!("dispatch loop stopped: trip channel closed");
                    break;
                }
            },
        };

        state.metrics.trips_in_queue.dec();

        let trip = match decode_trip_created(&raw) {
            Ok(trip) => trip,
            Err(err) => {
                warn!(error = %err, "dropping malformed trip event");
                continue;
            }
        };

        let start = Instant::now();
        let outcome = dispatch_trip(&state, &trip).await;
        let label = match &outcome {
            DispatchOutcome::Accepted { .. } => "accepted",
            DispatchOutcome::Rejected { .. } => "rejected",
        };

        state
            .metrics
            .dispatch_latency_seconds
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());
        state
            .metrics
            .dispatches_total
            .with_label_values(&[label])
            .inc();

        if let Err(err) = state.publisher.publish_outcome(&outcome) {
            // accepted inconsistency window: the store transition stands
            error!(
                trip_id = %outcome.trip_id(),
                error = %err,
                "failed to publish dispatch outcome"
            );
        }

        match &outcome {
            DispatchOutcome::Accepted { trip_id, driver_id } => {
                info!(trip_id = %trip_id, driver_id = %driver_id, "trip dispatched");
            }
            DispatchOutcome::Rejected { trip_id, reason } => {
                info!(trip_id = %trip_id, reason = %reason, "trip not dispatched");
            }
        }
    }
}

async fn dispatch_trip(state: &AppState, trip: &TripCreated) -> DispatchOutcome {
    let candidates = match state.lookup.nearby(&trip.origin, state.search_radius).await {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!(trip_id = %trip.trip_id, error = %err, "candidate lookup failed");
            Vec::new()
        }
    };

    if candidates.is_empty() {
        return DispatchOutcome::Rejected {
            trip_id: trip.trip_id.clone(),
            reason: NO_AVAILABLE_DRIVERS.to_string(),
        };
    }

    info!(
        trip_id = %trip.trip_id,
        candidates = candidates.len(),
        "offering trip to candidates"
    );

    match run_offer_race(&state.prober, trip, candidates, &state.confirm).await {
        ConfirmOutcome::Accepted(driver_id) => {
            match state.drivers.try_assign(&driver_id, &trip.trip_id) {
                Ok(()) => {
                    state.metrics.drivers_assigned.inc();
                    DispatchOutcome::Accepted {
                        trip_id: trip.trip_id.clone(),
                        driver_id,
                    }
                }
                Err(err) => {
                    // lost the assignment race; accept the loss, no re-race
                    warn!(
                        trip_id = %trip.trip_id,
                        driver_id = %driver_id,
                        error = %err,
                        "winning candidate could not be assigned"
                    );
                    DispatchOutcome::Rejected {
                        trip_id: trip.trip_id.clone(),
                        reason: DRIVER_UNAVAILABLE.to_string(),
                    }
                }
            }
        }
        ConfirmOutcome::NoneAccepted => DispatchOutcome::Rejected {
            trip_id: trip.trip_id.clone(),
            reason: NO_AVAILABLE_DRIVERS.to_string(),
        },
    }
}

fn decode_trip_created(raw: &str) -> Result<TripCreated, DispatchError> {
    let envelope: Envelope =
        serde_json::from_str(raw).map_err(|err| DispatchError::Decode(err.to_string()))?;

    if envelope.event_type != TRIP_CREATED {
        return Err(DispatchError::Decode(format!(
            "unexpected event type {}",
            envelope.event_type
        )));
    }

    envelope
        .decode_data::<TripCreated>()
        .map_err(|err| DispatchError::Decode(err.to_string()))
}
