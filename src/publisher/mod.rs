use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::DispatchError;
use crate::models::event::{
    Envelope, TripDriverIds, TripReason, TripRef, TRIP_COMMAND_ACCEPT, TRIP_COMMAND_CANCEL,
    TRIP_COMMAND_END, TRIP_COMMAND_START,
};
use crate::models::trip::DispatchOutcome;

/// Outbound event port. Outcome and lifecycle events are wrapped in the
/// service envelope and fanned out over a broadcast bus; a deployment hooks a
/// broker bridge onto `subscribe`. A publish failure is reported to the
/// caller and never rolls back a committed store transition.
#[derive(Clone)]
pub struct OutcomePublisher {
    events_tx: broadcast::Sender<Envelope>,
}

impl OutcomePublisher {
    pub fn new(events_tx: broadcast::Sender<Envelope>) -> Self {
        Self { events_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.events_tx.subscribe()
    }

    /// Exactly one decision event per dispatch: accept on a confirmed
    /// assignment, cancel with a reason otherwise.
    pub fn publish_outcome(&self, outcome: &DispatchOutcome) -> Result<(), DispatchError> {
        match outcome {
            DispatchOutcome::Accepted { trip_id, driver_id } => self.publish(
                TRIP_COMMAND_ACCEPT,
                &TripDriverIds {
                    trip_id: trip_id.clone(),
                    driver_id: driver_id.clone(),
                },
            ),
            DispatchOutcome::Rejected { trip_id, reason } => {
                self.trip_cancelled(trip_id, reason)
            }
        }
    }

    pub fn trip_cancelled(&self, trip_id: &str, reason: &str) -> Result<(), DispatchError> {
        self.publish(
            TRIP_COMMAND_CANCEL,
            &TripReason {
                trip_id: trip_id.to_string(),
                reason: reason.to_string(),
            },
        )
    }

    pub fn trip_started(&self, trip_id: &str) -> Result<(), DispatchError> {
        self.publish(
            TRIP_COMMAND_START,
            &TripRef {
                trip_id: trip_id.to_string(),
            },
        )
    }

    pub fn trip_ended(&self, trip_id: &str) -> Result<(), DispatchError> {
        self.publish(
            TRIP_COMMAND_END,
            &TripRef {
                trip_id: trip_id.to_string(),
            },
        )
    }

    fn publish(&self, event_type: &str, data: &impl Serialize) -> Result<(), DispatchError> {
        let envelope =
            Envelope::new(event_type, data).map_err(|err| DispatchError::Publish(err.to_string()))?;

        self.events_tx
            .send(envelope)
            .map(|_| ())
            .map_err(|_| DispatchError::Publish("no active event subscribers".to_string()))
    }
}
