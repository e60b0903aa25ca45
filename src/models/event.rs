use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Constant `source` identifying events emitted by this service.
pub const EVENT_SOURCE: &str = "/dispatch";

pub const TRIP_CREATED: &str = "trip.created";
pub const TRIP_COMMAND_ACCEPT: &str = "trip.command.accept";
pub const TRIP_COMMAND_CANCEL: &str = "trip.command.cancel";
pub const TRIP_COMMAND_START: &str = "trip.command.start";
pub const TRIP_COMMAND_END: &str = "trip.command.end";

/// Broker message envelope. Wire names (`type`, `datacontenttype`) follow the
/// upstream trip service's event schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "datacontenttype")]
    pub content_type: String,
    pub time: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn new(event_type: &str, data: &impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            source: EVENT_SOURCE.to_string(),
            event_type: event_type.to_string(),
            content_type: "application/json".to_string(),
            time: Utc::now(),
            data: serde_json::to_value(data)?,
        })
    }

    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripDriverIds {
    pub trip_id: String,
    pub driver_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripReason {
    pub trip_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRef {
    pub trip_id: String,
}
