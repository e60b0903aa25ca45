use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentStatus {
    Available,
    Assigned,
}

/// Durable driver record. Mutated only through `DriverStore`.
///
/// Invariant: `current_trip_id.is_some()` iff `assignment_status == Assigned`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverRecord {
    pub driver_id: String,
    pub contact_address: String,
    pub assignment_status: AssignmentStatus,
    pub current_trip_id: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Driver snapshot returned by the location service for one dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub driver_id: String,
    pub contact_address: String,
}
