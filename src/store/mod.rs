use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::DispatchError;
use crate::models::driver::{AssignmentStatus, DriverRecord};

/// Single point of truth for driver availability. All assignment mutations go
/// through `try_assign`/`release`; the map's shard guard makes each transition
/// a single conditional update, safe under concurrent callers.
pub struct DriverStore {
    records: DashMap<String, DriverRecord>,
}

impl DriverStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn register(
        &self,
        driver_id: String,
        contact_address: String,
    ) -> Result<DriverRecord, DispatchError> {
        let now = Utc::now();
        let record = DriverRecord {
            driver_id: driver_id.clone(),
            contact_address,
            assignment_status: AssignmentStatus::Available,
            current_trip_id: None,
            registered_at: now,
            updated_at: now,
        };

        match self.records.entry(driver_id) {
            Entry::Occupied(entry) => Err(DispatchError::DriverExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(record.clone());
                Ok(record)
            }
        }
    }

    /// Available -> Assigned, binding the trip. Fails with `AssignConflict`
    /// if the driver is already assigned (a concurrent dispatch won) without
    /// touching the record.
    pub fn try_assign(&self, driver_id: &str, trip_id: &str) -> Result<(), DispatchError> {
        let mut record = self
            .records
            .get_mut(driver_id)
            .ok_or_else(|| DispatchError::UnknownDriver(driver_id.to_string()))?;

        match record.assignment_status {
            AssignmentStatus::Available => {
                record.assignment_status = AssignmentStatus::Assigned;
                record.current_trip_id = Some(trip_id.to_string());
                record.updated_at = Utc::now();
                Ok(())
            }
            AssignmentStatus::Assigned => {
                Err(DispatchError::AssignConflict(driver_id.to_string()))
            }
        }
    }

    /// Assigned -> Available, clearing the bound trip. Idempotent; returns
    /// whether a binding was actually cleared.
    pub fn release(&self, driver_id: &str) -> Result<bool, DispatchError> {
        let mut record = self
            .records
            .get_mut(driver_id)
            .ok_or_else(|| DispatchError::UnknownDriver(driver_id.to_string()))?;

        let was_assigned = record.assignment_status == AssignmentStatus::Assigned;
        record.assignment_status = AssignmentStatus::Available;
        record.current_trip_id = None;
        record.updated_at = Utc::now();
        Ok(was_assigned)
    }

    pub fn get(&self, driver_id: &str) -> Option<DriverRecord> {
        self.records.get(driver_id).map(|entry| entry.value().clone())
    }

    pub fn all(&self) -> Vec<DriverRecord> {
        self.records.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn assigned_count(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.value().assignment_status == AssignmentStatus::Assigned)
            .count()
    }
}
