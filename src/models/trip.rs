use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPrice {
    pub currency: String,
    pub amount: i64,
}

/// Payload of a `trip.created` event as produced by the upstream trip service.
///
/// Wire names for the endpoints are `from`/`to`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripCreated {
    pub trip_id: String,
    #[serde(default)]
    pub offer_id: String,
    pub price: TripPrice,
    pub status: String,
    #[serde(rename = "from")]
    pub origin: GeoPoint,
    #[serde(rename = "to")]
    pub destination: GeoPoint,
}

/// Terminal result of one dispatch attempt. Published exactly once per
/// consumed `trip.created` event.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Accepted { trip_id: String, driver_id: String },
    Rejected { trip_id: String, reason: String },
}

impl DispatchOutcome {
    pub fn trip_id(&self) -> &str {
        match self {
            DispatchOutcome::Accepted { trip_id, .. } => trip_id,
            DispatchOutcome::Rejected { trip_id, .. } => trip_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TripCreated;

    #[test]
    fn trip_created_decodes_original_wire_names() {
        let raw = r#"{
            "trip_id": "trip-1",
            "offer_id": "offer-9",
            "price": { "currency": "RUB", "amount": 450 },
            "status": "DRIVER_SEARCH",
            "from": { "lat": 55.75, "lng": 37.61 },
            "to": { "lat": 55.80, "lng": 37.70 }
        }"#;

        let trip: TripCreated = serde_json::from_str(raw).unwrap();
        assert_eq!(trip.trip_id, "trip-1");
        assert_eq!(trip.price.currency, "RUB");
        assert_eq!(trip.price.amount, 450);
        assert!((trip.origin.lat - 55.75).abs() < 1e-9);
        assert!((trip.destination.lng - 37.70).abs() < 1e-9);
    }

    #[test]
    fn trip_created_tolerates_missing_offer_id() {
        let raw = r#"{
            "trip_id": "trip-2",
            "price": { "currency": "EUR", "amount": 12 },
            "status": "DRIVER_SEARCH",
            "from": { "lat": 1.0, "lng": 2.0 },
            "to": { "lat": 3.0, "lng": 4.0 }
        }"#;

        let trip: TripCreated = serde_json::from_str(raw).unwrap();
        assert!(trip.offer_id.is_empty());
    }
}
