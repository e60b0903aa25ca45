use std::time::Duration;

use serde::Serialize;

use crate::error::DispatchError;
use crate::models::driver::Candidate;
use crate::models::trip::GeoPoint;

/// Client for the geospatial location service. One attempt per dispatch: a
/// failed lookup degrades to "no drivers available" rather than blocking the
/// pipeline.
#[derive(Debug, Clone)]
pub struct CandidateLookup {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct NearbyRequest {
    lat: f64,
    lng: f64,
    radius: f64,
}

impl CandidateLookup {
    pub fn new(http: reqwest::Client, base_url: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Drivers within `radius` of `origin`, nearest first as returned by the
    /// location service. An empty list is a valid non-error result.
    pub async fn nearby(
        &self,
        origin: &GeoPoint,
        radius: f64,
    ) -> Result<Vec<Candidate>, DispatchError> {
        let url = format!("{}/drivers", self.base_url);
        let request = NearbyRequest {
            lat: origin.lat,
            lng: origin.lng,
            radius,
        };

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|err| DispatchError::LookupUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(DispatchError::LookupUnavailable(format!(
                "location service returned {}",
                response.status()
            )));
        }

        response
            .json::<Vec<Candidate>>()
            .await
            .map_err(|err| DispatchError::LookupUnavailable(format!("malformed payload: {err}")))
    }
}
