use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::models::driver::Candidate;
use crate::models::trip::{GeoPoint, TripCreated, TripPrice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferDecision {
    Accepted,
    Declined,
}

/// Result of racing one trip's offers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Accepted(String),
    NoneAccepted,
}

#[derive(Debug, Clone)]
pub struct ConfirmConfig {
    /// Overall bound on the race, regardless of candidate count.
    pub deadline: Duration,
    /// Per-attempt bound on a single probe request.
    pub probe_timeout: Duration,
    /// Attempts per candidate. Retries absorb transport failures only; an
    /// explicit decline is final.
    pub probe_attempts: u32,
}

/// Seam for offering a trip to one candidate. The production impl speaks HTTP
/// to the candidate's contact address.
pub trait OfferProbe {
    fn offer(
        &self,
        candidate: &Candidate,
        trip: &TripCreated,
    ) -> impl Future<Output = Result<OfferDecision, DispatchError>> + Send;
}

/// Offers the trip to every candidate concurrently and reports the first
/// acceptance observed. Losing probes are aborted as soon as a winner is
/// known; at most one winner is ever reported because acceptances are drained
/// one at a time.
pub async fn run_offer_race<P>(
    prober: &P,
    trip: &TripCreated,
    candidates: Vec<Candidate>,
    cfg: &ConfirmConfig,
) -> ConfirmOutcome
where
    P: OfferProbe + Clone + Send + Sync + 'static,
{
    if candidates.is_empty() {
        return ConfirmOutcome::NoneAccepted;
    }

    let mut probes = JoinSet::new();
    for candidate in candidates {
        let prober = prober.clone();
        let trip = trip.clone();
        let probe_timeout = cfg.probe_timeout;
        let attempts = cfg.probe_attempts;
        probes.spawn(async move {
            probe_candidate(prober, candidate, trip, probe_timeout, attempts).await
        });
    }

    let race = async {
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(Some(driver_id)) => return Some(driver_id),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "offer probe task failed"),
            }
        }
        None
    };

    let winner = match timeout(cfg.deadline, race).await {
        Ok(winner) => winner,
        Err(_) => {
            debug!(trip_id = %trip.trip_id, "confirmation deadline elapsed");
            None
        }
    };

    probes.abort_all();

    match winner {
        Some(driver_id) => ConfirmOutcome::Accepted(driver_id),
        None => ConfirmOutcome::NoneAccepted,
    }
}

async fn probe_candidate<P: OfferProbe>(
    prober: P,
    candidate: Candidate,
    trip: TripCreated,
    probe_timeout: Duration,
    attempts: u32,
) -> Option<String> {
    for attempt in 1..=attempts {
        let result = match timeout(probe_timeout, prober.offer(&candidate, &trip)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::ProbeTimeout),
        };

        match result {
            Ok(OfferDecision::Accepted) => {
                debug!(
                    driver_id = %candidate.driver_id,
                    trip_id = %trip.trip_id,
                    "offer accepted"
                );
                return Some(candidate.driver_id);
            }
            Ok(OfferDecision::Declined) => {
                debug!(
                    driver_id = %candidate.driver_id,
                    trip_id = %trip.trip_id,
                    "offer declined"
                );
                return None;
            }
            Err(err) => {
                debug!(
                    driver_id = %candidate.driver_id,
                    trip_id = %trip.trip_id,
                    attempt,
                    error = %err,
                    "offer probe failed"
                );
            }
        }
    }

    None
}

/// HTTP prober: POSTs the offer to the candidate's contact address. The probe
/// body declares the trip; the response declares intent.
#[derive(Debug, Clone)]
pub struct HttpProber {
    http: reqwest::Client,
}

#[derive(Serialize)]
struct OfferRequest<'a> {
    trip_id: &'a str,
    price: &'a TripPrice,
    from: &'a GeoPoint,
    to: &'a GeoPoint,
}

#[derive(Deserialize)]
struct OfferResponse {
    decision: OfferDecision,
}

impl HttpProber {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl OfferProbe for HttpProber {
    async fn offer(
        &self,
        candidate: &Candidate,
        trip: &TripCreated,
    ) -> Result<OfferDecision, DispatchError> {
        let url = format!("{}/offer", candidate.contact_address.trim_end_matches('/'));
        let request = OfferRequest {
            trip_id: &trip.trip_id,
            price: &trip.price,
            from: &trip.origin,
            to: &trip.destination,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|err| DispatchError::Probe(err.to_string()))?;

        if !response.status().is_success() {
            return Err(DispatchError::Probe(format!(
                "driver endpoint returned {}",
                response.status()
            )));
        }

        let offer: OfferResponse = response
            .json()
            .await
            .map_err(|err| DispatchError::Probe(format!("malformed offer response: {err}")))?;

        Ok(offer.decision)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{
        run_offer_race, ConfirmConfig, ConfirmOutcome, HttpProber, OfferDecision, OfferProbe,
    };
    use crate::error::DispatchError;
    use crate::models::driver::Candidate;
    use crate::models::trip::{GeoPoint, TripCreated, TripPrice};

    #[derive(Clone)]
    enum Behavior {
        Accept(Duration),
        Decline,
        Hang,
        ErrorsThenAccept(u32),
        Error,
    }

    #[derive(Clone)]
    struct FakeProber {
        behaviors: Arc<HashMap<String, Behavior>>,
        calls: Arc<Mutex<HashMap<String, u32>>>,
    }

    impl FakeProber {
        fn new(behaviors: Vec<(&str, Behavior)>) -> Self {
            Self {
                behaviors: Arc::new(
                    behaviors
                        .into_iter()
                        .map(|(id, b)| (id.to_string(), b))
                        .collect(),
                ),
                calls: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        fn calls_for(&self, driver_id: &str) -> u32 {
            *self.calls.lock().unwrap().get(driver_id).unwrap_or(&0)
        }
    }

    impl OfferProbe for FakeProber {
        async fn offer(
            &self,
            candidate: &Candidate,
            _trip: &TripCreated,
        ) -> Result<OfferDecision, DispatchError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                let entry = calls.entry(candidate.driver_id.clone()).or_insert(0);
                *entry += 1;
                *entry
            };

            match self.behaviors.get(&candidate.driver_id) {
                Some(Behavior::Accept(delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(OfferDecision::Accepted)
                }
                Some(Behavior::Decline) => Ok(OfferDecision::Declined),
                Some(Behavior::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(OfferDecision::Declined)
                }
                Some(Behavior::ErrorsThenAccept(failures)) => {
                    if call <= *failures {
                        Err(DispatchError::Probe("transient".to_string()))
                    } else {
                        Ok(OfferDecision::Accepted)
                    }
                }
                Some(Behavior::Error) | None => Err(DispatchError::Probe("boom".to_string())),
            }
        }
    }

    fn candidate(driver_id: &str) -> Candidate {
        Candidate {
            driver_id: driver_id.to_string(),
            contact_address: format!("http://{driver_id}.test"),
        }
    }

    fn trip() -> TripCreated {
        TripCreated {
            trip_id: "trip-1".to_string(),
            offer_id: String::new(),
            price: TripPrice {
                currency: "EUR".to_string(),
                amount: 700,
            },
            status: "DRIVER_SEARCH".to_string(),
            origin: GeoPoint { lat: 52.52, lng: 13.405 },
            destination: GeoPoint { lat: 52.54, lng: 13.42 },
        }
    }

    fn cfg(deadline_ms: u64, probe_timeout_ms: u64, probe_attempts: u32) -> ConfirmConfig {
        ConfirmConfig {
            deadline: Duration::from_millis(deadline_ms),
            probe_timeout: Duration::from_millis(probe_timeout_ms),
            probe_attempts,
        }
    }

    #[tokio::test]
    async fn empty_candidate_list_concludes_none_accepted() {
        let prober = FakeProber::new(vec![]);
        let outcome = run_offer_race(&prober, &trip(), vec![], &cfg(1000, 100, 1)).await;
        assert_eq!(outcome, ConfirmOutcome::NoneAccepted);
    }

    #[tokio::test]
    async fn first_acceptance_wins() {
        let prober = FakeProber::new(vec![
            ("d1", Behavior::Accept(Duration::from_millis(250))),
            ("d2", Behavior::Accept(Duration::from_millis(20))),
        ]);

        let outcome = run_offer_race(
            &prober,
            &trip(),
            vec![candidate("d1"), candidate("d2")],
            &cfg(2000, 1000, 1),
        )
        .await;

        assert_eq!(outcome, ConfirmOutcome::Accepted("d2".to_string()));
    }

    #[tokio::test]
    async fn timed_out_candidate_does_not_block_the_race() {
        // D1 never answers, D2 accepts after 200ms.
        let prober = FakeProber::new(vec![
            ("d1", Behavior::Hang),
            ("d2", Behavior::Accept(Duration::from_millis(200))),
        ]);

        let start = Instant::now();
        let outcome = run_offer_race(
            &prober,
            &trip(),
            vec![candidate("d1"), candidate("d2")],
            &cfg(5000, 500, 1),
        )
        .await;

        assert_eq!(outcome, ConfirmOutcome::Accepted("d2".to_string()));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn all_declines_conclude_none_accepted_without_retry() {
        let prober = FakeProber::new(vec![
            ("d1", Behavior::Decline),
            ("d2", Behavior::Decline),
        ]);

        let outcome = run_offer_race(
            &prober,
            &trip(),
            vec![candidate("d1"), candidate("d2")],
            &cfg(1000, 100, 3),
        )
        .await;

        assert_eq!(outcome, ConfirmOutcome::NoneAccepted);
        assert_eq!(prober.calls_for("d1"), 1);
        assert_eq!(prober.calls_for("d2"), 1);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_within_budget() {
        let prober = FakeProber::new(vec![("d1", Behavior::ErrorsThenAccept(2))]);

        let outcome =
            run_offer_race(&prober, &trip(), vec![candidate("d1")], &cfg(2000, 200, 3)).await;

        assert_eq!(outcome, ConfirmOutcome::Accepted("d1".to_string()));
        assert_eq!(prober.calls_for("d1"), 3);
    }

    #[tokio::test]
    async fn exhausted_retry_budget_excludes_candidate() {
        let prober = FakeProber::new(vec![("d1", Behavior::Error)]);

        let outcome =
            run_offer_race(&prober, &trip(), vec![candidate("d1")], &cfg(1000, 100, 2)).await;

        assert_eq!(outcome, ConfirmOutcome::NoneAccepted);
        assert_eq!(prober.calls_for("d1"), 2);
    }

    #[tokio::test]
    async fn deadline_bounds_the_whole_race() {
        let prober = FakeProber::new(vec![("d1", Behavior::Hang)]);

        let start = Instant::now();
        let outcome =
            run_offer_race(&prober, &trip(), vec![candidate("d1")], &cfg(150, 60_000, 1)).await;

        assert_eq!(outcome, ConfirmOutcome::NoneAccepted);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn near_simultaneous_acceptances_report_one_winner() {
        let prober = FakeProber::new(vec![
            ("d1", Behavior::Accept(Duration::from_millis(30))),
            ("d2", Behavior::Accept(Duration::from_millis(30))),
        ]);

        let outcome = run_offer_race(
            &prober,
            &trip(),
            vec![candidate("d1"), candidate("d2")],
            &cfg(2000, 1000, 1),
        )
        .await;

        let ConfirmOutcome::Accepted(winner) = outcome else {
            panic!("expected an acceptance");
        };
        assert!(winner == "d1" || winner == "d2");
    }

    #[tokio::test]
    async fn http_prober_reads_accept_decision() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/offer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "decision": "accepted"
            })))
            .mount(&server)
            .await;

        let prober = HttpProber::new(reqwest::Client::new());
        let candidate = Candidate {
            driver_id: "d1".to_string(),
            contact_address: server.uri(),
        };

        let decision = prober.offer(&candidate, &trip()).await.unwrap();
        assert_eq!(decision, OfferDecision::Accepted);
    }

    #[tokio::test]
    async fn http_prober_reads_decline_decision() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/offer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "decision": "declined"
            })))
            .mount(&server)
            .await;

        let prober = HttpProber::new(reqwest::Client::new());
        let candidate = Candidate {
            driver_id: "d1".to_string(),
            contact_address: server.uri(),
        };

        let decision = prober.offer(&candidate, &trip()).await.unwrap();
        assert_eq!(decision, OfferDecision::Declined);
    }

    #[tokio::test]
    async fn http_prober_maps_error_status_to_probe_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/offer"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let prober = HttpProber::new(reqwest::Client::new());
        let candidate = Candidate {
            driver_id: "d1".to_string(),
            contact_address: server.uri(),
        };

        let err = prober.offer(&candidate, &trip()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Probe(_)));
    }
}
