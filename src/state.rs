use tokio::sync::{broadcast, mpsc};

use crate::config::Config;
use crate::engine::confirm::{ConfirmConfig, HttpProber};
use crate::lookup::CandidateLookup;
use crate::models::event::Envelope;
use crate::observability::metrics::Metrics;
use crate::publisher::OutcomePublisher;
use crate::store::DriverStore;

pub struct AppState {
    pub drivers: DriverStore,
    pub lookup: CandidateLookup,
    pub prober: HttpProber,
    pub confirm: ConfirmConfig,
    pub search_radius: f64,
    pub trip_tx: mpsc::Sender<String>,
    pub publisher: OutcomePublisher,
    pub metrics: Metrics,
}

impl AppState {
    /// Builds the shared state and hands back the consumption-port receiver
    /// for the dispatch loop.
    pub fn new(config: &Config) -> (Self, mpsc::Receiver<String>) {
        let (trip_tx, trip_rx) = mpsc::channel(config.trip_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel::<Envelope>(config.event_buffer_size);

        let http = reqwest::Client::new();

        (
            Self {
                drivers: DriverStore::new(),
                lookup: CandidateLookup::new(
                    http.clone(),
                    config.location_service_url.clone(),
                    config.lookup_timeout,
                ),
                prober: HttpProber::new(http),
                confirm: ConfirmConfig {
                    deadline: config.confirm_deadline,
                    probe_timeout: config.probe_timeout,
                    probe_attempts: config.probe_attempts,
                },
                search_radius: config.search_radius,
                trip_tx,
                publisher: OutcomePublisher::new(events_tx),
                metrics: Metrics::new(),
            },
            trip_rx,
        )
    }
}
