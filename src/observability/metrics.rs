use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatches_total: IntCounterVec,
    pub trips_in_queue: IntGauge,
    pub dispatch_latency_seconds: HistogramVec,
    pub drivers_assigned: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatches_total = IntCounterVec::new(
            Opts::new("dispatches_total", "Total dispatch decisions by outcome"),
            &["outcome"],
        )
        .expect("valid dispatches_total metric");

        let trips_in_queue = IntGauge::new(
            "trips_in_queue",
            "Trip events waiting for the dispatch loop",
        )
        .expect("valid trips_in_queue metric");

        let dispatch_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "dispatch_latency_seconds",
                "Latency of one dispatch decision in seconds",
            ),
            &["outcome"],
        )
        .expect("valid dispatch_latency_seconds metric");

        let drivers_assigned = IntGauge::new(
            "drivers_assigned",
            "Drivers currently bound to a trip",
        )
        .expect("valid drivers_assigned metric");

        registry
            .register(Box::new(dispatches_total.clone()))
            .expect("register dispatches_total");
        registry
            .register(Box::new(trips_in_queue.clone()))
            .expect("register trips_in_queue");
        registry
            .register(Box::new(dispatch_latency_seconds.clone()))
            .expect("register dispatch_latency_seconds");
        registry
            .register(Box::new(drivers_assigned.clone()))
            .expect("register drivers_assigned");

        Self {
            registry,
            dispatches_total,
            trips_in_queue,
            dispatch_latency_seconds,
            drivers_assigned,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
