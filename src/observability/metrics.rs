use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub order_transitions_total: IntCounterVec,
    pub webhook_events_total: IntCounterVec,
    pub active_orders: IntGauge,
    pub claim_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let order_transitions_total = IntCounterVec::new(
            Opts::new(
                "order_transitions_total",
                "Order transitions attempted, by transition and outcome",
            ),
            &["transition", "outcome"],
        )
        .expect("valid order_transitions_total metric");

        let webhook_events_total = IntCounterVec::new(
            Opts::new("webhook_events_total", "Payment webhook events by kind and outcome"),
            &["kind", "outcome"],
        )
        .expect("valid webhook_events_total metric");

        let active_orders = IntGauge::new("active_orders", "Orders not yet in a terminal status")
            .expect("valid active_orders metric");

        let claim_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "claim_latency_seconds",
                "Latency of claim attempts in seconds",
            ),
            &["outcome"],
        )
        .expect("valid claim_latency_seconds metric");

        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(webhook_events_total.clone()))
            .expect("register webhook_events_total");
        registry
            .register(Box::new(active_orders.clone()))
            .expect("register active_orders");
        registry
            .register(Box::new(claim_latency_seconds.clone()))
            .expect("register claim_latency_seconds");

        Self {
            registry,
            order_transitions_total,
            webhook_events_total,
            active_orders,
            claim_latency_seconds,
        }
    }

    pub fn transition(&self, transition: &str, outcome: &str) {
        self.order_transitions_total
            .with_label_values(&[transition, outcome])
            .inc();
    }

    pub fn webhook(&self, kind: &str, outcome: &str) {
        self.webhook_events_total
            .with_label_values(&[kind, outcome])
            .inc();
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
