use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub order_transitions_total: IntCounterVec,
    pub fee_quotes_total: IntCounterVec,
    pub open_orders: IntGauge,
    pub proximity_distance_km: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let order_transitions_total = IntCounterVec::new(
            Opts::new(
                "order_transitions_total",
                "Order lifecycle transitions by transition and outcome",
            ),
            &["transition", "outcome"],
        )
        .expect("valid order_transitions_total metric");

        let fee_quotes_total = IntCounterVec::new(
            Opts::new("fee_quotes_total", "Delivery fee quotes by mode and outcome"),
            &["mode", "outcome"],
        )
        .expect("valid fee_quotes_total metric");

        let open_orders = IntGauge::new(
            "open_orders",
            "Orders not yet delivered or canceled",
        )
        .expect("valid open_orders metric");

        let proximity_distance_km = Histogram::with_opts(HistogramOpts::new(
            "proximity_distance_km",
            "Computed buyer-to-zone distance for successful proximity quotes",
        ))
        .expect("valid proximity_distance_km metric");

        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(fee_quotes_total.clone()))
            .expect("register fee_quotes_total");
        registry
            .register(Box::new(open_orders.clone()))
            .expect("register open_orders");
        registry
            .register(Box::new(proximity_distance_km.clone()))
            .expect("register proximity_distance_km");

        Self {
            registry,
            order_transitions_total,
            fee_quotes_total,
            open_orders,
            proximity_distance_km,
        }
    }

    pub fn transition(&self, transition: &str, outcome: &str) {
        self.order_transitions_total
            .with_label_values(&[transition, outcome])
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
