use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

// ============================================================================
// Metrics Module - Prometheus metrics for the order engine
// ============================================================================
//
// Provides metrics for:
// - Service operations (count by outcome, latency)
// - Optimistic-concurrency rejections
// - Price computations
//
// Exposure over HTTP belongs to whatever transport embeds the engine;
// `render` produces the text exposition format for it.
// ============================================================================

/// Metrics registry owned by one engine instance
pub struct Metrics {
    registry: Registry,

    pub operations_total: IntCounterVec,
    pub operation_duration: HistogramVec,
    pub version_conflicts: IntCounter,
    pub pricing_computations: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new("order_operations_total", "Total order service operations by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("order_operation_duration_seconds", "Order service operation duration")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let version_conflicts = IntCounter::new(
            "order_version_conflicts_total",
            "Saves rejected because the order changed since it was loaded",
        )?;
        registry.register(Box::new(version_conflicts.clone()))?;

        let pricing_computations = IntCounter::new(
            "pricing_computations_total",
            "Total final-price computations",
        )?;
        registry.register(Box::new(pricing_computations.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            operation_duration,
            version_conflicts,
            pricing_computations,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one finished operation; `outcome` is "ok" or an error kind
    pub fn record_operation(&self, operation: &str, outcome: &str, duration_secs: f64) {
        self.operations_total.with_label_values(&[operation, outcome]).inc();
        self.operation_duration.with_label_values(&[operation]).observe(duration_secs);
    }

    pub fn record_version_conflict(&self) {
        self.version_conflicts.inc();
    }

    pub fn record_pricing(&self) {
        self.pricing_computations.inc();
    }

    /// Text exposition format of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_pricing();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_operation_by_outcome() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("add_item", "ok", 0.002);
        metrics.record_operation("add_item", "conflict", 0.001);
        metrics.record_operation("add_item", "ok", 0.003);

        let ok = metrics.operations_total.with_label_values(&["add_item", "ok"]).get();
        let conflict = metrics.operations_total.with_label_values(&["add_item", "conflict"]).get();
        assert_eq!(ok, 2);
        assert_eq!(conflict, 1);
        assert_eq!(
            metrics.operation_duration.with_label_values(&["add_item"]).get_sample_count(),
            3
        );
    }

    #[test]
    fn test_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record_version_conflict();
        metrics.record_pricing();
        metrics.record_pricing();

        assert_eq!(metrics.version_conflicts.get(), 1);
        assert_eq!(metrics.pricing_computations.get(), 2);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("create_order", "ok", 0.01);

        let text = metrics.render().unwrap();
        assert!(text.contains("order_operations_total{operation=\"create_order\",outcome=\"ok\"} 1"));
        assert!(text.contains("# TYPE order_operation_duration_seconds histogram"));
    }
}
