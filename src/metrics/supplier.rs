//! Supplier Phase Metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct SupplierMetrics;

impl SupplierMetrics {
    pub fn record_classified(new: usize, hold: usize) {
        ::metrics::counter!(phase_metric!(counter, "supplier", "classified"), "status" => "new")
            .increment(new as u64);
        ::metrics::counter!(phase_metric!(counter, "supplier", "classified"), "status" => "hold")
            .increment(hold as u64);
    }

    pub fn record_excluded(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "supplier", "excluded")).increment(rows as u64);
    }
}

impl PhaseMetrics for SupplierMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "supplier", "classified"));
        let _ = ::metrics::counter!(phase_metric!(counter, "supplier", "excluded"));
    }

    fn phase_name() -> &'static str {
        "supplier"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "supplier", "classified"),
                metric_type: MetricType::Counter,
                help: "Supplier requests classified, by status",
            },
            MetricDoc {
                name: phase_metric!(counter, "supplier", "excluded"),
                metric_type: MetricType::Counter,
                help: "Supplier requests excluded by country",
            },
        ]
    }
}
