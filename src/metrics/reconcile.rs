//! Reconcile Phase Metrics
//!
//! Status transitions, insertions, enrichment fills and the final registry size.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::pipeline::processing::enrich::EnrichStats;
use crate::pipeline::processing::reconcile::ReconcileStats;

pub struct ReconcileMetrics;

impl ReconcileMetrics {
    pub fn record_reconcile(stats: &ReconcileStats) {
        let transitions = [
            ("untouched", stats.untouched),
            ("reopened", stats.reopened),
            ("renewed", stats.renewed),
            ("needs_review", stats.needs_review),
        ];
        for (to, count) in transitions {
            ::metrics::counter!(
                phase_metric!(counter, "reconcile", "status_transitions"),
                "to" => to
            )
            .increment(count as u64);
        }
        ::metrics::counter!(phase_metric!(counter, "reconcile", "records_inserted"))
            .increment((stats.inserted + stats.keyless_inserted) as u64);
    }

    pub fn record_enrich(stats: &EnrichStats) {
        ::metrics::counter!(phase_metric!(counter, "reconcile", "company_codes_backfilled"))
            .increment(stats.company_codes_backfilled as u64);
        ::metrics::counter!(phase_metric!(counter, "reconcile", "regions_filled"))
            .increment(stats.regions_filled as u64);
    }

    pub fn record_registry_size(rows: usize) {
        ::metrics::gauge!(phase_metric!(gauge, "reconcile", "registry_size")).set(rows as f64);
    }
}

impl PhaseMetrics for ReconcileMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "reconcile", "status_transitions"));
        let _ = ::metrics::counter!(phase_metric!(counter, "reconcile", "records_inserted"));
        let _ = ::metrics::counter!(phase_metric!(counter, "reconcile", "company_codes_backfilled"));
        let _ = ::metrics::counter!(phase_metric!(counter, "reconcile", "regions_filled"));
        let _ = ::metrics::gauge!(phase_metric!(gauge, "reconcile", "registry_size"));
    }

    fn phase_name() -> &'static str {
        "reconcile"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "reconcile", "status_transitions"),
                metric_type: MetricType::Counter,
                help: "Registry status changes by target status",
            },
            MetricDoc {
                name: phase_metric!(counter, "reconcile", "records_inserted"),
                metric_type: MetricType::Counter,
                help: "New records appended to the registry",
            },
            MetricDoc {
                name: phase_metric!(counter, "reconcile", "company_codes_backfilled"),
                metric_type: MetricType::Counter,
                help: "Company codes derived from the key prefix",
            },
            MetricDoc {
                name: phase_metric!(counter, "reconcile", "regions_filled"),
                metric_type: MetricType::Counter,
                help: "Blank regions filled from the mapping table",
            },
            MetricDoc {
                name: phase_metric!(gauge, "reconcile", "registry_size"),
                metric_type: MetricType::Gauge,
                help: "Rows in the registry written by the last run",
            },
        ]
    }
}
