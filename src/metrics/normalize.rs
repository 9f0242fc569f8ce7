//! Normalize Phase Metrics
//!
//! Rows collected per channel, rows dropped by filters, and degraded channels.

use crate::domain::Channel;
use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct NormalizeMetrics;

impl NormalizeMetrics {
    pub fn record_rows_collected(channel: Channel, rows: usize) {
        ::metrics::counter!(
            phase_metric!(counter, "normalize", "rows_collected"),
            "channel" => channel.label()
        )
        .increment(rows as u64);
    }

    pub fn record_rows_filtered(channel: Channel, rows: usize) {
        ::metrics::counter!(
            phase_metric!(counter, "normalize", "rows_filtered"),
            "channel" => channel.label()
        )
        .increment(rows as u64);
    }

    pub fn record_channel_skipped(channel: Channel) {
        ::metrics::counter!(
            phase_metric!(counter, "normalize", "channels_skipped"),
            "channel" => channel.label()
        )
        .increment(1);
    }

    pub fn record_filter_fail_open() {
        ::metrics::counter!(phase_metric!(counter, "normalize", "filter_fail_open")).increment(1);
    }
}

impl PhaseMetrics for NormalizeMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "rows_collected"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "rows_filtered"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "channels_skipped"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "filter_fail_open"));
    }

    fn phase_name() -> &'static str {
        "normalize"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "normalize", "rows_collected"),
                metric_type: MetricType::Counter,
                help: "Canonical rows accepted into the extract set",
            },
            MetricDoc {
                name: phase_metric!(counter, "normalize", "rows_filtered"),
                metric_type: MetricType::Counter,
                help: "Rows dropped by a channel inclusion filter",
            },
            MetricDoc {
                name: phase_metric!(counter, "normalize", "channels_skipped"),
                metric_type: MetricType::Counter,
                help: "Channels that contributed no rows because of a schema problem",
            },
            MetricDoc {
                name: phase_metric!(counter, "normalize", "filter_fail_open"),
                metric_type: MetricType::Counter,
                help: "Filters skipped because their column was absent",
            },
        ]
    }
}
