//! Registration of all phase metrics, with duplicate-name detection.

use crate::metrics::{MetricDoc, NormalizeMetrics, PhaseMetrics, ReconcileMetrics, SupplierMetrics};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<NormalizeMetrics>(&mut all_metrics);
    register_phase_metrics::<ReconcileMetrics>(&mut all_metrics);
    register_phase_metrics::<SupplierMetrics>(&mut all_metrics);

    info!("Registered {} metrics across all phases", all_metrics.len());
    for doc in all_metrics.values() {
        debug!("  - {} ({:?}): {}", doc.name, doc.metric_type, doc.help);
    }
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    let conflicts = merge_docs(all_metrics, T::metrics_documentation());
    for name in conflicts {
        warn!(
            "Metric name conflict: '{}' registered again by phase '{}'",
            name,
            T::phase_name()
        );
    }
}

/// Merge docs into the map, returning names that were already present
fn merge_docs(
    all_metrics: &mut HashMap<&'static str, MetricDoc>,
    docs: Vec<MetricDoc>,
) -> Vec<&'static str> {
    let mut conflicts = Vec::new();
    for doc in docs {
        if all_metrics.contains_key(doc.name) {
            conflicts.push(doc.name);
        } else {
            all_metrics.insert(doc.name, doc);
        }
    }
    conflicts
}
