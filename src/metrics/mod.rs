//! Metrics for the registry sync pipeline
//!
//! Each pipeline phase defines its own metrics in a dedicated submodule. A run
//! is a short-lived batch job, so instead of serving a scrape endpoint the
//! rendered snapshot can be written to a text file at the end of the run
//! (node-exporter textfile collector format).

pub mod normalize;
pub mod reconcile;
pub mod registry;
pub mod supplier;

pub use normalize::NormalizeMetrics;
pub use reconcile::ReconcileMetrics;
pub use supplier::SupplierMetrics;

use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and register all phase metrics. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        match builder.install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("Prometheus handle already stored");
                }
                registry::register_all_metrics();
                info!("Prometheus recorder installed");
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

pub fn get_handle() -> Option<&'static metrics_exporter_prometheus::PrometheusHandle> {
    HANDLE.get()
}

/// Write the current snapshot in Prometheus text format. No-op when the
/// recorder was never installed.
pub fn write_snapshot(path: &Path) -> std::io::Result<()> {
    match get_handle() {
        Some(handle) => {
            std::fs::write(path, handle.render())?;
            info!("Metrics snapshot written to {}", path.display());
            Ok(())
        }
        None => {
            warn!("Metrics recorder not installed, snapshot skipped");
            Ok(())
        }
    }
}

/// Trait for phase-specific metrics collections
pub trait PhaseMetrics {
    /// Register all metrics for this phase so they appear in every snapshot
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Gauge,
}

/// Metric names follow `case_registry_{phase}_{name}[_total]`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("case_registry_", $phase, "_", $name, "_total")
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("case_registry_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
