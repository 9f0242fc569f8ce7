use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::app::ports::{ArtifactSinkPort, TableSourcePort};
use crate::config::SupplierConfig;
use crate::error::{Result, RunWarning, SyncError};
use crate::metrics::SupplierMetrics;
use crate::pipeline::processing::supplier::classify_suppliers;

#[derive(Debug, Clone)]
pub struct SupplierRequest {
    pub incoming: String,
    pub reference: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplierReport {
    pub run_id: Uuid,
    pub classified: usize,
    pub new: usize,
    pub hold: usize,
    pub excluded: usize,
    pub warnings: Vec<RunWarning>,
    pub output_sha256: String,
}

/// Classifies a batch of supplier requests and writes the result
pub struct SupplierUseCase {
    source: Box<dyn TableSourcePort>,
    sink: Box<dyn ArtifactSinkPort>,
}

impl SupplierUseCase {
    pub fn new(source: Box<dyn TableSourcePort>, sink: Box<dyn ArtifactSinkPort>) -> Self {
        Self { source, sink }
    }

    pub async fn execute(&self, request: &SupplierRequest, config: &SupplierConfig) -> Result<SupplierReport> {
        let run_id = Uuid::new_v4();
        self.classify(run_id, request, config)
            .instrument(info_span!("supplier_run", run_id = %run_id))
            .await
    }

    async fn classify(
        &self,
        run_id: Uuid,
        request: &SupplierRequest,
        config: &SupplierConfig,
    ) -> Result<SupplierReport> {
        let mut tables = Vec::with_capacity(2);
        for location in [&request.incoming, &request.reference] {
            let table = self.source.load(location).await?.ok_or_else(|| {
                SyncError::MissingRequiredInput(format!("supplier table at '{}'", location))
            })?;
            tables.push(table);
        }
        let (incoming, reference) = (&tables[0], &tables[1]);

        let outcome = classify_suppliers(incoming, reference, config)?;
        SupplierMetrics::record_classified(outcome.new, outcome.hold);
        SupplierMetrics::record_excluded(outcome.excluded);

        let bytes = serde_json::to_vec_pretty(&outcome.rows)?;
        let digest = self.sink.write(&request.output, bytes).await?;
        info!("Supplier classification written to {}", request.output);

        Ok(SupplierReport {
            run_id,
            classified: outcome.rows.len(),
            new: outcome.new,
            hold: outcome.hold,
            excluded: outcome.excluded,
            warnings: outcome.warnings,
            output_sha256: digest,
        })
    }
}
