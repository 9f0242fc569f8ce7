use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

use crate::app::ports::{ArtifactSinkPort, TableSourcePort};
use crate::config::Config;
use crate::domain::{Channel, RawTable};
use crate::error::{Result, SyncError};
use crate::pipeline::{Pipeline, RunInputs, RunReport};

/// Locations of every input and the output of one reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub extracts: BTreeMap<Channel, String>,
    pub registry: String,
    pub region_mapping: Option<String>,
    pub output: String,
    pub run_date: NaiveDate,
}

/// Loads the run's tables, runs the pipeline and writes the registry artifact
pub struct ReconcileUseCase {
    source: Box<dyn TableSourcePort>,
    sink: Box<dyn ArtifactSinkPort>,
}

impl ReconcileUseCase {
    pub fn new(source: Box<dyn TableSourcePort>, sink: Box<dyn ArtifactSinkPort>) -> Self {
        Self { source, sink }
    }

    async fn require(&self, location: &str, what: &str) -> Result<RawTable> {
        self.source
            .load(location)
            .await?
            .ok_or_else(|| SyncError::MissingRequiredInput(format!("{} at '{}'", what, location)))
    }

    pub async fn execute(&self, request: &ReconcileRequest, config: &Config) -> Result<RunReport> {
        let mut extracts = BTreeMap::new();
        for (channel, location) in &request.extracts {
            match self.source.load(location).await? {
                Some(table) => {
                    info!("Loaded {} extract with {} rows", channel, table.len());
                    extracts.insert(*channel, table);
                }
                None => info!("{} extract not found at '{}'", channel, location),
            }
        }

        let registry = self.require(&request.registry, "registry snapshot").await?;
        let region_mapping = match &request.region_mapping {
            Some(location) => self.source.load(location).await?,
            None => None,
        };

        let outcome = Pipeline::run(
            RunInputs {
                extracts,
                registry,
                region_mapping,
                run_date: request.run_date,
            },
            config,
        )?;

        let bytes = serde_json::to_vec_pretty(&outcome.rows)?;
        let digest = self.sink.write(&request.output, bytes).await?;
        info!("Registry written to {} (sha256 {})", request.output, digest);

        let mut report = outcome.report;
        report.output_sha256 = Some(digest);
        Ok(report)
    }
}
