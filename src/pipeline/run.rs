use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{Channel, RawTable};
use crate::error::{Result, RunWarning, SyncError};
use crate::metrics::{NormalizeMetrics, ReconcileMetrics};
use crate::pipeline::processing::enrich::{enrich, EnrichStats};
use crate::pipeline::processing::normalize::snapshot::parse_registry;
use crate::pipeline::processing::normalize::{normalize_channel, ChannelExtract, SchemaRegistry};
use crate::pipeline::processing::project::{project, RegistryRow};
use crate::pipeline::processing::reconcile::{reconcile, ReconcileStats};

/// Decoded tables for one reconciliation run
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub extracts: BTreeMap<Channel, RawTable>,
    pub registry: RawTable,
    pub region_mapping: Option<RawTable>,
    pub run_date: NaiveDate,
}

/// What one channel contributed
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub channel: Channel,
    pub rows: usize,
    pub filtered_out: usize,
    pub skipped: bool,
}

/// Result of a complete reconciliation run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub channels: Vec<ChannelSummary>,
    pub registry_rows_in: usize,
    pub registry_rows_out: usize,
    pub reconcile: ReconcileStats,
    pub enrich: EnrichStats,
    pub warnings: Vec<RunWarning>,
    /// SHA-256 of the written artifact, set once it is persisted
    pub output_sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub rows: Vec<RegistryRow>,
    pub report: RunReport,
}

pub struct Pipeline;

impl Pipeline {
    /// Normalize every extract, reconcile against the registry snapshot,
    /// enrich and project. Fails before producing rows when a required input
    /// is absent, the snapshot is unusable, or no channel yields any rows.
    pub fn run(inputs: RunInputs, config: &Config) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile_run", run_id = %run_id, run_date = %inputs.run_date);
        let _enter = span.enter();

        let schemas = SchemaRegistry::from_config(config);
        for channel in schemas.required_channels() {
            if !inputs.extracts.contains_key(&channel) {
                return Err(SyncError::MissingRequiredInput(format!("{} extract", channel)));
            }
        }

        let snapshot = parse_registry(&inputs.registry)?;
        let mut warnings = snapshot.warnings;
        let registry_rows_in = snapshot.records.len();

        let mut extracts: Vec<ChannelExtract> = Vec::new();
        let mut channels: Vec<ChannelSummary> = Vec::new();
        for schema in schemas.iter() {
            let channel = schema.channel;
            let table = match inputs.extracts.get(&channel) {
                Some(table) if !table.is_empty() => table,
                _ if schema.required => {
                    let warning = RunWarning::EmptyExtract { channel };
                    warn!("{}", warning);
                    warnings.push(warning);
                    NormalizeMetrics::record_channel_skipped(channel);
                    channels.push(ChannelSummary::skipped(channel));
                    continue;
                }
                _ => {
                    info!("{} extract not provided or empty, skipping", channel);
                    channels.push(ChannelSummary::skipped(channel));
                    continue;
                }
            };

            let extract = normalize_channel(schema, table, inputs.run_date);
            let missing_key = extract
                .warnings
                .iter()
                .any(|w| matches!(w, RunWarning::MissingKeyColumn { .. }));
            if missing_key {
                NormalizeMetrics::record_channel_skipped(channel);
            }
            NormalizeMetrics::record_rows_collected(channel, extract.records.len());
            NormalizeMetrics::record_rows_filtered(channel, extract.filtered_out);

            channels.push(ChannelSummary {
                channel,
                rows: extract.records.len(),
                filtered_out: extract.filtered_out,
                skipped: missing_key,
            });
            warnings.extend(extract.warnings.iter().cloned());
            extracts.push(extract);
        }

        let collected: usize = extracts.iter().map(|e| e.records.len()).sum();
        if collected == 0 {
            return Err(SyncError::NoData);
        }
        info!("Collected {} rows across {} channels", collected, extracts.len());

        let reconciliation = reconcile(
            snapshot.records,
            &extracts,
            &schemas.trigger_channels(),
            config,
            inputs.run_date,
        );
        ReconcileMetrics::record_reconcile(&reconciliation.stats);

        let mut records = reconciliation.records;
        let (enrich_stats, enrich_warnings) = enrich(&mut records, inputs.region_mapping.as_ref());
        ReconcileMetrics::record_enrich(&enrich_stats);
        warnings.extend(enrich_warnings);

        let rows = project(&records);
        ReconcileMetrics::record_registry_size(rows.len());
        info!(
            "Registry reconciled: {} rows in, {} rows out, {} warnings",
            registry_rows_in,
            rows.len(),
            warnings.len()
        );

        Ok(RunOutcome {
            report: RunReport {
                run_id,
                run_date: inputs.run_date,
                channels,
                registry_rows_in,
                registry_rows_out: rows.len(),
                reconcile: reconciliation.stats,
                enrich: enrich_stats,
                warnings,
                output_sha256: None,
            },
            rows,
        })
    }
}

impl ChannelSummary {
    fn skipped(channel: Channel) -> Self {
        Self {
            channel,
            rows: 0,
            filtered_out: 0,
            skipped: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn grid(columns: &[&str], rows: Vec<Vec<Value>>) -> RawTable {
        RawTable::from_grid(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn registry() -> RawTable {
        grid(
            &["Barcode", "Channel", "Status", "Company code", "Region"],
            vec![
                vec![json!("1002"), json!("PISA"), json!("Completed"), json!("DE01"), json!(null)],
                vec![json!("1003"), json!("ESM"), json!("Untouched"), json!("US10"), json!(null)],
                vec![json!("1004"), json!("PM7"), json!("Completed"), json!("DE01"), json!("APAC")],
            ],
        )
    }

    fn inputs() -> RunInputs {
        let mut extracts = BTreeMap::new();
        extracts.insert(
            Channel::Pisa,
            grid(
                &["Barcode", "Assigned User", "Company Code"],
                vec![
                    vec![json!("1002"), json!("Sunitha S"), json!("DE01")],
                    vec![json!("1001"), json!("Varunkumar N"), json!("DE01")],
                ],
            ),
        );
        extracts.insert(Channel::Esm, grid(&["Barcode", "State"], vec![]));
        extracts.insert(
            Channel::Pm7,
            grid(&["Barcode", "Task"], vec![vec![json!("DE01999"), json!("Open")]]),
        );
        extracts.insert(
            Channel::Rgpa,
            grid(&["Key", "Summary"], vec![vec![json!("R-1"), json!("no assignee column")]]),
        );

        RunInputs {
            extracts,
            registry: registry(),
            region_mapping: Some(grid(
                &["R3 CoCo", "Region"],
                vec![vec![json!("DE01"), json!("EMEA")]],
            )),
            run_date: run_date(),
        }
    }

    fn row<'a>(outcome: &'a RunOutcome, key: &str) -> &'a RegistryRow {
        outcome.rows.iter().find(|r| r.key == key).unwrap()
    }

    #[test]
    fn test_full_run() {
        let outcome = Pipeline::run(inputs(), &Config::default()).unwrap();

        assert_eq!(row(&outcome, "1001").status, "New");
        assert_eq!(row(&outcome, "1001").allocation_date, "6/2/2025");
        assert_eq!(row(&outcome, "1002").status, "Reopen");
        assert_eq!(row(&outcome, "1003").status, "Needs Review");
        assert_eq!(row(&outcome, "1004").status, "Completed");
        assert_eq!(row(&outcome, "1004").region, "APAC");
        assert_eq!(row(&outcome, "1002").region, "EMEA");
        assert_eq!(row(&outcome, "DE01999").company_code, "DE01");
        assert_eq!(row(&outcome, "DE01999").region, "EMEA");
        assert_eq!(row(&outcome, "R-1").processor, "Divya");

        let report = &outcome.report;
        assert_eq!(report.registry_rows_in, 3);
        assert_eq!(report.registry_rows_out, 6);
        assert_eq!(report.reconcile.inserted, 3);
        assert!(report.warnings.contains(&RunWarning::EmptyExtract { channel: Channel::Esm }));
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            RunWarning::MissingFilterColumn { column, .. } if column == "current_assignee"
        )));
    }

    #[test]
    fn test_filtered_rows_do_not_keep_registry_keys_alive() {
        let mut inputs = inputs();
        inputs.registry = grid(
            &["Barcode", "Channel", "Status"],
            vec![
                vec![json!("2001"), json!("PISA"), json!("new")],
                vec![json!("2003"), json!("RGPA"), json!("Untouched")],
            ],
        );
        inputs.extracts.insert(
            Channel::Pisa,
            grid(
                &["Barcode", "Assigned User"],
                vec![
                    vec![json!("2001"), json!("Not Listed")],
                    vec![json!("2002"), json!("Sunitha S")],
                ],
            ),
        );
        inputs.extracts.insert(
            Channel::Rgpa,
            grid(
                &["Key", "Current Assignee"],
                vec![vec![json!("2003"), json!("Other Team")]],
            ),
        );

        let outcome = Pipeline::run(inputs, &Config::default()).unwrap();

        // the only extract rows for 2001 and 2003 were filtered out
        assert_eq!(row(&outcome, "2001").status, "Needs Review");
        assert_eq!(row(&outcome, "2003").status, "Needs Review");
        assert_eq!(row(&outcome, "2002").status, "New");
        assert_eq!(outcome.rows.iter().filter(|r| r.key == "2001").count(), 1);
        assert_eq!(outcome.report.reconcile.untouched, 0);
        assert_eq!(outcome.report.reconcile.needs_review, 2);
    }

    #[test]
    fn test_missing_required_extract() {
        let mut inputs = inputs();
        inputs.extracts.remove(&Channel::Pm7);
        assert!(matches!(
            Pipeline::run(inputs, &Config::default()),
            Err(SyncError::MissingRequiredInput(_))
        ));
    }

    #[test]
    fn test_optional_workon_absent_is_not_a_warning() {
        let outcome = Pipeline::run(inputs(), &Config::default()).unwrap();
        assert!(!outcome
            .report
            .warnings
            .iter()
            .any(|w| matches!(w, RunWarning::EmptyExtract { channel: Channel::Workon })));
    }

    #[test]
    fn test_no_rows_anywhere_is_fatal() {
        let mut inputs = inputs();
        for table in inputs.extracts.values_mut() {
            table.rows.clear();
        }
        assert!(matches!(
            Pipeline::run(inputs, &Config::default()),
            Err(SyncError::NoData)
        ));
    }
}
