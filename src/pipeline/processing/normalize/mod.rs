//! Channel normalization: raw extract rows into canonical case records.

pub mod registry;
pub mod schema;
pub mod snapshot;
pub mod values;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::domain::{CaseRecord, Channel, RawTable, Row};
use crate::error::RunWarning;
use schema::{ChannelSchema, FieldSource, FixedValue};
use values::{cell_date, cell_identifier, cell_text};

pub use registry::SchemaRegistry;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("valid regex"));

/// Canonical form of a column header: lowercase, whitespace runs become `_`,
/// anything outside `[a-z0-9_]` is dropped, surrounding `_` trimmed.
/// Applying it twice gives the same result as applying it once.
pub fn normalize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let underscored = WHITESPACE_RUN.replace_all(&lowered, "_");
    let cleaned = DISALLOWED.replace_all(&underscored, "");
    cleaned.trim_matches('_').to_string()
}

/// Rename every column to its normalized form. When two headers collide
/// after normalization the first one keeps its cells.
pub fn normalize_columns(table: &RawTable) -> RawTable {
    let mut columns: Vec<String> = Vec::with_capacity(table.columns.len());
    let mut renames: Vec<(String, String)> = Vec::with_capacity(table.columns.len());
    for original in &table.columns {
        let normalized = normalize_column_name(original);
        if columns.contains(&normalized) {
            debug!("Column '{}' collides with an earlier column after normalization", original);
            continue;
        }
        columns.push(normalized.clone());
        renames.push((original.clone(), normalized));
    }

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut out = Row::new();
            for (original, normalized) in &renames {
                if let Some(value) = row.get(original) {
                    out.insert(normalized.clone(), value.clone());
                }
            }
            out
        })
        .collect();

    RawTable { columns, rows }
}

/// The canonical rows one channel contributed to a run
#[derive(Debug, Clone)]
pub struct ChannelExtract {
    pub channel: Channel,
    pub records: Vec<CaseRecord>,
    /// Rows removed by the channel's inclusion filter
    pub filtered_out: usize,
    pub warnings: Vec<RunWarning>,
}

impl ChannelExtract {
    fn skipped(channel: Channel, warnings: Vec<RunWarning>) -> Self {
        Self {
            channel,
            records: Vec::new(),
            filtered_out: 0,
            warnings,
        }
    }
}

/// Normalize, filter and map one channel's raw extract.
///
/// A missing key column skips the whole channel with a `MissingKeyColumn`
/// warning; a missing filter column keeps every row with a `MissingFilterColumn` warning.
pub fn normalize_channel(schema: &ChannelSchema, table: &RawTable, run_date: NaiveDate) -> ChannelExtract {
    let channel = schema.channel;
    let table = normalize_columns(table);

    if !table.has_column(schema.key_column) {
        warn!(
            "{}: '{}' column not found after cleaning, skipping {} processing",
            channel, schema.key_column, channel
        );
        return ChannelExtract::skipped(
            channel,
            vec![RunWarning::MissingKeyColumn {
                channel,
                column: schema.key_column.to_string(),
            }],
        );
    }

    let (rows, filtered_out, warnings) = match &schema.filter {
        Some(filter) => {
            let outcome = filter.apply(channel.label(), table);
            (outcome.rows, outcome.excluded, outcome.warnings)
        }
        None => (table.rows, 0, Vec::new()),
    };

    let records: Vec<CaseRecord> = rows
        .iter()
        .map(|row| map_row(schema, row, run_date))
        .collect();

    info!("Collected {} rows from {}", records.len(), channel);

    ChannelExtract {
        channel,
        records,
        filtered_out,
        warnings,
    }
}

/// Map a single normalized row. Every canonical field is assigned, blank when
/// the channel has no source for it.
pub fn map_row(schema: &ChannelSchema, row: &Row, run_date: NaiveDate) -> CaseRecord {
    let mut record = CaseRecord {
        key: cell_identifier(row.get(schema.key_column)),
        channel: schema.channel.label().to_string(),
        run_date: Some(run_date),
        ..CaseRecord::default()
    };

    for mapping in &schema.fields {
        let value = match &mapping.source {
            FieldSource::Column(column) => row.get(*column),
            FieldSource::ColumnWhen {
                column,
                when_column,
                equals,
            } => {
                let gate = cell_text(row.get(*when_column));
                if gate.trim().eq_ignore_ascii_case(equals) {
                    row.get(*column)
                } else {
                    None
                }
            }
        };

        if mapping.field.is_date() {
            if let Some(date) = mapping.field.date_mut(&mut record) {
                *date = cell_date(value);
            }
        } else if let Some(text) = mapping.field.text_mut(&mut record) {
            *text = cell_text(value);
        }
    }

    for fixed in &schema.overrides {
        match &fixed.value {
            FixedValue::Text(text) => {
                if let Some(slot) = fixed.field.text_mut(&mut record) {
                    *slot = text.clone();
                }
            }
            FixedValue::RunDate => {
                if let Some(slot) = fixed.field.date_mut(&mut record) {
                    *slot = Some(run_date);
                }
            }
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn grid(columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> RawTable {
        RawTable::from_grid(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn test_column_name_normalization() {
        assert_eq!(normalize_column_name("  Company Code "), "company_code");
        assert_eq!(normalize_column_name("Re-Open Date"), "reopen_date");
        assert_eq!(normalize_column_name("Vendor   number"), "vendor_number");
        assert_eq!(normalize_column_name("_Key_"), "key");
        assert_eq!(normalize_column_name("R/3 CoCo"), "r3_coco");
        assert_eq!(normalize_column_name("Short\tdescription"), "short_description");
    }

    #[test]
    fn test_column_name_normalization_is_idempotent() {
        for name in ["  Company Code ", "Re-Open Date", "__A  b__", "Current Assignee", "ÄÖ x"] {
            let once = normalize_column_name(name);
            assert_eq!(normalize_column_name(&once), once);
        }
    }

    #[test]
    fn test_pm7_row_mapping() {
        let registry = SchemaRegistry::from_config(&Config::default());
        let table = grid(
            &["Barcode", "Vendor Name", "Vendor Number", "Company Code", "Received Date", "Task"],
            vec![vec![
                json!(4711001.0),
                json!("ACME GmbH"),
                json!(90001),
                json!(null),
                json!("2025-05-30"),
                json!("Pending approval"),
            ]],
        );

        let extract = normalize_channel(registry.get(Channel::Pm7).unwrap(), &table, run_date());
        assert_eq!(extract.records.len(), 1);
        let record = &extract.records[0];
        assert_eq!(record.key, "4711001");
        assert_eq!(record.channel, "PM7");
        assert_eq!(record.vendor_number, "90001");
        assert_eq!(record.company_code, "");
        assert_eq!(record.status, "Pending approval");
        assert_eq!(record.received_date, NaiveDate::from_ymd_opt(2025, 5, 30));
        assert_eq!(record.run_date, Some(run_date()));
        assert_eq!(record.processor, "");
        assert_eq!(record.allocation_date, None);
    }

    #[test]
    fn test_workon_overrides_win() {
        let registry = SchemaRegistry::from_config(&Config::default());
        let table = grid(
            &["Key", "Processor", "Allocation Date", "Country", "Name", "Applicant"],
            vec![vec![
                json!("WO-1"),
                json!("Somebody"),
                json!("2020-01-01"),
                json!("Germany"),
                json!("Vendor One"),
                json!("J. Doe"),
            ]],
        );

        let extract = normalize_channel(registry.get(Channel::Workon).unwrap(), &table, run_date());
        let record = &extract.records[0];
        assert_eq!(record.processor, "Jayapal");
        assert_eq!(record.allocation_date, Some(run_date()));
        assert_eq!(record.region, "Germany");
        assert_eq!(record.vendor_name, "Vendor One");
        assert_eq!(record.requester, "J. Doe");
        assert_eq!(record.channel, "Workon");
    }

    #[test]
    fn test_esm_reopen_date_only_when_reopened() {
        let registry = SchemaRegistry::from_config(&Config::default());
        let table = grid(
            &["Barcode", "State", "Updated", "Closed"],
            vec![
                vec![json!("1"), json!("Reopened"), json!("2025-05-01"), json!(null)],
                vec![json!("2"), json!("Closed"), json!("2025-05-02"), json!("2025-05-03")],
            ],
        );

        let extract = normalize_channel(registry.get(Channel::Esm).unwrap(), &table, run_date());
        assert_eq!(extract.records[0].reopen_date, NaiveDate::from_ymd_opt(2025, 5, 1));
        assert_eq!(extract.records[0].completion_date, None);
        assert_eq!(extract.records[1].reopen_date, None);
        assert_eq!(extract.records[1].completion_date, NaiveDate::from_ymd_opt(2025, 5, 3));
        assert_eq!(extract.records[1].status, "Closed");
    }

    #[test]
    fn test_missing_key_column_skips_channel() {
        let registry = SchemaRegistry::from_config(&Config::default());
        let table = grid(&["Case Id", "Summary"], vec![vec![json!("1"), json!("x")]]);

        let extract = normalize_channel(registry.get(Channel::Rgpa).unwrap(), &table, run_date());
        assert!(extract.records.is_empty());
        assert_eq!(
            extract.warnings,
            vec![RunWarning::MissingKeyColumn {
                channel: Channel::Rgpa,
                column: "key".to_string(),
            }]
        );
    }

    #[test]
    fn test_filter_runs_before_mapping() {
        let registry = SchemaRegistry::from_config(&Config::default());
        let table = grid(
            &["Barcode", "Assigned User"],
            vec![
                vec![json!("10"), json!("Sunitha S")],
                vec![json!("11"), json!("Not On List")],
            ],
        );

        let extract = normalize_channel(registry.get(Channel::Pisa).unwrap(), &table, run_date());
        assert_eq!(extract.records.len(), 1);
        assert_eq!(extract.records[0].key, "10");
        assert_eq!(extract.filtered_out, 1);
    }

    #[test]
    fn test_blank_key_is_kept_as_keyless_row() {
        let registry = SchemaRegistry::from_config(&Config::default());
        let table = grid(&["Barcode", "Task"], vec![vec![json!(null), json!("Open")]]);

        let extract = normalize_channel(registry.get(Channel::Pm7).unwrap(), &table, run_date());
        assert_eq!(extract.records.len(), 1);
        assert!(!extract.records[0].has_key());
    }
}
