//! Reading the registry snapshot written by a previous run.

use std::collections::HashMap;
use tracing::{info, warn};

use super::normalize_columns;
use super::values::{cell_date, cell_identifier, cell_text};
use crate::domain::{CaseField, CaseRecord, RawTable, Row};
use crate::error::{Result, RunWarning, SyncError};

/// Normalized header names accepted for each registry column
const KEY_COLUMNS: [&str; 2] = ["barcode", "key"];
const CHANNEL_COLUMN: &str = "channel";
const STATUS_COLUMN: &str = "status";
const RUN_DATE_COLUMNS: [&str; 2] = ["today", "run_date"];

const FIELD_COLUMNS: [(CaseField, &[&str]); 15] = [
    (CaseField::CompanyCode, &["company_code"]),
    (CaseField::VendorNumber, &["vendor_number"]),
    (CaseField::VendorName, &["vendor_name"]),
    (CaseField::Status, &[STATUS_COLUMN]),
    (CaseField::ReceivedDate, &["received_date"]),
    (CaseField::ReopenDate, &["reopen_date", "re_open_date"]),
    (CaseField::AllocationDate, &["allocation_date"]),
    (CaseField::ClarificationDate, &["clarification_date"]),
    (CaseField::CompletionDate, &["completion_date"]),
    (CaseField::Requester, &["requester"]),
    (CaseField::Remarks, &["remarks"]),
    (CaseField::Aging, &["aging"]),
    (CaseField::Region, &["region"]),
    (CaseField::Processor, &["processor"]),
    (CaseField::Category, &["category"]),
];

/// A parsed registry snapshot
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub records: Vec<CaseRecord>,
    pub warnings: Vec<RunWarning>,
}

fn first_present<'a>(table: &RawTable, candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|c| table.has_column(c))
}

/// Parse the registry snapshot. It must carry a key column (`Barcode` or
/// `Key`) and a `Status` column; everything else is optional and blank when absent.
pub fn parse_registry(table: &RawTable) -> Result<RegistrySnapshot> {
    let table = normalize_columns(table);

    let key_column = first_present(&table, &KEY_COLUMNS).ok_or_else(|| SyncError::RegistrySchema {
        column: "barcode".to_string(),
    })?;
    if !table.has_column(STATUS_COLUMN) {
        return Err(SyncError::RegistrySchema {
            column: STATUS_COLUMN.to_string(),
        });
    }
    let run_date_column = first_present(&table, &RUN_DATE_COLUMNS);

    let resolved: Vec<(CaseField, &str)> = FIELD_COLUMNS
        .iter()
        .filter_map(|(field, candidates)| first_present(&table, candidates).map(|c| (*field, c)))
        .collect();

    let records: Vec<CaseRecord> = table
        .rows
        .iter()
        .map(|row| parse_row(row, key_column, run_date_column, &resolved))
        .collect();

    let warnings = duplicate_key_warnings(&records);
    for warning in &warnings {
        warn!("{}", warning);
    }
    info!("Loaded {} records from registry snapshot", records.len());

    Ok(RegistrySnapshot { records, warnings })
}

fn parse_row(
    row: &Row,
    key_column: &str,
    run_date_column: Option<&str>,
    resolved: &[(CaseField, &str)],
) -> CaseRecord {
    let mut record = CaseRecord {
        key: cell_identifier(row.get(key_column)),
        channel: cell_text(row.get(CHANNEL_COLUMN)),
        run_date: run_date_column.and_then(|c| cell_date(row.get(c))),
        ..CaseRecord::default()
    };

    for (field, column) in resolved {
        if field.is_date() {
            if let Some(slot) = field.date_mut(&mut record) {
                *slot = cell_date(row.get(*column));
            }
        } else if let Some(slot) = field.text_mut(&mut record) {
            *slot = cell_text(row.get(*column));
        }
    }

    // Identifier columns compare as trimmed text
    record.company_code = record.company_code.trim().to_string();
    record.vendor_number = record.vendor_number.trim().to_string();
    record
}

/// Non-empty keys that appear more than once, in first-seen order
fn duplicate_key_warnings(records: &[CaseRecord]) -> Vec<RunWarning> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for record in records.iter().filter(|r| r.has_key()) {
        let count = counts.entry(record.key.as_str()).or_insert(0);
        if *count == 0 {
            order.push(record.key.as_str());
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter_map(|key| {
            let count = counts[key];
            (count > 1).then(|| RunWarning::DuplicateRegistryKey {
                key: key.to_string(),
                count,
            })
        })
        .collect()
}
