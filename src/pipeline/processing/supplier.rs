//! New/Hold classification of incoming supplier requests against the
//! existing supplier records.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::SupplierConfig;
use crate::constants::status;
use crate::domain::{RawTable, Row};
use crate::error::{Result, RunWarning, SyncError};
use crate::pipeline::processing::filter::FilterPredicate;
use crate::pipeline::processing::normalize::normalize_columns;
use crate::pipeline::processing::normalize::values::{cell_date, cell_identifier, cell_text, is_blank};
use crate::pipeline::processing::project::format_date;

const COUNTRY_COLUMN: &str = "country";
const KEY_SEPARATOR: &str = "|";

/// One classified request. Field order is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRow {
    #[serde(rename = "Valid From")]
    pub valid_from: String,
    #[serde(rename = "Company Code")]
    pub company_code: String,
    #[serde(rename = "Type")]
    pub request_type: String,
    #[serde(rename = "Case Number")]
    pub case_number: String,
    #[serde(rename = "Supplier Name")]
    pub supplier_name: String,
    #[serde(rename = "Street")]
    pub street: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Postal Code")]
    pub postal_code: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Requested By")]
    pub requested_by: String,
    #[serde(rename = "Approved By")]
    pub approved_by: String,
    #[serde(rename = "Approval Date")]
    pub approval_date: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Assigned")]
    pub assigned: String,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierOutcome {
    pub rows: Vec<SupplierRow>,
    pub new: usize,
    pub hold: usize,
    /// Requests dropped by the country exclusion
    pub excluded: usize,
    pub warnings: Vec<RunWarning>,
}

fn require_key_columns(table: &RawTable, name: &str, key_columns: &[String]) -> Result<()> {
    match key_columns.iter().find(|c| !table.has_column(c)) {
        Some(column) => Err(SyncError::SupplierSchema {
            table: name.to_string(),
            column: column.clone(),
        }),
        None => Ok(()),
    }
}

/// Trimmed, uppercased key cells joined in configured order
pub fn composite_key(row: &Row, key_columns: &[String]) -> String {
    key_columns
        .iter()
        .map(|c| cell_identifier(row.get(c.as_str())).to_uppercase())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Classify every incoming request that survives the country exclusion.
///
/// A request whose composite key is already among the reference records is
/// `Hold`; so is any repeat of a key seen earlier in the same batch.
/// Everything else is `New`.
pub fn classify_suppliers(
    incoming: &RawTable,
    reference: &RawTable,
    config: &SupplierConfig,
) -> Result<SupplierOutcome> {
    let incoming = normalize_columns(incoming);
    let reference = normalize_columns(reference);
    let key_columns = &config.key_columns;

    require_key_columns(&incoming, "incoming", key_columns)?;
    require_key_columns(&reference, "reference", key_columns)?;

    let known: HashSet<String> = reference
        .rows
        .iter()
        .map(|row| composite_key(row, key_columns))
        .collect();
    info!("Reference table holds {} distinct supplier keys", known.len());

    let exclusion = FilterPredicate::exclude_set(COUNTRY_COLUMN, &config.excluded_countries);
    let filtered = exclusion.apply("Supplier requests", incoming);

    let mut outcome = SupplierOutcome {
        excluded: filtered.excluded,
        warnings: filtered.warnings,
        ..SupplierOutcome::default()
    };
    let mut seen: HashSet<String> = HashSet::new();

    for row in &filtered.rows {
        let key = composite_key(row, key_columns);
        let first_in_batch = seen.insert(key.clone());
        let request_status = if first_in_batch && !known.contains(&key) {
            outcome.new += 1;
            status::NEW
        } else {
            outcome.hold += 1;
            status::HOLD
        };
        debug!("Supplier key '{}' classified as {}", key, request_status);
        outcome.rows.push(project_request(row, request_status, &config.assigned_to));
    }

    info!(
        "Classified {} supplier requests: {} new, {} hold, {} excluded by country",
        outcome.rows.len(),
        outcome.new,
        outcome.hold,
        outcome.excluded
    );
    Ok(outcome)
}

fn project_request(row: &Row, request_status: &str, assigned_to: &str) -> SupplierRow {
    let text = |column: &str| cell_text(row.get(column));
    let mut company_code = cell_identifier(row.get("company_code"));
    if is_blank(&company_code) {
        company_code = cell_identifier(row.get("branch_code"));
    }

    SupplierRow {
        valid_from: format_date(cell_date(row.get("valid_from"))),
        company_code,
        request_type: text("type"),
        case_number: cell_identifier(row.get("case_number")),
        supplier_name: text("supplier_name"),
        street: text("street"),
        city: text("city"),
        postal_code: cell_identifier(row.get("postal_code")),
        country: text(COUNTRY_COLUMN),
        requested_by: text("requested_by"),
        approved_by: text("approved_by"),
        approval_date: format_date(cell_date(row.get("approval_date"))),
        status: request_status.to_string(),
        assigned: assigned_to.to_string(),
    }
}
