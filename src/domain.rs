use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One row of a raw table, keyed by column name
pub type Row = Map<String, Value>;

/// The upstream case-management systems that feed the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "PISA", alias = "pisa")]
    Pisa,
    #[serde(rename = "ESM", alias = "esm")]
    Esm,
    #[serde(rename = "PM7", alias = "pm7")]
    Pm7,
    #[serde(rename = "Workon", alias = "workon", alias = "WORKON")]
    Workon,
    #[serde(rename = "RGPA", alias = "rgpa")]
    Rgpa,
}

impl Channel {
    /// Extract order used when collecting rows
    pub const ALL: [Channel; 5] = [
        Channel::Pisa,
        Channel::Esm,
        Channel::Pm7,
        Channel::Workon,
        Channel::Rgpa,
    ];

    /// Label written to the registry's Channel column
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Pisa => "PISA",
            Channel::Esm => "ESM",
            Channel::Pm7 => "PM7",
            Channel::Workon => "Workon",
            Channel::Rgpa => "RGPA",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A case in canonical shape. Used both for normalized extract rows and
/// for registry rows; blank text is the empty string, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub key: String,
    /// Channel label as last written; free text for registry rows
    pub channel: String,
    pub company_code: String,
    pub vendor_number: String,
    pub vendor_name: String,
    pub status: String,
    pub received_date: Option<NaiveDate>,
    pub reopen_date: Option<NaiveDate>,
    pub allocation_date: Option<NaiveDate>,
    pub clarification_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub requester: String,
    pub remarks: String,
    pub aging: String,
    pub region: String,
    pub processor: String,
    pub category: String,
    pub run_date: Option<NaiveDate>,
}

impl CaseRecord {
    pub fn has_key(&self) -> bool {
        !self.key.trim().is_empty()
    }
}

/// Canonical attributes a channel mapping can assign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseField {
    CompanyCode,
    VendorNumber,
    VendorName,
    Status,
    ReceivedDate,
    ReopenDate,
    AllocationDate,
    ClarificationDate,
    CompletionDate,
    Requester,
    Remarks,
    Aging,
    Region,
    Processor,
    Category,
}

impl CaseField {
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            CaseField::ReceivedDate
                | CaseField::ReopenDate
                | CaseField::AllocationDate
                | CaseField::ClarificationDate
                | CaseField::CompletionDate
        )
    }

    pub fn text_mut<'a>(&self, record: &'a mut CaseRecord) -> Option<&'a mut String> {
        match self {
            CaseField::CompanyCode => Some(&mut record.company_code),
            CaseField::VendorNumber => Some(&mut record.vendor_number),
            CaseField::VendorName => Some(&mut record.vendor_name),
            CaseField::Status => Some(&mut record.status),
            CaseField::Requester => Some(&mut record.requester),
            CaseField::Remarks => Some(&mut record.remarks),
            CaseField::Aging => Some(&mut record.aging),
            CaseField::Region => Some(&mut record.region),
            CaseField::Processor => Some(&mut record.processor),
            CaseField::Category => Some(&mut record.category),
            _ => None,
        }
    }

    pub fn date_mut<'a>(&self, record: &'a mut CaseRecord) -> Option<&'a mut Option<NaiveDate>> {
        match self {
            CaseField::ReceivedDate => Some(&mut record.received_date),
            CaseField::ReopenDate => Some(&mut record.reopen_date),
            CaseField::AllocationDate => Some(&mut record.allocation_date),
            CaseField::ClarificationDate => Some(&mut record.clarification_date),
            CaseField::CompletionDate => Some(&mut record.completion_date),
            _ => None,
        }
    }
}

/// A decoded spreadsheet: header plus rows keyed by header name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RawTable {
    /// Build a table from a header and positional rows. Short rows are padded with nulls.
    pub fn from_grid(columns: Vec<String>, grid: Vec<Vec<Value>>) -> Self {
        let rows = grid
            .into_iter()
            .map(|cells| {
                let mut row = Row::new();
                let mut cells = cells.into_iter();
                for column in &columns {
                    row.insert(column.clone(), cells.next().unwrap_or(Value::Null));
                }
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a table from row objects; the header is the union of keys in first-seen order.
    pub fn from_records(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
