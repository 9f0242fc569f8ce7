//! Projection of case records onto the fixed registry output columns.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::CaseRecord;
use crate::pipeline::processing::normalize::values::scrub_identifier;

/// One output row. Field order is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRow {
    #[serde(rename = "Barcode")]
    pub key: String,
    #[serde(rename = "Processor")]
    pub processor: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Company code")]
    pub company_code: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Vendor number")]
    pub vendor_number: String,
    #[serde(rename = "Vendor Name")]
    pub vendor_name: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Received Date")]
    pub received_date: String,
    #[serde(rename = "Re-Open Date")]
    pub reopen_date: String,
    #[serde(rename = "Allocation Date")]
    pub allocation_date: String,
    #[serde(rename = "Clarification Date")]
    pub clarification_date: String,
    #[serde(rename = "Completion Date")]
    pub completion_date: String,
    #[serde(rename = "Requester")]
    pub requester: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "Aging")]
    pub aging: String,
    #[serde(rename = "Today")]
    pub run_date: String,
}

/// `M/D/YYYY` without zero padding; no date renders empty
pub fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!("{}/{}/{}", d.month(), d.day(), d.year()),
        None => String::new(),
    }
}

impl From<&CaseRecord> for RegistryRow {
    fn from(record: &CaseRecord) -> Self {
        Self {
            key: scrub_identifier(&record.key),
            processor: record.processor.clone(),
            channel: record.channel.clone(),
            category: record.category.clone(),
            company_code: scrub_identifier(&record.company_code),
            region: record.region.clone(),
            vendor_number: scrub_identifier(&record.vendor_number),
            vendor_name: record.vendor_name.clone(),
            status: record.status.clone(),
            received_date: format_date(record.received_date),
            reopen_date: format_date(record.reopen_date),
            allocation_date: format_date(record.allocation_date),
            clarification_date: format_date(record.clarification_date),
            completion_date: format_date(record.completion_date),
            requester: record.requester.clone(),
            remarks: record.remarks.clone(),
            aging: record.aging.clone(),
            run_date: format_date(record.run_date),
        }
    }
}

pub fn project(records: &[CaseRecord]) -> Vec<RegistryRow> {
    records.iter().map(RegistryRow::from).collect()
}
