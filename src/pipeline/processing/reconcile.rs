//! Reconciliation of the registry against this run's extracts.
//!
//! With `E` the non-empty keys across every extract, `T` the keys from
//! trigger channels and `R` the registry keys:
//! - registry keys in `T` go through the status transition table,
//! - registry keys outside `E` that are not completed become `Needs Review`,
//! - keys in `E \ R`, and every keyless extract row, are appended as new records.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::config::Config;
use crate::constants::status;
use crate::domain::{CaseRecord, Channel};
use crate::pipeline::processing::normalize::values::is_blank;
use crate::pipeline::processing::normalize::ChannelExtract;

/// What the state machine decided for one registry record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDecision {
    /// Key seen in a trigger channel and its status has a transition
    Transition(&'static str),
    /// Key absent from every extract and not completed
    NeedsReview,
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// `new` → `Untouched`
    pub untouched: usize,
    /// `completed` → `Reopen`
    pub reopened: usize,
    /// `n/a` → `New`
    pub renewed: usize,
    pub needs_review: usize,
    pub unchanged: usize,
    pub inserted: usize,
    pub keyless_inserted: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Existing records in snapshot order, then new records
    pub records: Vec<CaseRecord>,
    pub stats: ReconcileStats,
}

/// Transition table for a registry status whose key reappeared in a trigger
/// channel. `None` leaves the status text exactly as it was.
pub fn transition_status(current: &str) -> Option<&'static str> {
    match current.trim().to_lowercase().as_str() {
        "new" => Some(status::UNTOUCHED),
        "completed" => Some(status::REOPEN),
        "n/a" => Some(status::NEW),
        "" | "na" | "none" => None,
        _ => None,
    }
}

pub fn is_completed(current: &str) -> bool {
    current.trim().eq_ignore_ascii_case(status::COMPLETED)
}

/// Key sets derived from one run's extracts
#[derive(Debug, Default)]
pub struct KeySets<'a> {
    /// Every non-empty key from any channel
    pub extract: HashSet<&'a str>,
    /// Non-empty keys from trigger channels only
    pub trigger: HashSet<&'a str>,
}

impl<'a> KeySets<'a> {
    pub fn build(extracts: &'a [ChannelExtract], trigger_channels: &[Channel]) -> Self {
        let mut sets = KeySets::default();
        for extract in extracts {
            let triggers = trigger_channels.contains(&extract.channel);
            for record in extract.records.iter().filter(|r| r.has_key()) {
                sets.extract.insert(record.key.as_str());
                if triggers {
                    sets.trigger.insert(record.key.as_str());
                }
            }
        }
        sets
    }

    pub fn decide(&self, record: &CaseRecord) -> StatusDecision {
        if !record.has_key() {
            return StatusDecision::Unchanged;
        }
        let key = record.key.as_str();
        if self.trigger.contains(key) {
            match transition_status(&record.status) {
                Some(next) => StatusDecision::Transition(next),
                None => StatusDecision::Unchanged,
            }
        } else if !self.extract.contains(key) && !is_completed(&record.status) {
            StatusDecision::NeedsReview
        } else {
            StatusDecision::Unchanged
        }
    }
}

/// Recompute registry statuses and append new records.
pub fn reconcile(
    registry: Vec<CaseRecord>,
    extracts: &[ChannelExtract],
    trigger_channels: &[Channel],
    config: &Config,
    run_date: NaiveDate,
) -> Reconciliation {
    let keys = KeySets::build(extracts, trigger_channels);
    let mut stats = ReconcileStats::default();

    info!(
        "Found {} unique keys from trigger channels for status updates",
        keys.trigger.len()
    );

    let mut records: Vec<CaseRecord> = Vec::with_capacity(registry.len());
    for mut record in registry {
        match keys.decide(&record) {
            StatusDecision::Transition(next) => {
                debug!("{}: '{}' -> '{}'", record.key, record.status, next);
                match next {
                    status::UNTOUCHED => stats.untouched += 1,
                    status::REOPEN => stats.reopened += 1,
                    _ => stats.renewed += 1,
                }
                record.status = next.to_string();
            }
            StatusDecision::NeedsReview => {
                debug!("{}: '{}' -> '{}'", record.key, record.status, status::NEEDS_REVIEW);
                stats.needs_review += 1;
                record.status = status::NEEDS_REVIEW.to_string();
            }
            StatusDecision::Unchanged => stats.unchanged += 1,
        }
        records.push(record);
    }

    let registry_keys: HashSet<&str> = records
        .iter()
        .filter(|r| r.has_key())
        .map(|r| r.key.as_str())
        .collect();
    let new_records = collect_new_records(extracts, &registry_keys, config, run_date);

    for record in &new_records {
        if record.has_key() {
            stats.inserted += 1;
        } else {
            stats.keyless_inserted += 1;
        }
    }
    info!(
        "Added {} new keyed records and {} keyless records; {} records marked '{}'",
        stats.inserted,
        stats.keyless_inserted,
        stats.needs_review,
        status::NEEDS_REVIEW
    );

    records.extend(new_records);
    Reconciliation { records, stats }
}

enum Slot<'a> {
    Keyed(&'a str),
    Keyless(&'a CaseRecord),
}

/// Build one record per key in `E \ R` plus one per keyless row, in first-seen order.
///
/// Rows sharing a key are ranked by the configured channel precedence, then by
/// extract order. The top row seeds the record; its blank fields, status
/// included, are filled from the remaining rows in rank order.
fn collect_new_records(
    extracts: &[ChannelExtract],
    registry_keys: &HashSet<&str>,
    config: &Config,
    run_date: NaiveDate,
) -> Vec<CaseRecord> {
    let mut order: Vec<Slot> = Vec::new();
    let mut candidates: HashMap<&str, Vec<(usize, usize, &CaseRecord)>> = HashMap::new();
    let mut seq = 0usize;

    for extract in extracts {
        let rank = config.precedence_rank(extract.channel);
        for record in &extract.records {
            seq += 1;
            if !record.has_key() {
                order.push(Slot::Keyless(record));
                continue;
            }
            let key = record.key.as_str();
            if registry_keys.contains(key) {
                continue;
            }
            let rows = candidates.entry(key).or_default();
            if rows.is_empty() {
                order.push(Slot::Keyed(key));
            }
            rows.push((rank, seq, record));
        }
    }

    order
        .into_iter()
        .filter_map(|slot| match slot {
            Slot::Keyless(record) => Some(new_registry_record(record.clone(), run_date)),
            Slot::Keyed(key) => {
                let mut rows = candidates.remove(key)?;
                rows.sort_by_key(|(rank, seq, _)| (*rank, *seq));
                let mut iter = rows.into_iter().map(|(_, _, record)| record);
                let mut merged = iter.next()?.clone();
                for other in iter {
                    fill_blanks(&mut merged, other);
                }
                Some(new_registry_record(merged, run_date))
            }
        })
        .collect()
}

/// Defaults every newly inserted record receives
fn new_registry_record(mut record: CaseRecord, run_date: NaiveDate) -> CaseRecord {
    if is_blank(&record.status) {
        record.status = status::NEW.to_string();
    }
    record.allocation_date = Some(run_date);
    record.run_date = Some(run_date);
    record
}

/// Copy fields that are blank in `target` from `other`. Key, Channel and
/// Processor always stay with the winning row.
fn fill_blanks(target: &mut CaseRecord, other: &CaseRecord) {
    fn text(slot: &mut String, from: &str) {
        if is_blank(slot) && !is_blank(from) {
            *slot = from.to_string();
        }
    }
    fn date(slot: &mut Option<NaiveDate>, from: Option<NaiveDate>) {
        if slot.is_none() {
            *slot = from;
        }
    }

    text(&mut target.status, &other.status);
    text(&mut target.company_code, &other.company_code);
    text(&mut target.vendor_number, &other.vendor_number);
    text(&mut target.vendor_name, &other.vendor_name);
    text(&mut target.requester, &other.requester);
    text(&mut target.remarks, &other.remarks);
    text(&mut target.aging, &other.aging);
    text(&mut target.region, &other.region);
    text(&mut target.category, &other.category);
    date(&mut target.received_date, other.received_date);
    date(&mut target.reopen_date, other.reopen_date);
    date(&mut target.clarification_date, other.clarification_date);
    date(&mut target.completion_date, other.completion_date);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn registry_record(key: &str, status: &str) -> CaseRecord {
        CaseRecord {
            key: key.to_string(),
            channel: "PISA".to_string(),
            status: status.to_string(),
            ..CaseRecord::default()
        }
    }

    fn extract_record(channel: Channel, key: &str) -> CaseRecord {
        CaseRecord {
            key: key.to_string(),
            channel: channel.label().to_string(),
            run_date: Some(run_date()),
            ..CaseRecord::default()
        }
    }

    fn extract(channel: Channel, records: Vec<CaseRecord>) -> ChannelExtract {
        ChannelExtract {
            channel,
            records,
            filtered_out: 0,
            warnings: Vec::new(),
        }
    }

    fn triggers() -> Vec<Channel> {
        vec![Channel::Pisa, Channel::Esm, Channel::Pm7]
    }

    fn status_of<'a>(result: &'a Reconciliation, key: &str) -> &'a str {
        &result.records.iter().find(|r| r.key == key).unwrap().status
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(transition_status("new"), Some("Untouched"));
        assert_eq!(transition_status(" NEW "), Some("Untouched"));
        assert_eq!(transition_status("Completed"), Some("Reopen"));
        assert_eq!(transition_status("n/a"), Some("New"));
        assert_eq!(transition_status(""), None);
        assert_eq!(transition_status("na"), None);
        assert_eq!(transition_status("None"), None);
        assert_eq!(transition_status("Awaiting Vendor"), None);
    }

    #[test]
    fn test_trigger_key_transitions_preserve_unchanged_text() {
        let registry = vec![
            registry_record("1", "new"),
            registry_record("2", "COMPLETED"),
            registry_record("3", "n/a"),
            registry_record("4", ""),
            registry_record("5", " Awaiting Vendor "),
        ];
        let extracts = vec![extract(
            Channel::Esm,
            ["1", "2", "3", "4", "5"]
                .iter()
                .map(|k| extract_record(Channel::Esm, k))
                .collect(),
        )];

        let result = reconcile(registry, &extracts, &triggers(), &Config::default(), run_date());
        assert_eq!(status_of(&result, "1"), "Untouched");
        assert_eq!(status_of(&result, "2"), "Reopen");
        assert_eq!(status_of(&result, "3"), "New");
        assert_eq!(status_of(&result, "4"), "");
        assert_eq!(status_of(&result, "5"), " Awaiting Vendor ");
        assert_eq!(result.stats.untouched, 1);
        assert_eq!(result.stats.reopened, 1);
        assert_eq!(result.stats.renewed, 1);
        assert_eq!(result.records.len(), 5);
    }

    #[test]
    fn test_non_trigger_presence_protects_from_needs_review() {
        let registry = vec![registry_record("9", "new")];
        let extracts = vec![extract(Channel::Rgpa, vec![extract_record(Channel::Rgpa, "9")])];

        let result = reconcile(registry, &extracts, &triggers(), &Config::default(), run_date());
        // RGPA keeps the key alive but does not drive transitions
        assert_eq!(status_of(&result, "9"), "new");
        assert_eq!(result.stats.needs_review, 0);
    }

    #[test]
    fn test_needs_review_and_completed_survives() {
        let registry = vec![
            registry_record("1003", "Untouched"),
            registry_record("1004", "Completed"),
            registry_record("1005", " completed "),
        ];
        let extracts = vec![extract(Channel::Pisa, vec![extract_record(Channel::Pisa, "1")])];

        let result = reconcile(registry, &extracts, &triggers(), &Config::default(), run_date());
        assert_eq!(status_of(&result, "1003"), "Needs Review");
        assert_eq!(status_of(&result, "1004"), "Completed");
        assert_eq!(status_of(&result, "1005"), " completed ");
        assert_eq!(result.stats.needs_review, 1);
    }

    #[test]
    fn test_keyless_registry_records_are_never_stale() {
        let registry = vec![registry_record("", "Untouched")];
        let result = reconcile(registry, &[], &triggers(), &Config::default(), run_date());
        assert_eq!(result.records[0].status, "Untouched");
    }

    #[test]
    fn test_new_key_inserted_once_across_channels() {
        let mut pm7 = extract_record(Channel::Pm7, "1001");
        pm7.status = "Pending approval".to_string();
        pm7.company_code = "DE01".to_string();
        let mut workon = extract_record(Channel::Workon, "1001");
        workon.processor = "Jayapal".to_string();
        workon.vendor_name = "ACME".to_string();
        let extracts = vec![
            extract(Channel::Pm7, vec![pm7.clone(), pm7]),
            extract(Channel::Workon, vec![workon]),
        ];

        let result = reconcile(Vec::new(), &extracts, &triggers(), &Config::default(), run_date());
        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        // Workon outranks PM7; PM7 fills what Workon left blank
        assert_eq!(record.channel, "Workon");
        assert_eq!(record.processor, "Jayapal");
        assert_eq!(record.vendor_name, "ACME");
        assert_eq!(record.company_code, "DE01");
        // Workon left status blank, so the highest-ranked status wins
        assert_eq!(record.status, "Pending approval");
        assert_eq!(record.allocation_date, Some(run_date()));
        assert_eq!(result.stats.inserted, 1);
    }

    #[test]
    fn test_precedence_is_configurable() {
        let mut config = Config::default();
        config.reconcile.channel_precedence = vec![
            Channel::Pm7,
            Channel::Pisa,
            Channel::Esm,
            Channel::Workon,
            Channel::Rgpa,
        ];
        let extracts = vec![
            extract(Channel::Pm7, vec![extract_record(Channel::Pm7, "77")]),
            extract(Channel::Workon, vec![extract_record(Channel::Workon, "77")]),
        ];

        let result = reconcile(Vec::new(), &extracts, &triggers(), &config, run_date());
        assert_eq!(result.records[0].channel, "PM7");
    }

    #[test]
    fn test_status_from_highest_ranked_row_that_has_one() {
        let mut esm = extract_record(Channel::Esm, "1001");
        esm.status = "Reopened".to_string();
        let mut pm7 = extract_record(Channel::Pm7, "1001");
        pm7.status = "Check".to_string();
        let mut pisa = extract_record(Channel::Pisa, "1001");
        pisa.status = "  ".to_string();
        let extracts = vec![
            extract(Channel::Pisa, vec![pisa]),
            extract(Channel::Esm, vec![esm]),
            extract(Channel::Pm7, vec![pm7]),
        ];

        let result = reconcile(Vec::new(), &extracts, &triggers(), &Config::default(), run_date());
        assert_eq!(result.records[0].channel, "PISA");
        assert_eq!(result.records[0].status, "Reopened");
    }

    #[test]
    fn test_new_record_defaults_to_new_status() {
        let extracts = vec![extract(Channel::Pisa, vec![extract_record(Channel::Pisa, "1001")])];
        let result = reconcile(Vec::new(), &extracts, &triggers(), &Config::default(), run_date());
        assert_eq!(result.records[0].key, "1001");
        assert_eq!(result.records[0].status, "New");
    }

    #[test]
    fn test_keyless_rows_always_inserted() {
        let extracts = vec![extract(
            Channel::Rgpa,
            vec![
                extract_record(Channel::Rgpa, ""),
                extract_record(Channel::Rgpa, "R-1"),
                extract_record(Channel::Rgpa, ""),
            ],
        )];
        let registry = vec![registry_record("", "New")];

        let result = reconcile(registry, &extracts, &triggers(), &Config::default(), run_date());
        assert_eq!(result.records.len(), 4);
        assert_eq!(result.stats.keyless_inserted, 2);
        assert_eq!(result.stats.inserted, 1);
        // first-seen order is kept for new rows
        assert_eq!(result.records[1].key, "");
        assert_eq!(result.records[2].key, "R-1");
    }

    #[test]
    fn test_existing_key_is_not_reinserted() {
        let registry = vec![registry_record("1002", "Completed")];
        let extracts = vec![extract(Channel::Pisa, vec![extract_record(Channel::Pisa, "1002")])];

        let result = reconcile(registry, &extracts, &triggers(), &Config::default(), run_date());
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].status, "Reopen");
        assert_eq!(result.stats.inserted, 0);
    }
}
