//! Row inclusion predicates applied to normalized extracts.
//!
//! A predicate whose column is missing from the table lets every row through
//! and reports a `MissingFilterColumn` warning instead of dropping the table.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::domain::{RawTable, Row};
use crate::error::RunWarning;
use crate::pipeline::processing::normalize::values::cell_text;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterPredicate {
    /// Keep rows whose cell is one of the allowed values
    AllowList { column: String, allowed: HashSet<String> },
    /// Keep rows whose cell contains the marker
    Contains { column: String, marker: String },
    /// Drop rows whose cell is one of the excluded codes (case-insensitive)
    ExcludeSet { column: String, excluded: HashSet<String> },
}

/// Rows that passed a predicate plus what happened to the rest
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub rows: Vec<Row>,
    pub excluded: usize,
    pub warnings: Vec<RunWarning>,
}

impl FilterPredicate {
    pub fn allow_list<I, S>(column: &str, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterPredicate::AllowList {
            column: column.to_string(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(column: &str, marker: &str) -> Self {
        FilterPredicate::Contains {
            column: column.to_string(),
            marker: marker.to_string(),
        }
    }

    pub fn exclude_set<I, S>(column: &str, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        FilterPredicate::ExcludeSet {
            column: column.to_string(),
            excluded: excluded
                .into_iter()
                .map(|code| code.as_ref().trim().to_uppercase())
                .collect(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            FilterPredicate::AllowList { column, .. }
            | FilterPredicate::Contains { column, .. }
            | FilterPredicate::ExcludeSet { column, .. } => column,
        }
    }

    /// Whether a single row is kept
    pub fn matches(&self, row: &Row) -> bool {
        let cell = cell_text(row.get(self.column()));
        match self {
            FilterPredicate::AllowList { allowed, .. } => allowed.contains(cell.trim()),
            FilterPredicate::Contains { marker, .. } => !cell.is_empty() && cell.contains(marker.as_str()),
            FilterPredicate::ExcludeSet { excluded, .. } => {
                !excluded.contains(&cell.trim().to_uppercase())
            }
        }
    }

    /// Apply the predicate to a table whose columns are already normalized.
    /// `scope` names the extract in logs and warnings.
    pub fn apply(&self, scope: &str, table: RawTable) -> FilterOutcome {
        if !table.has_column(self.column()) {
            warn!(
                "{}: filter column '{}' not found, no filter applied",
                scope,
                self.column()
            );
            crate::metrics::NormalizeMetrics::record_filter_fail_open();
            return FilterOutcome {
                rows: table.rows,
                excluded: 0,
                warnings: vec![RunWarning::MissingFilterColumn {
                    scope: scope.to_string(),
                    column: self.column().to_string(),
                }],
            };
        }

        let original = table.rows.len();
        let rows: Vec<Row> = table.rows.into_iter().filter(|row| self.matches(row)).collect();
        info!(
            "{} filtered on '{}'. Original records: {}, records after filter: {}",
            scope,
            self.column(),
            original,
            rows.len()
        );

        FilterOutcome {
            excluded: original - rows.len(),
            rows,
            warnings: Vec::new(),
        }
    }
}
