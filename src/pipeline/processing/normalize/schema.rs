use crate::domain::{CaseField, Channel};
use crate::pipeline::processing::filter::FilterPredicate;

/// Where a canonical field's value comes from in a channel's extract
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    Column(&'static str),
    /// Take `column` only when `when_column` equals `equals` (case-insensitive, trimmed)
    ColumnWhen {
        column: &'static str,
        when_column: &'static str,
        equals: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub field: CaseField,
    pub source: FieldSource,
}

/// A value a channel forces regardless of its source data
#[derive(Debug, Clone, PartialEq)]
pub enum FixedValue {
    Text(String),
    RunDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldOverride {
    pub field: CaseField,
    pub value: FixedValue,
}

/// Static description of one channel's extract: how to find its key, how its
/// columns map onto the canonical record, and what rules apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSchema {
    pub channel: Channel,
    /// Key column name after column-name normalization
    pub key_column: &'static str,
    pub required: bool,
    /// Whether this channel's keys drive the status transition table
    pub triggers_status: bool,
    pub fields: Vec<FieldMapping>,
    /// Applied after `fields`, so they win over any mapped column
    pub overrides: Vec<FieldOverride>,
    pub filter: Option<FilterPredicate>,
}

impl ChannelSchema {
    pub fn new(channel: Channel, key_column: &'static str) -> Self {
        Self {
            channel,
            key_column,
            required: true,
            triggers_status: false,
            fields: Vec::new(),
            overrides: Vec::new(),
            filter: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn triggers_status(mut self) -> Self {
        self.triggers_status = true;
        self
    }

    pub fn map(mut self, field: CaseField, column: &'static str) -> Self {
        self.fields.push(FieldMapping {
            field,
            source: FieldSource::Column(column),
        });
        self
    }

    pub fn map_when(
        mut self,
        field: CaseField,
        column: &'static str,
        when_column: &'static str,
        equals: &'static str,
    ) -> Self {
        self.fields.push(FieldMapping {
            field,
            source: FieldSource::ColumnWhen {
                column,
                when_column,
                equals,
            },
        });
        self
    }

    pub fn fixed(mut self, field: CaseField, value: FixedValue) -> Self {
        self.overrides.push(FieldOverride { field, value });
        self
    }

    pub fn with_filter(mut self, filter: FilterPredicate) -> Self {
        self.filter = Some(filter);
        self
    }
}
