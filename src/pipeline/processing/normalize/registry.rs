use std::collections::BTreeMap;

use super::schema::{ChannelSchema, FixedValue};
use crate::config::Config;
use crate::domain::{CaseField, Channel};
use crate::pipeline::processing::filter::FilterPredicate;

/// The channel descriptors for one run, keyed by channel
pub struct SchemaRegistry {
    schemas: BTreeMap<Channel, ChannelSchema>,
}

impl SchemaRegistry {
    /// Build the built-in channel table, with fixed values taken from config
    pub fn from_config(config: &Config) -> Self {
        let channels = &config.channels;
        let mut schemas = BTreeMap::new();

        let pisa = ChannelSchema::new(Channel::Pisa, "barcode")
            .triggers_status()
            .map(CaseField::CompanyCode, "company_code")
            .map(CaseField::VendorNumber, "vendor_number")
            .map(CaseField::VendorName, "vendor_name")
            .map(CaseField::ReceivedDate, "received_date")
            .with_filter(FilterPredicate::allow_list(
                "assigned_user",
                channels.pisa_allowed_users.iter().cloned(),
            ));

        let esm = ChannelSchema::new(Channel::Esm, "barcode")
            .triggers_status()
            .map(CaseField::ReceivedDate, "received_date")
            .map(CaseField::Status, "state")
            .map(CaseField::Requester, "opened_by")
            .map(CaseField::CompletionDate, "closed")
            .map_when(CaseField::ReopenDate, "updated", "state", "reopened")
            .map(CaseField::Remarks, "short_description")
            .map(CaseField::CompanyCode, "company_code")
            .map(CaseField::Category, "subcategory")
            .map(CaseField::VendorName, "vendor_name")
            .map(CaseField::VendorNumber, "vendor_number");

        let pm7 = ChannelSchema::new(Channel::Pm7, "barcode")
            .triggers_status()
            .map(CaseField::VendorName, "vendor_name")
            .map(CaseField::VendorNumber, "vendor_number")
            .map(CaseField::CompanyCode, "company_code")
            .map(CaseField::ReceivedDate, "received_date")
            .map(CaseField::Status, "task");

        let workon = ChannelSchema::new(Channel::Workon, "key")
            .optional()
            .map(CaseField::Category, "action")
            .map(CaseField::CompanyCode, "company_code")
            .map(CaseField::Region, "country")
            .map(CaseField::VendorNumber, "vendor_number")
            .map(CaseField::VendorName, "name")
            .map(CaseField::Status, "status")
            .map(CaseField::ReceivedDate, "updated")
            .map(CaseField::Requester, "applicant")
            .map(CaseField::Remarks, "summary")
            .fixed(
                CaseField::Processor,
                FixedValue::Text(channels.workon_processor.clone()),
            )
            .fixed(CaseField::AllocationDate, FixedValue::RunDate);

        let rgpa = ChannelSchema::new(Channel::Rgpa, "key")
            .map(CaseField::CompanyCode, "company_code")
            .map(CaseField::ReceivedDate, "updated")
            .map(CaseField::Remarks, "summary")
            .fixed(
                CaseField::Processor,
                FixedValue::Text(channels.rgpa_processor.clone()),
            )
            .fixed(CaseField::AllocationDate, FixedValue::RunDate)
            .with_filter(FilterPredicate::contains(
                "current_assignee",
                &channels.rgpa_assignee_marker,
            ));

        for schema in [pisa, esm, pm7, workon, rgpa] {
            schemas.insert(schema.channel, schema);
        }

        Self { schemas }
    }

    pub fn get(&self, channel: Channel) -> Option<&ChannelSchema> {
        self.schemas.get(&channel)
    }

    /// Descriptors in extract order
    pub fn iter(&self) -> impl Iterator<Item = &ChannelSchema> {
        self.schemas.values()
    }

    pub fn required_channels(&self) -> Vec<Channel> {
        self.iter().filter(|s| s.required).map(|s| s.channel).collect()
    }

    pub fn trigger_channels(&self) -> Vec<Channel> {
        self.iter()
            .filter(|s| s.triggers_status)
            .map(|s| s.channel)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_every_channel() {
        let registry = SchemaRegistry::from_config(&Config::default());
        for channel in Channel::ALL {
            assert!(registry.get(channel).is_some(), "missing {}", channel);
        }
    }

    #[test]
    fn test_required_and_trigger_sets() {
        let registry = SchemaRegistry::from_config(&Config::default());
        assert_eq!(
            registry.required_channels(),
            vec![Channel::Pisa, Channel::Esm, Channel::Pm7, Channel::Rgpa]
        );
        assert_eq!(
            registry.trigger_channels(),
            vec![Channel::Pisa, Channel::Esm, Channel::Pm7]
        );
    }

    #[test]
    fn test_key_columns() {
        let registry = SchemaRegistry::from_config(&Config::default());
        assert_eq!(registry.get(Channel::Workon).unwrap().key_column, "key");
        assert_eq!(registry.get(Channel::Rgpa).unwrap().key_column, "key");
        assert_eq!(registry.get(Channel::Pm7).unwrap().key_column, "barcode");
    }

    #[test]
    fn test_processor_override_comes_from_config() {
        let mut config = Config::default();
        config.channels.rgpa_processor = "Ops Desk".to_string();
        let registry = SchemaRegistry::from_config(&config);
        let rgpa = registry.get(Channel::Rgpa).unwrap();
        assert!(rgpa.overrides.iter().any(|o| o.field == CaseField::Processor
            && o.value == FixedValue::Text("Ops Desk".to_string())));
    }
}
