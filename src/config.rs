use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::domain::Channel;
use crate::error::{Result, SyncError};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "CASE_REGISTRY_CONFIG";

/// Fixed tables the pipeline consults. Every section falls back to the
/// built-in values, so an empty or missing config file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub channels: ChannelConfig,
    pub reconcile: ReconcileConfig,
    pub supplier: SupplierConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub pisa_allowed_users: Vec<String>,
    pub rgpa_assignee_marker: String,
    pub workon_processor: String,
    pub rgpa_processor: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            pisa_allowed_users: constants::DEFAULT_PISA_USERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rgpa_assignee_marker: constants::DEFAULT_RGPA_ASSIGNEE_MARKER.to_string(),
            workon_processor: constants::DEFAULT_WORKON_PROCESSOR.to_string(),
            rgpa_processor: constants::DEFAULT_RGPA_PROCESSOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Highest precedence first. Decides which channel's row seeds a new
    /// registry record when a key arrives from several channels.
    pub channel_precedence: Vec<Channel>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            channel_precedence: vec![
                Channel::Workon,
                Channel::Rgpa,
                Channel::Pisa,
                Channel::Esm,
                Channel::Pm7,
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupplierConfig {
    pub excluded_countries: Vec<String>,
    /// Normalized column names forming the composite match key
    pub key_columns: Vec<String>,
    pub assigned_to: String,
}

impl Default for SupplierConfig {
    fn default() -> Self {
        Self {
            excluded_countries: constants::DEFAULT_APAC_COUNTRIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            key_columns: vec!["company_code".to_string(), "supplier_name".to_string()],
            assigned_to: String::new(),
        }
    }
}

impl Config {
    /// Load from an explicit path, else `$CASE_REGISTRY_CONFIG`, else `config.toml`
    /// when it exists, else the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var(CONFIG_PATH_ENV)
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                    default.exists().then_some(default)
                }),
        };

        let config = match config_path {
            Some(p) => {
                let content = fs::read_to_string(&p).map_err(|e| {
                    SyncError::Config(format!("Failed to read config file '{}': {}", p.display(), e))
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// The precedence list must name every channel exactly once.
    pub fn validate(&self) -> Result<()> {
        let precedence = &self.reconcile.channel_precedence;
        for channel in Channel::ALL {
            let count = precedence.iter().filter(|c| **c == channel).count();
            if count != 1 {
                return Err(SyncError::Config(format!(
                    "channel_precedence must list {} exactly once (found {})",
                    channel, count
                )));
            }
        }
        if self.supplier.key_columns.is_empty() {
            return Err(SyncError::Config(
                "supplier.key_columns must name at least one column".to_string(),
            ));
        }
        Ok(())
    }

    /// Rank of a channel in the precedence list; lower wins
    pub fn precedence_rank(&self, channel: Channel) -> usize {
        self.reconcile
            .channel_precedence
            .iter()
            .position(|c| *c == channel)
            .unwrap_or(usize::MAX)
    }
}
