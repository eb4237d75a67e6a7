//! Network configuration: milestones (height-keyed fee tables and feature flags), the
//! exception-transaction allow-list and magistrate options.
//!
//! Configuration is loaded once, wrapped in a [`ConfigManager`] and passed by reference to the
//! components that need it.
//!
//! # Invariants
//! - A validated configuration has at least one milestone, sorted by height, heights unique.
//! - The active milestone for height `h` is the last milestone whose height is `<= h`; heights
//!   below the first milestone resolve to the first milestone.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::error::MagistrateError;

/// Default network byte (pubKeyHash).
pub const DEFAULT_NETWORK: u8 = 23;

/// Errors produced while loading or querying configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration defines no milestones")]
    NoMilestones,

    #[error("Duplicate milestone at height {0}")]
    DuplicateMilestoneHeight(u64),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl From<ConfigError> for MagistrateError {
    fn from(err: ConfigError) -> Self {
        MagistrateError::Config(err)
    }
}

/// Fee overrides keyed by fee-table key (see `core::fee::fee_key`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticFees(BTreeMap<String, u64>);

impl StaticFees {
    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.get(key).copied()
    }

    pub fn set(&mut self, key: impl Into<String>, fee: u64) {
        self.0.insert(key.into(), fee);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub height: u64,
    #[serde(default)]
    pub fees: StaticFees,
    /// Activates the entity transaction type.
    #[serde(default)]
    pub aip36: bool,
}

impl Default for Milestone {
    fn default() -> Self {
        Self {
            height: 1,
            fees: StaticFees::default(),
            aip36: true,
        }
    }
}

/// Historical transactions that skip all precondition checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exceptions {
    #[serde(default)]
    pub transactions: BTreeSet<String>,
}

/// Which fields make two entity names collide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityNameScope {
    /// Same lowercase name, same type and same sub type.
    #[default]
    TypeAndSubType,
    /// Same lowercase name and same type, whatever the sub type.
    TypeOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagistrateOptions {
    #[serde(default)]
    pub entity_name_scope: EntityNameScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default = "default_network")]
    pub network: u8,
    #[serde(default = "default_milestones")]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub exceptions: Exceptions,
    #[serde(default)]
    pub magistrate: MagistrateOptions,
}

fn default_network() -> u8 {
    DEFAULT_NETWORK
}

fn default_milestones() -> Vec<Milestone> {
    vec![Milestone::default()]
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK,
            milestones: default_milestones(),
            exceptions: Exceptions::default(),
            magistrate: MagistrateOptions::default(),
        }
    }
}

impl NetworkConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: NetworkConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.normalize()?;
        Ok(config)
    }

    /// Sorts milestones by height and rejects empty or duplicate milestone sets.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        if self.milestones.is_empty() {
            return Err(ConfigError::NoMilestones);
        }
        self.milestones.sort_by_key(|m| m.height);
        for pair in self.milestones.windows(2) {
            if pair[0].height == pair[1].height {
                return Err(ConfigError::DuplicateMilestoneHeight(pair[0].height));
            }
        }
        Ok(())
    }
}

/// Owns the configuration and the current height.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: NetworkConfig,
    height: u64,
}

impl ConfigManager {
    pub fn new(mut config: NetworkConfig) -> Result<Self, ConfigError> {
        config.normalize()?;
        Ok(Self { config, height: 1 })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn network(&self) -> u8 {
        self.config.network
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn set_height(&mut self, height: u64) {
        self.height = height;
    }

    /// Milestone active at the current height.
    pub fn milestone(&self) -> &Milestone {
        self.milestone_at(self.height)
    }

    pub fn milestone_at(&self, height: u64) -> &Milestone {
        let milestones = &self.config.milestones;
        milestones
            .iter()
            .rev()
            .find(|m| m.height <= height)
            .unwrap_or(&milestones[0])
    }

    pub fn is_exception(&self, transaction_id: &str) -> bool {
        self.config.exceptions.transactions.contains(transaction_id)
    }

    pub fn exceptions(&self) -> &BTreeSet<String> {
        &self.config.exceptions.transactions
    }

    pub fn options(&self) -> &MagistrateOptions {
        &self.config.magistrate
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self {
            config: NetworkConfig::default(),
            height: 1,
        }
    }
}
