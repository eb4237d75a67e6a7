//! Asset payloads carried by the magistrate transaction types, and the entity taxonomy.
//!
//! Off-wire field names are camelCase so the JSON form matches what the schema validator checks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::cursor::CodecError;

/// Type group reserved for the generic (core) transaction types.
pub const CORE_TYPE_GROUP: u32 = 1;

/// Type group every magistrate transaction type lives in.
pub const MAGISTRATE_TYPE_GROUP: u32 = 2;

/// Port key every bridgechain must expose.
pub const CORE_API_PORT_KEY: &str = "@arkecosystem/core-api";

/// Type discriminators within the magistrate type group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum MagistrateTransactionType {
    BusinessRegistration = 0,
    BusinessResignation = 1,
    BusinessUpdate = 2,
    BridgechainRegistration = 3,
    BridgechainResignation = 4,
    BridgechainUpdate = 5,
    Entity = 6,
}

impl MagistrateTransactionType {
    pub const ALL: [MagistrateTransactionType; 7] = [
        MagistrateTransactionType::BusinessRegistration,
        MagistrateTransactionType::BusinessResignation,
        MagistrateTransactionType::BusinessUpdate,
        MagistrateTransactionType::BridgechainRegistration,
        MagistrateTransactionType::BridgechainResignation,
        MagistrateTransactionType::BridgechainUpdate,
        MagistrateTransactionType::Entity,
    ];

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_u16() == value)
    }

    /// String key under which the type and its schema are registered.
    pub fn key(self) -> &'static str {
        match self {
            MagistrateTransactionType::BusinessRegistration => "businessRegistration",
            MagistrateTransactionType::BusinessResignation => "businessResignation",
            MagistrateTransactionType::BusinessUpdate => "businessUpdate",
            MagistrateTransactionType::BridgechainRegistration => "bridgechainRegistration",
            MagistrateTransactionType::BridgechainResignation => "bridgechainResignation",
            MagistrateTransactionType::BridgechainUpdate => "bridgechainUpdate",
            MagistrateTransactionType::Entity => "entity",
        }
    }
}

impl fmt::Display for MagistrateTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRegistrationAsset {
    pub name: String,
    pub website: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl BusinessRegistrationAsset {
    /// Shallow merge: every field present in `update` overwrites ours.
    pub fn merge(&mut self, update: &BusinessUpdateAsset) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(website) = &update.website {
            self.website = website.clone();
        }
        if update.vat.is_some() {
            self.vat = update.vat.clone();
        }
        if update.repository.is_some() {
            self.repository = update.repository.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessUpdateAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessResignationAsset {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgechainRegistrationAsset {
    pub name: String,
    pub seed_nodes: Vec<String>,
    /// 32-byte hash as lowercase hex.
    pub genesis_hash: String,
    pub bridgechain_repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridgechain_asset_repository: Option<String>,
    pub ports: BTreeMap<String, u16>,
}

impl BridgechainRegistrationAsset {
    /// Shallow merge of an update; `bridgechain_id` is addressing only and never copied.
    pub fn merge(&mut self, update: &BridgechainUpdateAsset) {
        if let Some(seed_nodes) = &update.seed_nodes {
            self.seed_nodes = seed_nodes.clone();
        }
        if let Some(ports) = &update.ports {
            self.ports = ports.clone();
        }
        if let Some(repository) = &update.bridgechain_repository {
            self.bridgechain_repository = repository.clone();
        }
        if update.bridgechain_asset_repository.is_some() {
            self.bridgechain_asset_repository = update.bridgechain_asset_repository.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgechainUpdateAsset {
    pub bridgechain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_nodes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<BTreeMap<String, u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridgechain_repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridgechain_asset_repository: Option<String>,
}

impl BridgechainUpdateAsset {
    pub fn new(bridgechain_id: u64) -> Self {
        Self {
            bridgechain_id,
            seed_nodes: None,
            ports: None,
            bridgechain_repository: None,
            bridgechain_asset_repository: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgechainResignationAsset {
    /// Genesis hash of the bridgechain being resigned, lowercase hex.
    pub bridgechain_id: String,
}

macro_rules! u8_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident = $value:literal => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(into = "u8", try_from = "u8")]
        #[repr(u8)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            pub fn as_u8(self) -> u8 {
                self as u8
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = CodecError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(CodecError::UnknownVariant { field: $field, value }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

u8_enum!(
    /// Kind of entity an entity transaction registers.
    EntityType, "entity type" {
        Business = 0 => "business",
        Product = 1 => "product",
        Plugin = 2 => "plugin",
        Module = 3 => "module",
        Delegate = 4 => "delegate",
    }
);

u8_enum!(
    EntitySubType, "entity sub type" {
        None = 0 => "none",
        PluginCore = 1 => "pluginCore",
        PluginDesktop = 2 => "pluginDesktop",
    }
);

u8_enum!(
    EntityAction, "entity action" {
        Register = 0 => "register",
        Update = 1 => "update",
        Resign = 2 => "resign",
    }
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs_data: Option<String>,
}

impl EntityData {
    /// Shallow merge: present fields in `update` replace ours, absent ones are left alone.
    pub fn merge(&mut self, update: &EntityData) {
        if update.name.is_some() {
            self.name = update.name.clone();
        }
        if update.ipfs_data.is_some() {
            self.ipfs_data = update.ipfs_data.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.ipfs_data.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAsset {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub sub_type: EntitySubType,
    pub action: EntityAction,
    /// Id of the registering transaction; required for update and resign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
    pub data: EntityData,
}

/// The asset carried by a transaction, one variant per magistrate type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Asset {
    BusinessRegistration(BusinessRegistrationAsset),
    BusinessResignation(BusinessResignationAsset),
    BusinessUpdate(BusinessUpdateAsset),
    BridgechainRegistration(BridgechainRegistrationAsset),
    BridgechainResignation(BridgechainResignationAsset),
    BridgechainUpdate(BridgechainUpdateAsset),
    Entity(EntityAsset),
}

impl Asset {
    pub fn transaction_type(&self) -> MagistrateTransactionType {
        match self {
            Asset::BusinessRegistration(_) => MagistrateTransactionType::BusinessRegistration,
            Asset::BusinessResignation(_) => MagistrateTransactionType::BusinessResignation,
            Asset::BusinessUpdate(_) => MagistrateTransactionType::BusinessUpdate,
            Asset::BridgechainRegistration(_) => MagistrateTransactionType::BridgechainRegistration,
            Asset::BridgechainResignation(_) => MagistrateTransactionType::BridgechainResignation,
            Asset::BridgechainUpdate(_) => MagistrateTransactionType::BridgechainUpdate,
            Asset::Entity(_) => MagistrateTransactionType::Entity,
        }
    }

    pub fn as_business_registration(&self) -> Option<&BusinessRegistrationAsset> {
        match self {
            Asset::BusinessRegistration(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_business_update(&self) -> Option<&BusinessUpdateAsset> {
        match self {
            Asset::BusinessUpdate(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_bridgechain_registration(&self) -> Option<&BridgechainRegistrationAsset> {
        match self {
            Asset::BridgechainRegistration(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_bridgechain_resignation(&self) -> Option<&BridgechainResignationAsset> {
        match self {
            Asset::BridgechainResignation(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_bridgechain_update(&self) -> Option<&BridgechainUpdateAsset> {
        match self {
            Asset::BridgechainUpdate(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityAsset> {
        match self {
            Asset::Entity(a) => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_keys_and_discriminants() {
        assert_eq!(MagistrateTransactionType::BridgechainUpdate.as_u16(), 5);
        assert_eq!(MagistrateTransactionType::Entity.key(), "entity");
        assert_eq!(
            MagistrateTransactionType::from_u16(3),
            Some(MagistrateTransactionType::BridgechainRegistration)
        );
        assert_eq!(MagistrateTransactionType::from_u16(7), None);
    }

    #[test]
    fn test_entity_enums_from_u8() {
        assert_eq!(EntityType::try_from(4).unwrap(), EntityType::Delegate);
        assert_eq!(EntitySubType::try_from(2).unwrap(), EntitySubType::PluginDesktop);
        assert_eq!(
            EntityAction::try_from(3).unwrap_err(),
            CodecError::UnknownVariant {
                field: "entity action",
                value: 3
            }
        );
    }

    #[test]
    fn test_asset_json_shape() {
        let asset = Asset::BusinessRegistration(BusinessRegistrationAsset {
            name: "DummyBusiness".to_string(),
            website: "https://www.dummy.example".to_string(),
            vat: None,
            repository: None,
        });
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "businessRegistration": {
                    "name": "DummyBusiness",
                    "website": "https://www.dummy.example"
                }
            })
        );

        let entity = Asset::Entity(EntityAsset {
            entity_type: EntityType::Plugin,
            sub_type: EntitySubType::PluginCore,
            action: EntityAction::Register,
            registration_id: None,
            data: EntityData {
                name: Some("my_plugin".to_string()),
                ipfs_data: None,
            },
        });
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["entity"]["type"], 2);
        assert_eq!(json["entity"]["subType"], 1);
        assert_eq!(json["entity"]["data"]["name"], "my_plugin");
        let back: Asset = serde_json::from_value(json).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_business_merge_only_overwrites_present_fields() {
        let mut asset = BusinessRegistrationAsset {
            name: "A".to_string(),
            website: "http://a.example".to_string(),
            vat: Some("VAT12345".to_string()),
            repository: None,
        };
        asset.merge(&BusinessUpdateAsset {
            website: Some("http://b.example".to_string()),
            ..Default::default()
        });
        assert_eq!(asset.name, "A");
        assert_eq!(asset.website, "http://b.example");
        assert_eq!(asset.vat.as_deref(), Some("VAT12345"));
    }

    #[test]
    fn test_entity_data_merge_is_associative_in_order() {
        let base = EntityData {
            name: Some("entity".to_string()),
            ipfs_data: None,
        };
        let u1 = EntityData {
            name: None,
            ipfs_data: Some("Qm1".to_string()),
        };
        let u2 = EntityData {
            name: None,
            ipfs_data: Some("Qm2".to_string()),
        };

        let mut live = base.clone();
        live.merge(&u1);
        live.merge(&u2);

        let mut replayed = base;
        for u in [&u1, &u2] {
            replayed.merge(u);
        }
        assert_eq!(live, replayed);
        assert_eq!(live.ipfs_data.as_deref(), Some("Qm2"));
        assert_eq!(live.name.as_deref(), Some("entity"));
    }
}
