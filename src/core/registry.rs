//! Transaction type registry: `(typeGroup, type)` and string key → codec.
//!
//! Registering a codec also registers its four schemas with the registry's [`SchemaValidator`]:
//! `key`, `keySigned`, `keyStrict` and `keyLegacy`. They are removed together on deregistration.
//!
//! # Invariants
//! - No two codecs share a `(typeGroup, type)` pair.
//! - No two codecs share a key, whatever their group.
//! - A type is either registered together with all of its schema variants or not at all.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::asset::{Asset, CORE_TYPE_GROUP, MAGISTRATE_TYPE_GROUP};
use crate::core::codecs::{magistrate_codecs, TransactionCodec};
use crate::core::schema::{
    BigNumberRule, Format, IntegerRule, ObjectRule, Schema, SchemaError, SchemaValidator, StringRule,
    TransactionTypeRule, ValidationContext,
};
use crate::core::transaction::{TransactionData, TransactionError};
use crate::error::{MagistrateError, Result};

/// `(typeGroup, type)` pair identifying a transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalTransactionType {
    pub type_group: u32,
    pub type_id: u16,
}

impl InternalTransactionType {
    pub const fn new(type_group: u32, type_id: u16) -> Self {
        Self { type_group, type_id }
    }

    pub fn is_core(&self) -> bool {
        self.type_group == CORE_TYPE_GROUP
    }
}

impl fmt::Display for InternalTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.type_group, self.type_id)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Transaction type {0} is already registered")]
    DuplicateType(InternalTransactionType),

    #[error("Transaction key {0} is already registered")]
    DuplicateKey(String),

    #[error("Unknown transaction type {0}")]
    UnknownType(InternalTransactionType),

    #[error("Unknown transaction key {0}")]
    UnknownKey(String),

    #[error("Cannot deregister core transaction type {0}")]
    CoreTypeDeregistration(InternalTransactionType),

    #[error("Handler {handler} depends on {dependency}, which is not registered")]
    MissingDependency {
        handler: InternalTransactionType,
        dependency: InternalTransactionType,
    },

    #[error("Handler for {0} is already registered")]
    DuplicateHandler(InternalTransactionType),

    #[error("Handler for {0} is not activated at the current milestone")]
    NotActivated(InternalTransactionType),

    #[error("Schema registration failed: {0}")]
    Schema(SchemaError),
}

impl From<RegistryError> for MagistrateError {
    fn from(err: RegistryError) -> Self {
        MagistrateError::Registry(err)
    }
}

/// Which flavour of a type's transaction schema to validate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVariant {
    /// Signature optional, extra properties allowed.
    Base,
    /// Signature required.
    Signed,
    /// Signature required, no properties beyond the envelope.
    Strict,
    /// Version 1 shape: `nonce` optional.
    Legacy,
}

impl SchemaVariant {
    pub const ALL: [SchemaVariant; 4] = [
        SchemaVariant::Base,
        SchemaVariant::Signed,
        SchemaVariant::Strict,
        SchemaVariant::Legacy,
    ];

    /// Schema id for a type key: `businessRegistration`, `businessRegistrationSigned`, ...
    pub fn schema_id(self, key: &str) -> String {
        match self {
            SchemaVariant::Base => key.to_string(),
            SchemaVariant::Signed => format!("{}Signed", key),
            SchemaVariant::Strict => format!("{}Strict", key),
            SchemaVariant::Legacy => format!("{}Legacy", key),
        }
    }

    /// Full transaction schema for `codec` in this variant.
    pub fn schema(self, codec: &dyn TransactionCodec) -> Schema {
        let mut object = ObjectRule::new()
            .property("id", StringRule::new().format(Format::TransactionId))
            .property("version", IntegerRule::range(1, 2))
            .property("network", IntegerRule::range(0, u8::MAX as i64))
            .property("typeGroup", IntegerRule::range(0, u32::MAX as i64))
            .property("type", IntegerRule::range(0, u16::MAX as i64))
            .property("nonce", BigNumberRule::new().minimum(0))
            .property("senderPublicKey", StringRule::new().format(Format::PublicKey))
            .property("fee", BigNumberRule::new().minimum(1).bypass_exceptions())
            .property("amount", BigNumberRule::new().minimum(0).maximum(0))
            .property("signature", StringRule::new().length(128, 128).format(Format::Hex))
            .property("asset", codec.asset_schema())
            .required(&["type", "senderPublicKey", "fee", "amount", "asset"]);

        object = match self {
            SchemaVariant::Base => object.required(&["nonce"]),
            SchemaVariant::Signed => object.required(&["nonce", "signature"]),
            SchemaVariant::Strict => object.required(&["nonce", "signature"]).deny_additional(),
            SchemaVariant::Legacy => object,
        };

        Schema::AllOf(vec![
            object.into(),
            TransactionTypeRule {
                type_id: codec.type_id(),
                type_group: codec.type_group(),
            }
            .into(),
        ])
    }
}

/// Codec lookup by type and by key, plus the schema validator the codecs' schemas live in.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    codecs: BTreeMap<InternalTransactionType, Arc<dyn TransactionCodec>>,
    keys: BTreeMap<&'static str, InternalTransactionType>,
    validator: SchemaValidator,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the seven magistrate types.
    pub fn with_magistrate_types() -> std::result::Result<Self, RegistryError> {
        let mut registry = Self::new();
        for codec in magistrate_codecs() {
            registry.register(codec)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, codec: Arc<dyn TransactionCodec>) -> std::result::Result<(), RegistryError> {
        let internal = codec.internal_type();
        let key = codec.key();

        if self.codecs.contains_key(&internal) {
            return Err(RegistryError::DuplicateType(internal));
        }
        if self.keys.contains_key(key) {
            return Err(RegistryError::DuplicateKey(key.to_string()));
        }
        if let Some(id) = SchemaVariant::ALL
            .iter()
            .map(|variant| variant.schema_id(key))
            .find(|id| self.validator.has_schema(id))
        {
            return Err(RegistryError::Schema(SchemaError::DuplicateSchema(id)));
        }

        for variant in SchemaVariant::ALL {
            self.validator
                .add_schema(variant.schema_id(key), variant.schema(codec.as_ref()))
                .map_err(RegistryError::Schema)?;
        }
        self.keys.insert(key, internal);
        self.codecs.insert(internal, codec);

        info!(key, transaction_type = %internal, "Registered transaction type");
        Ok(())
    }

    /// Removes a non-core type and its schemas.
    pub fn deregister(&mut self, type_id: u16, type_group: u32) -> std::result::Result<(), RegistryError> {
        let internal = InternalTransactionType::new(type_group, type_id);
        if internal.is_core() {
            return Err(RegistryError::CoreTypeDeregistration(internal));
        }
        let codec = self
            .codecs
            .remove(&internal)
            .ok_or(RegistryError::UnknownType(internal))?;
        let key = codec.key();
        self.keys.remove(key);
        for variant in SchemaVariant::ALL {
            self.validator.remove_schema(&variant.schema_id(key));
        }

        debug!(key, transaction_type = %internal, "Deregistered transaction type");
        Ok(())
    }

    pub fn resolve(&self, type_id: u16, type_group: u32) -> std::result::Result<Arc<dyn TransactionCodec>, RegistryError> {
        let internal = InternalTransactionType::new(type_group, type_id);
        self.codecs
            .get(&internal)
            .cloned()
            .ok_or(RegistryError::UnknownType(internal))
    }

    /// Codec for the type an asset belongs to.
    pub fn resolve_asset(&self, asset: &Asset) -> std::result::Result<Arc<dyn TransactionCodec>, RegistryError> {
        self.resolve(asset.transaction_type().as_u16(), MAGISTRATE_TYPE_GROUP)
    }

    pub fn by_key(&self, key: &str) -> std::result::Result<Arc<dyn TransactionCodec>, RegistryError> {
        let internal = self
            .keys
            .get(key)
            .ok_or_else(|| RegistryError::UnknownKey(key.to_string()))?;
        self.resolve(internal.type_id, internal.type_group)
    }

    pub fn is_registered(&self, type_id: u16, type_group: u32) -> bool {
        self.codecs
            .contains_key(&InternalTransactionType::new(type_group, type_id))
    }

    /// Registered types in `(typeGroup, type)` order.
    pub fn types(&self) -> impl Iterator<Item = InternalTransactionType> + '_ {
        self.codecs.keys().copied()
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    /// Validates transaction data against the schema variant of its type.
    pub fn validate(
        &self,
        variant: SchemaVariant,
        data: &TransactionData,
        ctx: &ValidationContext<'_>,
    ) -> Result<()> {
        let codec = self.resolve(data.type_id, data.type_group)?;
        let value =
            serde_json::to_value(data).map_err(|e| TransactionError::Serialization(e.to_string()))?;
        self.validator
            .validate(&variant.schema_id(codec.key()), &value, ctx)?;
        Ok(())
    }
}
