//! Rule-based structural validator for transaction data in its JSON form.
//!
//! A [`Schema`] is a small JSON-Schema subset (object/array/string/integer/const/enum/allOf) plus
//! the custom keywords transactions need:
//! - `BigNumber`: unsigned range check over numbers or decimal strings, optionally skipped for
//!   configured exception transactions.
//! - `Format::PackageName`: npm-style package names (bridgechain port keys).
//! - `TransactionType`: discriminator matching `type` and `typeGroup` of the whole transaction.
//!
//! Schemas are registered in a [`SchemaValidator`] under string ids (`businessRegistration`,
//! `businessRegistrationSigned`, ...). The first violation found is reported with a dotted path.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

use crate::core::asset::CORE_TYPE_GROUP;
use crate::error::MagistrateError;
use crate::utils;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{path} {message}")]
    Invalid { path: String, message: String },

    #[error("Unknown schema {0}")]
    UnknownSchema(String),

    #[error("Schema {0} is already registered")]
    DuplicateSchema(String),
}

impl SchemaError {
    fn invalid(path: &str, message: impl Into<String>) -> Self {
        SchemaError::Invalid {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl From<SchemaError> for MagistrateError {
    fn from(err: SchemaError) -> Self {
        MagistrateError::Schema(err)
    }
}

/// Named string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Uri,
    Hex,
    /// Lowercase hex of a 32-byte hash.
    Hash,
    PublicIp,
    PackageName,
    GenericName,
    Alphanumeric,
    EntityName,
    PublicKey,
    TransactionId,
}

impl Format {
    pub fn matches(self, value: &str) -> bool {
        match self {
            Format::Uri => utils::is_uri(value),
            Format::Hex => utils::is_hex(value),
            Format::Hash => utils::is_lower_hex_of_length(value, 64),
            Format::PublicIp => utils::is_public_ip(value),
            Format::PackageName => utils::is_valid_package_name(value),
            Format::GenericName => utils::is_generic_name(value),
            Format::Alphanumeric => utils::is_alphanumeric(value),
            Format::EntityName => utils::is_entity_name(value),
            Format::PublicKey => utils::is_public_key(value),
            Format::TransactionId => utils::is_transaction_id(value),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Uri => "uri",
            Format::Hex => "hex",
            Format::Hash => "hash",
            Format::PublicIp => "public ip",
            Format::PackageName => "package name",
            Format::GenericName => "generic name",
            Format::Alphanumeric => "alphanumeric",
            Format::EntityName => "entity name",
            Format::PublicKey => "public key",
            Format::TransactionId => "transaction id",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRule {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub format: Option<Format>,
}

impl StringRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn length(self, min: usize, max: usize) -> Self {
        self.min_length(min).max_length(max)
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegerRule {
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

impl IntegerRule {
    pub fn range(minimum: i64, maximum: i64) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }

    pub fn minimum(minimum: i64) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: None,
        }
    }
}

/// Unsigned amount range; numbers and decimal strings are both accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BigNumberRule {
    pub minimum: Option<u64>,
    pub maximum: Option<u64>,
    /// Skip the range check for configured exception transactions.
    pub bypass_exceptions: bool,
}

impl BigNumberRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minimum(mut self, minimum: u64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn maximum(mut self, maximum: u64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn bypass_exceptions(mut self) -> Self {
        self.bypass_exceptions = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRule {
    pub items: Box<Schema>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
}

impl ArrayRule {
    pub fn of(items: impl Into<Schema>) -> Self {
        Self {
            items: Box::new(items.into()),
            min_items: None,
            max_items: None,
            unique_items: false,
        }
    }

    pub fn items(mut self, min: usize, max: usize) -> Self {
        self.min_items = Some(min);
        self.max_items = Some(max);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique_items = true;
        self
    }
}

/// What to do with properties not listed in `properties`.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allow,
    Deny,
    /// Every extra property must satisfy this schema.
    Matching(Box<Schema>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRule {
    pub properties: BTreeMap<String, Schema>,
    pub required: Vec<String>,
    pub additional_properties: AdditionalProperties,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
    pub property_names: Option<Box<Schema>>,
}

impl Default for ObjectRule {
    fn default() -> Self {
        Self {
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: AdditionalProperties::Allow,
            min_properties: None,
            max_properties: None,
            property_names: None,
        }
    }
}

impl ObjectRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: &str, schema: impl Into<Schema>) -> Self {
        self.properties.insert(name.to_string(), schema.into());
        self
    }

    pub fn required(mut self, names: &[&str]) -> Self {
        for name in names {
            if !self.required.iter().any(|r| r == name) {
                self.required.push(name.to_string());
            }
        }
        self
    }

    pub fn deny_additional(mut self) -> Self {
        self.additional_properties = AdditionalProperties::Deny;
        self
    }

    pub fn additional(mut self, schema: impl Into<Schema>) -> Self {
        self.additional_properties = AdditionalProperties::Matching(Box::new(schema.into()));
        self
    }

    pub fn min_properties(mut self, n: usize) -> Self {
        self.min_properties = Some(n);
        self
    }

    pub fn max_properties(mut self, n: usize) -> Self {
        self.max_properties = Some(n);
        self
    }

    pub fn property_names(mut self, schema: impl Into<Schema>) -> Self {
        self.property_names = Some(Box::new(schema.into()));
        self
    }
}

/// Matches `type` and `typeGroup` (absent group means the core group).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionTypeRule {
    pub type_id: u16,
    pub type_group: u32,
}

/// Selects a sub-schema by the value of one property of the instance object.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchRule {
    pub discriminant: String,
    pub cases: Vec<(Value, Schema)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Any,
    /// Matches nothing; used to forbid a property.
    Never,
    Boolean,
    Integer(IntegerRule),
    BigNumber(BigNumberRule),
    String(StringRule),
    Array(ArrayRule),
    Object(ObjectRule),
    Const(Value),
    Enum(Vec<Value>),
    TransactionType(TransactionTypeRule),
    AllOf(Vec<Schema>),
    Switch(SwitchRule),
}

macro_rules! schema_from {
    ($rule:ty => $variant:ident) => {
        impl From<$rule> for Schema {
            fn from(rule: $rule) -> Self {
                Schema::$variant(rule)
            }
        }
    };
}

schema_from!(StringRule => String);
schema_from!(IntegerRule => Integer);
schema_from!(BigNumberRule => BigNumber);
schema_from!(ArrayRule => Array);
schema_from!(ObjectRule => Object);
schema_from!(TransactionTypeRule => TransactionType);
schema_from!(SwitchRule => Switch);

/// Per-call inputs for keywords that depend on more than the instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    pub exceptions: Option<&'a BTreeSet<String>>,
    pub transaction_id: Option<&'a str>,
}

impl<'a> ValidationContext<'a> {
    fn is_exception(&self) -> bool {
        match (self.exceptions, self.transaction_id) {
            (Some(exceptions), Some(id)) => exceptions.contains(id),
            _ => false,
        }
    }
}

impl Schema {
    pub fn validate(&self, value: &Value, ctx: &ValidationContext<'_>) -> Result<(), SchemaError> {
        self.validate_at(value, ctx, "data")
    }

    fn validate_at(&self, value: &Value, ctx: &ValidationContext<'_>, path: &str) -> Result<(), SchemaError> {
        match self {
            Schema::Any => Ok(()),
            Schema::Never => Err(SchemaError::invalid(path, "is not allowed")),
            Schema::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(SchemaError::invalid(path, "should be boolean")),
            },
            Schema::Integer(rule) => validate_integer(rule, value, path),
            Schema::BigNumber(rule) => validate_bignumber(rule, value, ctx, path),
            Schema::String(rule) => validate_string(rule, value, path),
            Schema::Array(rule) => validate_array(rule, value, ctx, path),
            Schema::Object(rule) => validate_object(rule, value, ctx, path),
            Schema::Const(expected) => {
                if value == expected {
                    Ok(())
                } else {
                    Err(SchemaError::invalid(path, format!("should be equal to constant {}", expected)))
                }
            }
            Schema::Enum(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err(SchemaError::invalid(path, "should be equal to one of the allowed values"))
                }
            }
            Schema::TransactionType(rule) => validate_transaction_type(rule, value, path),
            Schema::AllOf(schemas) => schemas.iter().try_for_each(|s| s.validate_at(value, ctx, path)),
            Schema::Switch(rule) => {
                let Some(object) = value.as_object() else {
                    return Err(SchemaError::invalid(path, "should be object"));
                };
                let Some(discriminant) = object.get(&rule.discriminant) else {
                    return Ok(());
                };
                match rule.cases.iter().find(|(case, _)| case == discriminant) {
                    Some((_, schema)) => schema.validate_at(value, ctx, path),
                    None => Err(SchemaError::invalid(
                        &format!("{}.{}", path, rule.discriminant),
                        "should match a known case",
                    )),
                }
            }
        }
    }
}

fn validate_integer(rule: &IntegerRule, value: &Value, path: &str) -> Result<(), SchemaError> {
    let number = match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n,
        _ => return Err(SchemaError::invalid(path, "should be integer")),
    };
    // Any u64 above i64::MAX is above every configured maximum.
    let as_i64 = number.as_i64();
    if let Some(min) = rule.minimum {
        if matches!(as_i64, Some(v) if v < min) {
            return Err(SchemaError::invalid(path, format!("should be >= {}", min)));
        }
    }
    if let Some(max) = rule.maximum {
        if as_i64.map_or(true, |v| v > max) {
            return Err(SchemaError::invalid(path, format!("should be <= {}", max)));
        }
    }
    Ok(())
}

fn validate_bignumber(
    rule: &BigNumberRule,
    value: &Value,
    ctx: &ValidationContext<'_>,
    path: &str,
) -> Result<(), SchemaError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s.parse::<u64>().ok(),
        _ => None,
    };
    let Some(amount) = parsed else {
        return Err(SchemaError::invalid(path, "should pass \"bignumber\" keyword validation"));
    };
    if rule.bypass_exceptions && ctx.is_exception() {
        return Ok(());
    }
    if let Some(min) = rule.minimum {
        if amount < min {
            return Err(SchemaError::invalid(path, format!("should be >= {}", min)));
        }
    }
    if let Some(max) = rule.maximum {
        if amount > max {
            return Err(SchemaError::invalid(path, format!("should be <= {}", max)));
        }
    }
    Ok(())
}

fn validate_string(rule: &StringRule, value: &Value, path: &str) -> Result<(), SchemaError> {
    let Value::String(s) = value else {
        return Err(SchemaError::invalid(path, "should be string"));
    };
    let chars = s.chars().count();
    if let Some(min) = rule.min_length {
        if chars < min {
            return Err(SchemaError::invalid(
                path,
                format!("should NOT be shorter than {} characters", min),
            ));
        }
    }
    if let Some(max) = rule.max_length {
        if chars > max {
            return Err(SchemaError::invalid(
                path,
                format!("should NOT be longer than {} characters", max),
            ));
        }
    }
    if let Some(format) = rule.format {
        if !format.matches(s) {
            return Err(SchemaError::invalid(path, format!("should match format \"{}\"", format)));
        }
    }
    Ok(())
}

fn validate_array(rule: &ArrayRule, value: &Value, ctx: &ValidationContext<'_>, path: &str) -> Result<(), SchemaError> {
    let Value::Array(items) = value else {
        return Err(SchemaError::invalid(path, "should be array"));
    };
    if let Some(min) = rule.min_items {
        if items.len() < min {
            return Err(SchemaError::invalid(path, format!("should NOT have fewer than {} items", min)));
        }
    }
    if let Some(max) = rule.max_items {
        if items.len() > max {
            return Err(SchemaError::invalid(path, format!("should NOT have more than {} items", max)));
        }
    }
    if rule.unique_items {
        for (i, item) in items.iter().enumerate() {
            if items[..i].contains(item) {
                return Err(SchemaError::invalid(
                    path,
                    format!("should NOT have duplicate items (item {} is a duplicate)", i),
                ));
            }
        }
    }
    for (i, item) in items.iter().enumerate() {
        rule.items.validate_at(item, ctx, &format!("{}[{}]", path, i))?;
    }
    Ok(())
}

fn validate_object(
    rule: &ObjectRule,
    value: &Value,
    ctx: &ValidationContext<'_>,
    path: &str,
) -> Result<(), SchemaError> {
    let Value::Object(object) = value else {
        return Err(SchemaError::invalid(path, "should be object"));
    };
    for name in &rule.required {
        if !object.contains_key(name) {
            return Err(SchemaError::invalid(
                path,
                format!("should have required property '{}'", name),
            ));
        }
    }
    if let Some(min) = rule.min_properties {
        if object.len() < min {
            return Err(SchemaError::invalid(
                path,
                format!("should NOT have fewer than {} properties", min),
            ));
        }
    }
    if let Some(max) = rule.max_properties {
        if object.len() > max {
            return Err(SchemaError::invalid(
                path,
                format!("should NOT have more than {} properties", max),
            ));
        }
    }
    validate_members(rule, object, ctx, path)
}

fn validate_members(
    rule: &ObjectRule,
    object: &Map<String, Value>,
    ctx: &ValidationContext<'_>,
    path: &str,
) -> Result<(), SchemaError> {
    for (key, member) in object {
        if let Some(names) = &rule.property_names {
            names
                .validate_at(&Value::String(key.clone()), ctx, &format!("{} property name '{}'", path, key))?;
        }
        let member_path = format!("{}.{}", path, key);
        match rule.properties.get(key) {
            Some(schema) => schema.validate_at(member, ctx, &member_path)?,
            None => match &rule.additional_properties {
                AdditionalProperties::Allow => {}
                AdditionalProperties::Deny => {
                    return Err(SchemaError::invalid(path, format!("should NOT have additional property '{}'", key)))
                }
                AdditionalProperties::Matching(schema) => schema.validate_at(member, ctx, &member_path)?,
            },
        }
    }
    Ok(())
}

fn validate_transaction_type(rule: &TransactionTypeRule, value: &Value, path: &str) -> Result<(), SchemaError> {
    let Some(object) = value.as_object() else {
        return Err(SchemaError::invalid(path, "should be object"));
    };
    let type_id = object.get("type").and_then(Value::as_u64);
    let type_group = match object.get("typeGroup") {
        None => Some(CORE_TYPE_GROUP as u64),
        Some(v) => v.as_u64(),
    };
    if type_id != Some(rule.type_id as u64) {
        return Err(SchemaError::invalid(
            &format!("{}.type", path),
            format!("should be transaction type {}", rule.type_id),
        ));
    }
    if type_group != Some(rule.type_group as u64) {
        return Err(SchemaError::invalid(
            &format!("{}.typeGroup", path),
            format!("should be type group {}", rule.type_group),
        ));
    }
    Ok(())
}

/// Schema registry keyed by id.
#[derive(Debug, Default)]
pub struct SchemaValidator {
    schemas: HashMap<String, Schema>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_schema(&mut self, id: impl Into<String>, schema: Schema) -> Result<(), SchemaError> {
        let id = id.into();
        if self.schemas.contains_key(&id) {
            return Err(SchemaError::DuplicateSchema(id));
        }
        self.schemas.insert(id, schema);
        Ok(())
    }

    pub fn remove_schema(&mut self, id: &str) -> bool {
        self.schemas.remove(id).is_some()
    }

    pub fn has_schema(&self, id: &str) -> bool {
        self.schemas.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id)
    }

    pub fn validate(&self, id: &str, value: &Value, ctx: &ValidationContext<'_>) -> Result<(), SchemaError> {
        let schema = self
            .schemas
            .get(id)
            .ok_or_else(|| SchemaError::UnknownSchema(id.to_string()))?;
        schema.validate(value, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn business() -> Schema {
        ObjectRule::new()
            .property("name", StringRule::new().length(1, 40).format(Format::GenericName))
            .property("website", StringRule::new().length(4, 80).format(Format::Uri))
            .property("vat", StringRule::new().length(8, 15).format(Format::Alphanumeric))
            .required(&["name", "website"])
            .deny_additional()
            .into()
    }

    #[test]
    fn test_object_rules() {
        let schema = business();
        let ctx = ValidationContext::default();
        assert!(schema
            .validate(&json!({"name": "DummyBusiness", "website": "https://www.dummy.example"}), &ctx)
            .is_ok());

        let err = schema.validate(&json!({"name": "DummyBusiness"}), &ctx).unwrap_err();
        assert_eq!(err.to_string(), "data should have required property 'website'");

        let err = schema
            .validate(&json!({"name": "a".repeat(41), "website": "https://x.example"}), &ctx)
            .unwrap_err();
        assert_eq!(err.to_string(), "data.name should NOT be longer than 40 characters");

        let err = schema
            .validate(&json!({"name": "n", "website": "https://x.example", "extra": 1}), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("additional property 'extra'"));

        let err = schema
            .validate(&json!({"name": "n", "website": "x.example"}), &ctx)
            .unwrap_err();
        assert!(err.to_string().starts_with("data.website should match format"));
    }

    #[test]
    fn test_array_rules() {
        let schema: Schema = ArrayRule::of(StringRule::new().format(Format::PublicIp))
            .items(1, 10)
            .unique()
            .into();
        let ctx = ValidationContext::default();
        assert!(schema.validate(&json!(["74.125.224.71"]), &ctx).is_ok());
        assert!(schema.validate(&json!([]), &ctx).is_err());
        assert!(schema.validate(&json!(["1.2.3.4", "1.2.3.4"]), &ctx).is_err());
        let err = schema.validate(&json!(["127.0.0.1"]), &ctx).unwrap_err();
        assert!(err.to_string().starts_with("data[0]"));
    }

    #[test]
    fn test_bignumber_accepts_numbers_and_strings() {
        let schema: Schema = BigNumberRule::new().minimum(1).into();
        let ctx = ValidationContext::default();
        assert!(schema.validate(&json!(5), &ctx).is_ok());
        assert!(schema.validate(&json!("5"), &ctx).is_ok());
        assert!(schema.validate(&json!(0), &ctx).is_err());
        assert!(schema.validate(&json!(-1), &ctx).is_err());
        assert!(schema.validate(&json!("1.5"), &ctx).is_err());
    }

    #[test]
    fn test_bignumber_exception_bypass() {
        let schema: Schema = BigNumberRule::new().minimum(1).bypass_exceptions().into();
        let exceptions: BTreeSet<String> = ["tx-exception".to_string()].into_iter().collect();
        let ctx = ValidationContext {
            exceptions: Some(&exceptions),
            transaction_id: Some("tx-exception"),
        };
        assert!(schema.validate(&json!(0), &ctx).is_ok());

        let ctx = ValidationContext {
            exceptions: Some(&exceptions),
            transaction_id: Some("tx-other"),
        };
        assert!(schema.validate(&json!(0), &ctx).is_err());
    }

    #[test]
    fn test_transaction_type_keyword() {
        let schema: Schema = TransactionTypeRule { type_id: 3, type_group: 2 }.into();
        let ctx = ValidationContext::default();
        assert!(schema.validate(&json!({"type": 3, "typeGroup": 2}), &ctx).is_ok());
        assert!(schema.validate(&json!({"type": 3}), &ctx).is_err());
        let err = schema.validate(&json!({"type": 4, "typeGroup": 2}), &ctx).unwrap_err();
        assert!(err.to_string().starts_with("data.type"));
    }

    #[test]
    fn test_switch_selects_case() {
        let schema: Schema = SwitchRule {
            discriminant: "action".to_string(),
            cases: vec![
                (json!(0), ObjectRule::new().required(&["name"]).into()),
                (json!(1), ObjectRule::new().required(&["id"]).into()),
            ],
        }
        .into();
        let ctx = ValidationContext::default();
        assert!(schema.validate(&json!({"action": 0, "name": "x"}), &ctx).is_ok());
        assert!(schema.validate(&json!({"action": 1, "name": "x"}), &ctx).is_err());
        assert!(schema.validate(&json!({"action": 9}), &ctx).is_err());
    }

    #[test]
    fn test_property_names_and_additional() {
        let schema: Schema = ObjectRule::new()
            .required(&["@arkecosystem/core-api"])
            .property_names(StringRule::new().length(1, 214).format(Format::PackageName))
            .additional(IntegerRule::range(0, 65535))
            .into();
        let ctx = ValidationContext::default();
        assert!(schema.validate(&json!({"@arkecosystem/core-api": 4003}), &ctx).is_ok());
        assert!(schema.validate(&json!({"@arkecosystem/core-api": 65536}), &ctx).is_err());
        assert!(schema
            .validate(&json!({"@arkecosystem/core-api": 1, "@invalid/UPPERCASE": 2}), &ctx)
            .is_err());
    }

    #[test]
    fn test_validator_registry() {
        let mut validator = SchemaValidator::new();
        validator.add_schema("business", business()).unwrap();
        assert_eq!(
            validator.add_schema("business", Schema::Any),
            Err(SchemaError::DuplicateSchema("business".to_string()))
        );
        assert!(validator.has_schema("business"));
        assert_eq!(
            validator.validate("missing", &json!({}), &ValidationContext::default()),
            Err(SchemaError::UnknownSchema("missing".to_string()))
        );
        assert!(validator.remove_schema("business"));
        assert!(!validator.has_schema("business"));
    }
}
