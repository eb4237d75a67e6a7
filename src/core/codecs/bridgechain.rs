//! Bridgechain registration, resignation and update.
//!
//! Registration layout:
//! `name | u8 count, seed nodes | genesisHash (32 raw bytes) | bridgechainRepository |
//!  bridgechainAssetRepository? | u8 count, (name, u16 LE port)*`
//!
//! Update layout: `bridgechainId u64 LE | u8 count (0 = absent), seed nodes | u8 count (0 = absent),
//! ports | bridgechainRepository? | bridgechainAssetRepository?`
//!
//! Resignation layout: `bridgechainId` as the 32 raw bytes of the genesis hash.
//!
//! Ports are written in ascending key order; the decoder rejects any other order.

use std::collections::BTreeMap;

use crate::core::asset::{
    Asset, BridgechainRegistrationAsset, BridgechainResignationAsset, BridgechainUpdateAsset,
    MagistrateTransactionType, CORE_API_PORT_KEY,
};
use crate::core::codecs::{magistrate_identity, write_count, TransactionCodec};
use crate::core::cursor::{ByteReader, ByteWriter, CodecError};
use crate::core::schema::{ArrayRule, BigNumberRule, Format, IntegerRule, ObjectRule, Schema, StringRule};

const REGISTRATION: MagistrateTransactionType = MagistrateTransactionType::BridgechainRegistration;
const RESIGNATION: MagistrateTransactionType = MagistrateTransactionType::BridgechainResignation;
const UPDATE: MagistrateTransactionType = MagistrateTransactionType::BridgechainUpdate;

/// Size of a genesis hash on the wire.
pub const GENESIS_HASH_LENGTH: usize = 32;

fn seed_nodes_schema() -> ArrayRule {
    ArrayRule::of(StringRule::new().format(Format::PublicIp))
        .items(1, 10)
        .unique()
}

fn ports_schema() -> ObjectRule {
    ObjectRule::new()
        .required(&[CORE_API_PORT_KEY])
        .min_properties(1)
        .max_properties(255)
        .property_names(StringRule::new().length(1, 214).format(Format::PackageName))
        .additional(IntegerRule::range(0, u16::MAX as i64))
}

fn repository_schema() -> StringRule {
    StringRule::new().length(1, 100).format(Format::Uri)
}

fn wrap(key: &str, inner: ObjectRule) -> Schema {
    ObjectRule::new()
        .property(key, inner)
        .required(&[key])
        .deny_additional()
        .into()
}

fn write_seed_nodes(writer: &mut ByteWriter, seed_nodes: &[String]) -> Result<(), CodecError> {
    write_count(writer, "seedNodes", seed_nodes.len())?;
    for node in seed_nodes {
        writer.write_var_str("seedNode", node)?;
    }
    Ok(())
}

fn read_seed_nodes(reader: &mut ByteReader<'_>) -> Result<Vec<String>, CodecError> {
    let count = reader.read_u8()?;
    (0..count).map(|_| reader.read_var_str("seedNode")).collect()
}

fn write_ports(writer: &mut ByteWriter, ports: &BTreeMap<String, u16>) -> Result<(), CodecError> {
    write_count(writer, "ports", ports.len())?;
    for (name, port) in ports {
        writer.write_var_str("port name", name)?;
        writer.write_u16_le(*port);
    }
    Ok(())
}

fn read_ports(reader: &mut ByteReader<'_>) -> Result<BTreeMap<String, u16>, CodecError> {
    let count = reader.read_u8()?;
    let mut ports = BTreeMap::new();
    let mut previous: Option<String> = None;
    for _ in 0..count {
        let name = reader.read_var_str("port name")?;
        let port = reader.read_u16_le()?;
        if previous.as_ref().map_or(false, |p| *p >= name) {
            return Err(CodecError::NonCanonical(format!(
                "port {} is out of order or duplicated",
                name
            )));
        }
        previous = Some(name.clone());
        ports.insert(name, port);
    }
    Ok(ports)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BridgechainRegistrationCodec;

impl TransactionCodec for BridgechainRegistrationCodec {
    magistrate_identity!(REGISTRATION);

    fn asset_schema(&self) -> Schema {
        let inner = ObjectRule::new()
            .property("name", StringRule::new().length(1, 40).format(Format::GenericName))
            .property("seedNodes", seed_nodes_schema())
            .property("genesisHash", StringRule::new().format(Format::Hash))
            .property("bridgechainRepository", repository_schema())
            .property("bridgechainAssetRepository", repository_schema())
            .property("ports", ports_schema())
            .required(&["name", "seedNodes", "genesisHash", "bridgechainRepository", "ports"])
            .deny_additional();
        wrap(REGISTRATION.key(), inner)
    }

    fn serialize_asset(&self, asset: &Asset, writer: &mut ByteWriter) -> Result<(), CodecError> {
        let asset = asset
            .as_bridgechain_registration()
            .ok_or(CodecError::AssetMismatch { expected: REGISTRATION.key() })?;
        writer.write_var_str("name", &asset.name)?;
        write_seed_nodes(writer, &asset.seed_nodes)?;
        writer.write_hex_fixed("genesisHash", &asset.genesis_hash, GENESIS_HASH_LENGTH)?;
        writer.write_var_str("bridgechainRepository", &asset.bridgechain_repository)?;
        writer.write_optional_str(
            "bridgechainAssetRepository",
            asset.bridgechain_asset_repository.as_deref(),
        )?;
        write_ports(writer, &asset.ports)
    }

    fn deserialize_asset(&self, reader: &mut ByteReader<'_>) -> Result<Asset, CodecError> {
        Ok(Asset::BridgechainRegistration(BridgechainRegistrationAsset {
            name: reader.read_var_str("name")?,
            seed_nodes: read_seed_nodes(reader)?,
            genesis_hash: reader.read_hex_fixed(GENESIS_HASH_LENGTH)?,
            bridgechain_repository: reader.read_var_str("bridgechainRepository")?,
            bridgechain_asset_repository: reader.read_optional_str("bridgechainAssetRepository")?,
            ports: read_ports(reader)?,
        }))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BridgechainResignationCodec;

impl TransactionCodec for BridgechainResignationCodec {
    magistrate_identity!(RESIGNATION);

    fn asset_schema(&self) -> Schema {
        let inner = ObjectRule::new()
            .property("bridgechainId", StringRule::new().format(Format::Hash))
            .required(&["bridgechainId"])
            .deny_additional();
        wrap(RESIGNATION.key(), inner)
    }

    fn serialize_asset(&self, asset: &Asset, writer: &mut ByteWriter) -> Result<(), CodecError> {
        let asset = asset
            .as_bridgechain_resignation()
            .ok_or(CodecError::AssetMismatch { expected: RESIGNATION.key() })?;
        writer.write_hex_fixed("bridgechainId", &asset.bridgechain_id, GENESIS_HASH_LENGTH)
    }

    fn deserialize_asset(&self, reader: &mut ByteReader<'_>) -> Result<Asset, CodecError> {
        Ok(Asset::BridgechainResignation(BridgechainResignationAsset {
            bridgechain_id: reader.read_hex_fixed(GENESIS_HASH_LENGTH)?,
        }))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BridgechainUpdateCodec;

impl TransactionCodec for BridgechainUpdateCodec {
    magistrate_identity!(UPDATE);

    fn asset_schema(&self) -> Schema {
        let inner = ObjectRule::new()
            .property("bridgechainId", BigNumberRule::new().minimum(1))
            .property("seedNodes", seed_nodes_schema())
            .property("ports", ports_schema())
            .property("bridgechainRepository", repository_schema())
            .property("bridgechainAssetRepository", repository_schema())
            .required(&["bridgechainId"])
            .min_properties(2)
            .deny_additional();
        wrap(UPDATE.key(), inner)
    }

    fn serialize_asset(&self, asset: &Asset, writer: &mut ByteWriter) -> Result<(), CodecError> {
        let asset = asset
            .as_bridgechain_update()
            .ok_or(CodecError::AssetMismatch { expected: UPDATE.key() })?;
        writer.write_u64_le(asset.bridgechain_id);
        match &asset.seed_nodes {
            Some(nodes) => write_seed_nodes(writer, nodes)?,
            None => writer.write_u8(0),
        }
        match &asset.ports {
            Some(ports) => write_ports(writer, ports)?,
            None => writer.write_u8(0),
        }
        writer.write_optional_str("bridgechainRepository", asset.bridgechain_repository.as_deref())?;
        writer.write_optional_str(
            "bridgechainAssetRepository",
            asset.bridgechain_asset_repository.as_deref(),
        )
    }

    fn deserialize_asset(&self, reader: &mut ByteReader<'_>) -> Result<Asset, CodecError> {
        let bridgechain_id = reader.read_u64_le()?;
        let seed_nodes = read_seed_nodes(reader)?;
        let ports = read_ports(reader)?;
        Ok(Asset::BridgechainUpdate(BridgechainUpdateAsset {
            bridgechain_id,
            seed_nodes: if seed_nodes.is_empty() { None } else { Some(seed_nodes) },
            ports: if ports.is_empty() { None } else { Some(ports) },
            bridgechain_repository: reader.read_optional_str("bridgechainRepository")?,
            bridgechain_asset_repository: reader.read_optional_str("bridgechainAssetRepository")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codecs::roundtrip;
    use crate::core::schema::ValidationContext;
    use serde_json::json;

    const GENESIS_HASH: &str = "127e6fbfe24a750e72930c220a8e138275656b8e5d8f48a98c3c92df2caba935";

    fn bridgechain() -> BridgechainRegistrationAsset {
        BridgechainRegistrationAsset {
            name: "arkecosystem1".to_string(),
            seed_nodes: vec![
                "74.125.224.71".to_string(),
                "74.125.224.72".to_string(),
                "64.233.173.193".to_string(),
                "2001:4860:4860::8888".to_string(),
                "2001:4860:4860::8844".to_string(),
            ],
            genesis_hash: GENESIS_HASH.to_string(),
            bridgechain_repository: "http://www.repository.com/myorg/myrepo".to_string(),
            bridgechain_asset_repository: Some("http://www.repository.com/myorg/myassetrepo".to_string()),
            ports: [("@arkecosystem/core-api".to_string(), 12345)].into_iter().collect(),
        }
    }

    #[test]
    fn test_registration_roundtrip() {
        let asset = Asset::BridgechainRegistration(bridgechain());
        let (bytes, decoded) = roundtrip(&BridgechainRegistrationCodec, &asset);
        assert_eq!(decoded, asset);
        // u16 little-endian port at the very end.
        assert_eq!(&bytes[bytes.len() - 2..], &12345u16.to_le_bytes());
    }

    #[test]
    fn test_registration_genesis_hash_is_raw() {
        let mut asset = bridgechain();
        asset.seed_nodes = vec!["1.2.3.4".to_string()];
        asset.name = "a".to_string();
        let (bytes, _) = roundtrip(&BridgechainRegistrationCodec, &Asset::BridgechainRegistration(asset));
        // name(1+1) seedNodes(1 + 1+7) then the 32 hash bytes
        assert_eq!(hex::encode(&bytes[11..43]), GENESIS_HASH);
    }

    #[test]
    fn test_ports_out_of_order_are_rejected() {
        let mut writer = ByteWriter::new();
        writer.write_u8(2);
        writer.write_var_str("port name", "b").unwrap();
        writer.write_u16_le(1);
        writer.write_var_str("port name", "a").unwrap();
        writer.write_u16_le(2);
        let bytes = writer.into_vec();
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(read_ports(&mut reader), Err(CodecError::NonCanonical(_))));
    }

    #[test]
    fn test_update_uses_eight_byte_id() {
        let mut update = BridgechainUpdateAsset::new(u64::MAX - 1);
        update.seed_nodes = Some(vec!["1.2.3.4".to_string()]);
        let asset = Asset::BridgechainUpdate(update);
        let (bytes, decoded) = roundtrip(&BridgechainUpdateCodec, &asset);
        assert_eq!(&bytes[..8], &(u64::MAX - 1).to_le_bytes());
        assert_eq!(decoded, asset);
    }

    #[test]
    fn test_update_empty_lists_canonicalise_to_absent() {
        let mut update = BridgechainUpdateAsset::new(1);
        update.seed_nodes = Some(Vec::new());
        update.bridgechain_repository = Some("http://www.repository.com/x".to_string());
        let (_, decoded) = roundtrip(&BridgechainUpdateCodec, &Asset::BridgechainUpdate(update));
        let decoded = decoded.as_bridgechain_update().unwrap().clone();
        assert_eq!(decoded.seed_nodes, None);
        assert_eq!(decoded.ports, None);
        assert_eq!(decoded.bridgechain_repository.as_deref(), Some("http://www.repository.com/x"));
    }

    #[test]
    fn test_resignation_roundtrip() {
        let asset = Asset::BridgechainResignation(BridgechainResignationAsset {
            bridgechain_id: GENESIS_HASH.to_string(),
        });
        let (bytes, decoded) = roundtrip(&BridgechainResignationCodec, &asset);
        assert_eq!(bytes.len(), GENESIS_HASH_LENGTH);
        assert_eq!(decoded, asset);
    }

    #[test]
    fn test_registration_schema_edge_cases() {
        let schema = BridgechainRegistrationCodec.asset_schema();
        let ctx = ValidationContext::default();
        let valid = serde_json::to_value(bridgechain()).unwrap();
        assert!(schema.validate(&json!({"bridgechainRegistration": valid}), &ctx).is_ok());

        let mut localhost = valid.clone();
        localhost["seedNodes"] = json!(["127.0.0.1"]);
        assert!(schema.validate(&json!({"bridgechainRegistration": localhost}), &ctx).is_err());

        let mut duplicated = valid.clone();
        duplicated["seedNodes"] = json!(["74.125.224.71", "74.125.224.71"]);
        assert!(schema.validate(&json!({"bridgechainRegistration": duplicated}), &ctx).is_err());

        let mut no_seeds = valid.clone();
        no_seeds["seedNodes"] = json!([]);
        assert!(schema.validate(&json!({"bridgechainRegistration": no_seeds}), &ctx).is_err());

        let mut short_hash = valid.clone();
        short_hash["genesisHash"] = json!(&GENESIS_HASH[..63]);
        assert!(schema.validate(&json!({"bridgechainRegistration": short_hash}), &ctx).is_err());

        let mut no_core_api = valid.clone();
        no_core_api["ports"] = json!({"@arkecosystem/core-p2p": 4002});
        assert!(schema.validate(&json!({"bridgechainRegistration": no_core_api}), &ctx).is_err());

        let mut empty_repo = valid;
        empty_repo["bridgechainRepository"] = json!("");
        assert!(schema.validate(&json!({"bridgechainRegistration": empty_repo}), &ctx).is_err());
    }

    #[test]
    fn test_update_schema_requires_a_change() {
        let schema = BridgechainUpdateCodec.asset_schema();
        let ctx = ValidationContext::default();
        assert!(schema.validate(&json!({"bridgechainUpdate": {"bridgechainId": 1}}), &ctx).is_err());
        assert!(schema
            .validate(&json!({"bridgechainUpdate": {"bridgechainId": 1, "seedNodes": ["1.2.3.4"]}}), &ctx)
            .is_ok());
        assert!(schema
            .validate(&json!({"bridgechainUpdate": {"bridgechainId": 0, "seedNodes": ["1.2.3.4"]}}), &ctx)
            .is_err());
    }
}
