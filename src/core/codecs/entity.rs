//! The generic entity transaction (register / update / resign of a typed entity).
//!
//! Layout: `type u8 | subType u8 | action u8 | registrationId (u8 length + raw bytes, 0 = absent) |
//! data.name? | data.ipfsData?`

use serde_json::{json, Value};

use crate::core::asset::{
    Asset, EntityAction, EntityAsset, EntityData, EntitySubType, EntityType, MagistrateTransactionType,
};
use crate::core::codecs::{magistrate_identity, TransactionCodec};
use crate::core::cursor::{ByteReader, ByteWriter, CodecError};
use crate::core::schema::{Format, ObjectRule, Schema, StringRule, SwitchRule};

const ENTITY: MagistrateTransactionType = MagistrateTransactionType::Entity;

fn enum_of(values: impl IntoIterator<Item = u8>) -> Schema {
    Schema::Enum(values.into_iter().map(Value::from).collect())
}

fn entity_object() -> ObjectRule {
    let data = ObjectRule::new()
        .property("name", StringRule::new().length(1, 40).format(Format::EntityName))
        .property("ipfsData", StringRule::new().length(2, 90))
        .deny_additional();

    ObjectRule::new()
        .property("type", enum_of([0, 1, 2, 3, 4]))
        .property("subType", enum_of([0, 1, 2]))
        .property("action", enum_of([0, 1, 2]))
        .property("registrationId", StringRule::new().format(Format::TransactionId))
        .property("data", data)
        .required(&["type", "subType", "action", "data"])
        .deny_additional()
}

fn action_cases() -> SwitchRule {
    let register = ObjectRule::new()
        .property("registrationId", Schema::Never)
        .property("data", ObjectRule::new().required(&["name"]));
    let update = ObjectRule::new()
        .required(&["registrationId"])
        .property("data", ObjectRule::new().property("name", Schema::Never).min_properties(1));
    let resign = ObjectRule::new()
        .required(&["registrationId"])
        .property("data", ObjectRule::new().max_properties(0));

    SwitchRule {
        discriminant: "action".to_string(),
        cases: vec![
            (json!(EntityAction::Register.as_u8()), register.into()),
            (json!(EntityAction::Update.as_u8()), update.into()),
            (json!(EntityAction::Resign.as_u8()), resign.into()),
        ],
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EntityCodec;

impl TransactionCodec for EntityCodec {
    magistrate_identity!(ENTITY);

    fn asset_schema(&self) -> Schema {
        let inner = Schema::AllOf(vec![entity_object().into(), action_cases().into()]);
        ObjectRule::new()
            .property(ENTITY.key(), inner)
            .required(&[ENTITY.key()])
            .deny_additional()
            .into()
    }

    fn serialize_asset(&self, asset: &Asset, writer: &mut ByteWriter) -> Result<(), CodecError> {
        let asset = asset
            .as_entity()
            .ok_or(CodecError::AssetMismatch { expected: ENTITY.key() })?;
        writer.write_u8(asset.entity_type.as_u8());
        writer.write_u8(asset.sub_type.as_u8());
        writer.write_u8(asset.action.as_u8());
        match &asset.registration_id {
            Some(id) => writer.write_hex_var("registrationId", id)?,
            None => writer.write_u8(0),
        }
        writer.write_optional_str("name", asset.data.name.as_deref())?;
        writer.write_optional_str("ipfsData", asset.data.ipfs_data.as_deref())
    }

    fn deserialize_asset(&self, reader: &mut ByteReader<'_>) -> Result<Asset, CodecError> {
        let entity_type = EntityType::try_from(reader.read_u8()?)?;
        let sub_type = EntitySubType::try_from(reader.read_u8()?)?;
        let action = EntityAction::try_from(reader.read_u8()?)?;
        Ok(Asset::Entity(EntityAsset {
            entity_type,
            sub_type,
            action,
            registration_id: reader.read_hex_var()?,
            data: EntityData {
                name: reader.read_optional_str("name")?,
                ipfs_data: reader.read_optional_str("ipfsData")?,
            },
        }))
    }
}
