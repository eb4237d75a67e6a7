//! Business registration, resignation and update.
//!
//! Layout (registration): `name`, `website`, `vat?`, `repository?`, each a u8-length-prefixed
//! UTF-8 string with absent optionals written as a zero byte. Update writes all four as optional.
//! Resignation has an empty body.

use crate::core::asset::{
    Asset, BusinessRegistrationAsset, BusinessResignationAsset, BusinessUpdateAsset,
    MagistrateTransactionType,
};
use crate::core::codecs::{magistrate_identity, TransactionCodec};
use crate::core::cursor::{ByteReader, ByteWriter, CodecError};
use crate::core::schema::{Format, ObjectRule, Schema, StringRule};

const REGISTRATION: MagistrateTransactionType = MagistrateTransactionType::BusinessRegistration;
const RESIGNATION: MagistrateTransactionType = MagistrateTransactionType::BusinessResignation;
const UPDATE: MagistrateTransactionType = MagistrateTransactionType::BusinessUpdate;

/// Properties shared by the registration and update assets.
fn business_properties() -> ObjectRule {
    ObjectRule::new()
        .property("name", StringRule::new().length(1, 40).format(Format::GenericName))
        .property("website", StringRule::new().length(4, 80).format(Format::Uri))
        .property("vat", StringRule::new().length(8, 15).format(Format::Alphanumeric))
        .property("repository", StringRule::new().length(4, 80).format(Format::Uri))
        .deny_additional()
}

fn wrap(key: &str, inner: ObjectRule) -> Schema {
    ObjectRule::new()
        .property(key, inner)
        .required(&[key])
        .deny_additional()
        .into()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BusinessRegistrationCodec;

impl TransactionCodec for BusinessRegistrationCodec {
    magistrate_identity!(REGISTRATION);

    fn asset_schema(&self) -> Schema {
        wrap(REGISTRATION.key(), business_properties().required(&["name", "website"]))
    }

    fn serialize_asset(&self, asset: &Asset, writer: &mut ByteWriter) -> Result<(), CodecError> {
        let asset = asset
            .as_business_registration()
            .ok_or(CodecError::AssetMismatch { expected: REGISTRATION.key() })?;
        writer.write_var_str("name", &asset.name)?;
        writer.write_var_str("website", &asset.website)?;
        writer.write_optional_str("vat", asset.vat.as_deref())?;
        writer.write_optional_str("repository", asset.repository.as_deref())
    }

    fn deserialize_asset(&self, reader: &mut ByteReader<'_>) -> Result<Asset, CodecError> {
        Ok(Asset::BusinessRegistration(BusinessRegistrationAsset {
            name: reader.read_var_str("name")?,
            website: reader.read_var_str("website")?,
            vat: reader.read_optional_str("vat")?,
            repository: reader.read_optional_str("repository")?,
        }))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BusinessResignationCodec;

impl TransactionCodec for BusinessResignationCodec {
    magistrate_identity!(RESIGNATION);

    fn asset_schema(&self) -> Schema {
        wrap(RESIGNATION.key(), ObjectRule::new().max_properties(0))
    }

    fn serialize_asset(&self, asset: &Asset, _writer: &mut ByteWriter) -> Result<(), CodecError> {
        match asset {
            Asset::BusinessResignation(_) => Ok(()),
            _ => Err(CodecError::AssetMismatch { expected: RESIGNATION.key() }),
        }
    }

    fn deserialize_asset(&self, _reader: &mut ByteReader<'_>) -> Result<Asset, CodecError> {
        Ok(Asset::BusinessResignation(BusinessResignationAsset {}))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BusinessUpdateCodec;

impl TransactionCodec for BusinessUpdateCodec {
    magistrate_identity!(UPDATE);

    fn asset_schema(&self) -> Schema {
        wrap(UPDATE.key(), business_properties().min_properties(1))
    }

    fn serialize_asset(&self, asset: &Asset, writer: &mut ByteWriter) -> Result<(), CodecError> {
        let asset = asset
            .as_business_update()
            .ok_or(CodecError::AssetMismatch { expected: UPDATE.key() })?;
        writer.write_optional_str("name", asset.name.as_deref())?;
        writer.write_optional_str("website", asset.website.as_deref())?;
        writer.write_optional_str("vat", asset.vat.as_deref())?;
        writer.write_optional_str("repository", asset.repository.as_deref())
    }

    fn deserialize_asset(&self, reader: &mut ByteReader<'_>) -> Result<Asset, CodecError> {
        Ok(Asset::BusinessUpdate(BusinessUpdateAsset {
            name: reader.read_optional_str("name")?,
            website: reader.read_optional_str("website")?,
            vat: reader.read_optional_str("vat")?,
            repository: reader.read_optional_str("repository")?,
        }))
    }
}
