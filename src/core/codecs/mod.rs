//! Per-type asset codecs.
//!
//! A codec owns the byte layout of one transaction type's asset body, the structural schema of that
//! asset, and the type's static fee. The envelope around the asset lives in `core::transaction`.
//!
//! # Invariants
//! - `deserialize_asset(serialize_asset(a)) == a` for every schema-valid asset `a`.
//! - `serialize_asset(deserialize_asset(b)) == b` for every byte string the codec accepts.
//! - Every field the schema requires is written and read back by the codec.

pub mod bridgechain;
pub mod business;
pub mod entity;

use std::fmt;
use std::sync::Arc;

use crate::config::Milestone;
use crate::core::asset::Asset;
use crate::core::cursor::{ByteReader, ByteWriter, CodecError};
use crate::core::fee;
use crate::core::registry::InternalTransactionType;
use crate::core::schema::Schema;

pub use bridgechain::{BridgechainRegistrationCodec, BridgechainResignationCodec, BridgechainUpdateCodec};
pub use business::{BusinessRegistrationCodec, BusinessResignationCodec, BusinessUpdateCodec};
pub use entity::EntityCodec;

pub trait TransactionCodec: Send + Sync + fmt::Debug {
    /// Registry key; also the id of the type's schema.
    fn key(&self) -> &'static str;

    fn type_group(&self) -> u32;

    fn type_id(&self) -> u16;

    /// Schema of the transaction's `asset` property.
    fn asset_schema(&self) -> Schema;

    fn static_fee(&self, milestone: &Milestone, asset: &Asset) -> u64 {
        fee::static_fee(milestone, asset)
    }

    fn serialize_asset(&self, asset: &Asset, writer: &mut ByteWriter) -> Result<(), CodecError>;

    fn deserialize_asset(&self, reader: &mut ByteReader<'_>) -> Result<Asset, CodecError>;

    fn internal_type(&self) -> InternalTransactionType {
        InternalTransactionType::new(self.type_group(), self.type_id())
    }
}

/// All seven magistrate codecs, in registration order.
pub fn magistrate_codecs() -> Vec<Arc<dyn TransactionCodec>> {
    vec![
        Arc::new(BusinessRegistrationCodec),
        Arc::new(BusinessResignationCodec),
        Arc::new(BusinessUpdateCodec),
        Arc::new(BridgechainRegistrationCodec),
        Arc::new(BridgechainResignationCodec),
        Arc::new(BridgechainUpdateCodec),
        Arc::new(EntityCodec),
    ]
}

/// Implements the identity methods of a magistrate codec from its `MagistrateTransactionType`.
macro_rules! magistrate_identity {
    ($kind:expr) => {
        fn key(&self) -> &'static str {
            $kind.key()
        }

        fn type_group(&self) -> u32 {
            $crate::core::asset::MAGISTRATE_TYPE_GROUP
        }

        fn type_id(&self) -> u16 {
            $kind.as_u16()
        }
    };
}
pub(crate) use magistrate_identity;

/// Writes a u8 element count, failing when `len` does not fit.
pub(crate) fn write_count(writer: &mut ByteWriter, field: &'static str, len: usize) -> Result<(), CodecError> {
    let count = u8::try_from(len).map_err(|_| CodecError::FieldTooLong {
        field,
        len,
        max: crate::core::cursor::MAX_VAR_LENGTH,
    })?;
    writer.write_u8(count);
    Ok(())
}

#[cfg(test)]
pub(crate) fn roundtrip(codec: &dyn TransactionCodec, asset: &Asset) -> (Vec<u8>, Asset) {
    let mut writer = ByteWriter::new();
    codec.serialize_asset(asset, &mut writer).unwrap();
    let bytes = writer.into_vec();
    let mut reader = ByteReader::new(&bytes);
    let decoded = codec.deserialize_asset(&mut reader).unwrap();
    reader.ensure_exhausted().unwrap();
    (bytes, decoded)
}
