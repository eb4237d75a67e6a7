//! Canonical transaction envelope (version 2) for the magistrate types.
//!
//! Layout:
//! `0xff | version u8 | network u8 | typeGroup u32 LE | type u16 LE | nonce u64 LE |
//!  senderPublicKey (33 raw bytes) | fee u64 LE | vendorField length u8 (always 0) | asset | signature?`
//!
//! The signature, when present, is the 64-byte compact ECDSA signature over the SHA-256 of every
//! preceding byte. The transaction id is the SHA-256 of the full serialization, lowercase hex.
//!
//! # Invariants
//! - `serialize(deserialize(b)) == b` for every byte string `deserialize` accepts.
//! - The id is a pure function of the bytes; the same data always yields the same id.
//! - Amount is not on the wire and must be zero.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::asset::Asset;
use crate::core::cursor::{ByteReader, ByteWriter, CodecError};
use crate::core::registry::{InternalTransactionType, TransactionRegistry};
use crate::error::{MagistrateError, Result};
use crate::signature::{sha256, verify_hash, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// First byte of every serialized transaction.
pub const TRANSACTION_HEADER: u8 = 0xff;

/// The only envelope version these types can be carried in.
pub const TRANSACTION_VERSION: u8 = 2;

/// Errors produced while building or decoding a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Failed to serialize transaction data: {0}")]
    Serialization(String),

    #[error("Amount must be zero, got {0}")]
    NonZeroAmount(u64),

    #[error("Transaction is not signed")]
    MissingSignature,

    #[error("Id mismatch: expected {expected}, got {got}")]
    IdMismatch { expected: String, got: String },

    #[error("Transaction bytes are not canonical")]
    NonCanonical,
}

impl From<TransactionError> for MagistrateError {
    fn from(err: TransactionError) -> Self {
        MagistrateError::Transaction(err)
    }
}

/// Off-wire form of a transaction. Its JSON form is what the schema validator checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub version: u8,
    pub network: u8,
    pub type_group: u32,
    #[serde(rename = "type")]
    pub type_id: u16,
    pub nonce: u64,
    pub sender_public_key: String,
    pub fee: u64,
    #[serde(default)]
    pub amount: u64,
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl TransactionData {
    pub fn internal_type(&self) -> InternalTransactionType {
        InternalTransactionType::new(self.type_group, self.type_id)
    }
}

/// A decoded transaction together with its canonical bytes and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: String,
    pub data: TransactionData,
    pub serialized: Vec<u8>,
}

impl Transaction {
    pub fn sender_public_key(&self) -> &str {
        &self.data.sender_public_key
    }

    pub fn nonce(&self) -> u64 {
        self.data.nonce
    }

    pub fn fee(&self) -> u64 {
        self.data.fee
    }

    pub fn asset(&self) -> &Asset {
        &self.data.asset
    }

    pub fn internal_type(&self) -> InternalTransactionType {
        self.data.internal_type()
    }

    /// Registry key of the transaction's type.
    pub fn type_key(&self) -> &'static str {
        self.data.asset.transaction_type().key()
    }

    /// Checks the signature against the sender public key. Unsigned transactions do not verify.
    pub fn verify(&self) -> Result<bool> {
        let Some(signature) = &self.data.signature else {
            return Ok(false);
        };
        let unsigned_len = self.serialized.len().saturating_sub(SIGNATURE_LENGTH);
        let hash = sha256(&self.serialized[..unsigned_len]);
        verify_hash(&hash, signature, &self.data.sender_public_key)
    }
}

/// Serializes `data`, leaving the signature out when `exclude_signature` is set.
pub fn serialize(data: &TransactionData, registry: &TransactionRegistry, exclude_signature: bool) -> Result<Vec<u8>> {
    if data.version != TRANSACTION_VERSION {
        return Err(CodecError::UnsupportedVersion(data.version).into());
    }
    if data.amount != 0 {
        return Err(TransactionError::NonZeroAmount(data.amount).into());
    }
    let codec = registry.resolve(data.type_id, data.type_group)?;

    let mut writer = ByteWriter::with_capacity(128);
    writer.write_u8(TRANSACTION_HEADER);
    writer.write_u8(data.version);
    writer.write_u8(data.network);
    writer.write_u32_le(data.type_group);
    writer.write_u16_le(data.type_id);
    writer.write_u64_le(data.nonce);
    writer.write_hex_fixed("senderPublicKey", &data.sender_public_key, PUBLIC_KEY_LENGTH)?;
    writer.write_u64_le(data.fee);
    // vendor field
    writer.write_u8(0);
    codec.serialize_asset(&data.asset, &mut writer)?;

    if !exclude_signature {
        if let Some(signature) = &data.signature {
            writer.write_hex_fixed("signature", signature, SIGNATURE_LENGTH)?;
        }
    }
    Ok(writer.into_vec())
}

/// Decodes a full serialization. The returned data carries no id.
pub fn deserialize(bytes: &[u8], registry: &TransactionRegistry) -> Result<TransactionData> {
    let mut reader = ByteReader::new(bytes);

    let header = reader.read_u8()?;
    if header != TRANSACTION_HEADER {
        return Err(CodecError::InvalidHeader(header).into());
    }
    let version = reader.read_u8()?;
    if version != TRANSACTION_VERSION {
        return Err(CodecError::UnsupportedVersion(version).into());
    }
    let network = reader.read_u8()?;
    let type_group = reader.read_u32_le()?;
    let type_id = reader.read_u16_le()?;
    let nonce = reader.read_u64_le()?;
    let sender_public_key = reader.read_hex_fixed(PUBLIC_KEY_LENGTH)?;
    let fee = reader.read_u64_le()?;
    if reader.read_u8()? != 0 {
        return Err(CodecError::UnexpectedVendorField.into());
    }

    let codec = registry.resolve(type_id, type_group)?;
    let asset = codec.deserialize_asset(&mut reader)?;

    let signature = match reader.remaining() {
        0 => None,
        SIGNATURE_LENGTH => Some(reader.read_hex_fixed(SIGNATURE_LENGTH)?),
        n => return Err(CodecError::TrailingBytes(n).into()),
    };

    Ok(TransactionData {
        id: None,
        version,
        network,
        type_group,
        type_id,
        nonce,
        sender_public_key,
        fee,
        amount: 0,
        asset,
        signature,
    })
}

/// Digest the sender signs.
pub fn signing_hash(data: &TransactionData, registry: &TransactionRegistry) -> Result<[u8; 32]> {
    Ok(sha256(&serialize(data, registry, true)?))
}

pub fn compute_id(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}

/// Builds [`Transaction`]s from bytes or data against a registry.
#[derive(Debug, Clone, Copy)]
pub struct TransactionFactory<'a> {
    registry: &'a TransactionRegistry,
}

impl<'a> TransactionFactory<'a> {
    pub fn new(registry: &'a TransactionRegistry) -> Self {
        Self { registry }
    }

    /// Decodes wire bytes. Input that would not re-serialize to the same bytes is rejected.
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Transaction> {
        let mut data = deserialize(bytes, self.registry)?;
        if serialize(&data, self.registry, false)? != bytes {
            return Err(TransactionError::NonCanonical.into());
        }
        let id = compute_id(bytes);
        data.id = Some(id.clone());
        Ok(Transaction {
            id,
            data,
            serialized: bytes.to_vec(),
        })
    }

    pub fn from_hex(&self, hex_bytes: &str) -> Result<Transaction> {
        self.from_bytes(&hex::decode(hex_bytes)?)
    }

    /// Serializes `data`; an id already present must match the computed one.
    pub fn from_data(&self, mut data: TransactionData) -> Result<Transaction> {
        let serialized = serialize(&data, self.registry, false)?;
        let id = compute_id(&serialized);
        if let Some(given) = &data.id {
            if *given != id {
                return Err(TransactionError::IdMismatch {
                    expected: id,
                    got: given.clone(),
                }
                .into());
            }
        }
        data.id = Some(id.clone());
        Ok(Transaction { id, data, serialized })
    }

    pub fn from_json(&self, json: &str) -> Result<Transaction> {
        let data: TransactionData =
            serde_json::from_str(json).map_err(|e| TransactionError::Serialization(e.to_string()))?;
        self.from_data(data)
    }
}
