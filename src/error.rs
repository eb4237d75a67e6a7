use thiserror::Error;

use crate::config::ConfigError;
use crate::core::cursor::CodecError;
use crate::core::handlers::{HandlerError, PoolError};
use crate::core::history::HistoryError;
use crate::core::mempool::MempoolError;
use crate::core::registry::RegistryError;
use crate::core::schema::SchemaError;
use crate::core::state::StateError;
use crate::core::transaction::TransactionError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MagistrateError {
    #[error("Codec error: {0}")]
    Codec(CodecError),

    #[error("Transaction schema error: {0}")]
    Schema(SchemaError),

    #[error("Registry error: {0}")]
    Registry(RegistryError),

    #[error("Transaction error: {0}")]
    Transaction(TransactionError),

    #[error("Handler error: {0}")]
    Handler(HandlerError),

    #[error("Pool admission error: {0}")]
    Pool(PoolError),

    #[error("Mempool error: {0}")]
    Mempool(MempoolError),

    #[error("State error: {0}")]
    State(StateError),

    #[error("History error: {0}")]
    History(HistoryError),

    #[error("Configuration error: {0}")]
    Config(ConfigError),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Signature error: {0}")]
    Signature(String),
}

pub type Result<T> = std::result::Result<T, MagistrateError>;

impl From<secp256k1::Error> for MagistrateError {
    fn from(err: secp256k1::Error) -> Self {
        MagistrateError::Crypto(err.to_string())
    }
}

impl From<hex::FromHexError> for MagistrateError {
    fn from(err: hex::FromHexError) -> Self {
        MagistrateError::Crypto(format!("Invalid hex: {}", err))
    }
}
