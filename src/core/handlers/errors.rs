use thiserror::Error;

use crate::core::history::HistoryError;
use crate::core::mempool::MempoolError;
use crate::error::MagistrateError;

/// Reasons a transaction cannot be applied, plus framework invariant violations raised while
/// applying or reverting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Static fee mismatch: expected {expected}, got {got}")]
    StaticFeeMismatch { expected: u64, got: u64 },

    #[error("Sender public key does not match the wallet")]
    SenderPublicKeyMismatch,

    #[error("Unexpected network: expected {expected}, got {got}")]
    UnexpectedNetwork { expected: u8, got: u8 },

    #[error("Transaction signature is missing or invalid")]
    InvalidSignature,

    #[error("Unexpected nonce: expected {expected}, got {got}")]
    UnexpectedNonce { expected: u64, got: u64 },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Business is already registered")]
    BusinessAlreadyRegistered,

    #[error("Business is not registered")]
    BusinessIsNotRegistered,

    #[error("Business is resigned")]
    BusinessIsResigned,

    #[error("Wallet is not a business")]
    WalletIsNotBusiness,

    #[error("Business has bridgechains that are not resigned")]
    BridgechainsAreNotResigned,

    #[error("Bridgechain is already registered")]
    BridgechainAlreadyRegistered,

    #[error("Bridgechain is not registered by this wallet")]
    BridgechainIsNotRegisteredByWallet,

    #[error("Bridgechain is not registered")]
    BridgechainIsNotRegistered,

    #[error("Bridgechain is resigned")]
    BridgechainIsResigned,

    #[error("Genesis hash is already registered")]
    GenesisHashAlreadyRegistered,

    #[error("Port key must be a valid package name: {0}")]
    PortKeyMustBeValidPackageName(String),

    #[error("Entity is already registered")]
    EntityAlreadyRegistered,

    #[error("Entity name is already registered")]
    EntityNameAlreadyRegistered,

    #[error("Entity is not registered")]
    EntityNotRegistered,

    #[error("Entity is already resigned")]
    EntityAlreadyResigned,

    #[error("Entity type does not match the registration")]
    EntityWrongType,

    #[error("Entity sub type does not match the registration")]
    EntityWrongSubType,

    #[error("Entity sender is not a delegate")]
    EntitySenderIsNotDelegate,

    #[error("Entity name does not match the delegate username")]
    EntityNameDoesNotMatchDelegate,

    #[error("Wallet state invariant violated: {0}")]
    Invariant(String),

    #[error("History replay out of order for transaction {0}")]
    ReplayOrderViolation(String),

    #[error("Revert out of order: wallet nonce {wallet}, transaction nonce {transaction}")]
    RevertOrderViolation { wallet: u64, transaction: u64 },

    #[error("Transaction history read failed: {0}")]
    History(HistoryError),
}

impl HandlerError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        HandlerError::Invariant(message.into())
    }
}

impl From<HistoryError> for HandlerError {
    fn from(err: HistoryError) -> Self {
        HandlerError::History(err)
    }
}

impl From<HandlerError> for MagistrateError {
    fn from(err: HandlerError) -> Self {
        MagistrateError::Handler(err)
    }
}

/// Rejections from the transaction pool. These never reach chain application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("{reason}")]
    Pending { transaction_id: String, reason: String },

    #[error("Pool query failed: {0}")]
    Mempool(MempoolError),
}

impl PoolError {
    pub(crate) fn pending(transaction_id: &str, reason: impl Into<String>) -> Self {
        PoolError::Pending {
            transaction_id: transaction_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable code reported to submitters.
    pub fn code(&self) -> &'static str {
        match self {
            PoolError::Pending { .. } => "ERR_PENDING",
            PoolError::Mempool(_) => "ERR_POOL",
        }
    }
}

impl From<MempoolError> for PoolError {
    fn from(err: MempoolError) -> Self {
        PoolError::Mempool(err)
    }
}

impl From<PoolError> for MagistrateError {
    fn from(err: PoolError) -> Self {
        MagistrateError::Pool(err)
    }
}
