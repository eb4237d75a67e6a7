pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod signature;
pub mod utils;

pub use config::{ConfigError, ConfigManager, EntityNameScope, MagistrateOptions, Milestone, NetworkConfig, StaticFees};
pub use error::{MagistrateError, Result};
pub use logging::{init_logging, LogFormat};
pub use signature::{sha256, sign_hash, verify_hash, KeyPair};

// Core API exports
pub use core::{Core, TxHash};
pub use core::asset::{
    Asset,
    BridgechainRegistrationAsset,
    BridgechainResignationAsset,
    BridgechainUpdateAsset,
    BusinessRegistrationAsset,
    BusinessResignationAsset,
    BusinessUpdateAsset,
    EntityAction,
    EntityAsset,
    EntityData,
    EntitySubType,
    EntityType,
    MagistrateTransactionType,
    CORE_API_PORT_KEY,
    MAGISTRATE_TYPE_GROUP,
};
pub use core::builder::TransactionBuilder;
pub use core::codecs::{magistrate_codecs, TransactionCodec};
pub use core::cursor::{ByteReader, ByteWriter, CodecError};
pub use core::events::{EventDispatcher, MagistrateEvent, MemoryEventDispatcher};
pub use core::fee::{static_fee, ARKTOSHI_PER_TOKEN};
pub use core::handlers::{
    EntityHandler,
    EntityRegistrationHook,
    DelegateEntityHook,
    Environment,
    HandlerError,
    HandlerRegistry,
    HandlerType,
    PoolError,
    TransactionHandler,
};
pub use core::history::{HistoryError, HistoryQuery, InMemoryTransactionHistory, TransactionHistory};
pub use core::mempool::{Mempool, MempoolError, PoolQuery};
pub use core::registry::{InternalTransactionType, RegistryError, SchemaVariant, TransactionRegistry};
pub use core::schema::{Schema, SchemaError, SchemaValidator, ValidationContext};
pub use core::state::{
    BridgechainAttributes,
    BusinessAttributes,
    EntityAttributes,
    InMemoryWalletRepository,
    StateError,
    Wallet,
    WalletAttributes,
    WalletRepository,
    WalletSnapshot,
};
pub use core::transaction::{Transaction, TransactionData, TransactionError, TransactionFactory};
