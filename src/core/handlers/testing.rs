//! In-crate ledger harness for handler tests: handlers, wallets and history without the pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ConfigManager;
use crate::core::asset::{BridgechainRegistrationAsset, BusinessRegistrationAsset, CORE_API_PORT_KEY};
use crate::core::builder::TransactionBuilder;
use crate::core::handlers::{Environment, HandlerError, HandlerRegistry, TransactionHandler};
use crate::core::history::InMemoryTransactionHistory;
use crate::core::registry::TransactionRegistry;
use crate::core::state::{InMemoryWalletRepository, Wallet, WalletRepository};
use crate::core::transaction::Transaction;
use crate::signature::KeyPair;

pub(crate) const FUNDS: u64 = 500_000_000_000_000;

pub(crate) fn public_key(passphrase: &str) -> String {
    KeyPair::from_passphrase(passphrase).unwrap().public_key_hex()
}

pub(crate) fn business_asset(name: &str) -> BusinessRegistrationAsset {
    BusinessRegistrationAsset {
        name: name.to_string(),
        website: "http://www.website.com".to_string(),
        vat: None,
        repository: None,
    }
}

/// Distinct 32-byte hash for `n`.
pub(crate) fn genesis_hash(n: u8) -> String {
    let mut bytes = [0x12u8; 32];
    bytes[31] = n;
    hex::encode(bytes)
}

pub(crate) fn bridgechain_asset(name: &str, genesis_hash: &str) -> BridgechainRegistrationAsset {
    BridgechainRegistrationAsset {
        name: name.to_string(),
        seed_nodes: vec!["74.125.224.71".to_string()],
        genesis_hash: genesis_hash.to_string(),
        bridgechain_repository: "http://www.repository.com/myorg/myrepo".to_string(),
        bridgechain_asset_repository: None,
        ports: BTreeMap::from([(CORE_API_PORT_KEY.to_string(), 12345)]),
    }
}

pub(crate) struct Ledger {
    pub registry: TransactionRegistry,
    pub config: ConfigManager,
    pub handlers: HandlerRegistry,
    pub wallets: InMemoryWalletRepository,
    pub history: InMemoryTransactionHistory,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_config(ConfigManager::default())
    }

    pub fn with_config(config: ConfigManager) -> Self {
        Self::with_handlers(config, HandlerRegistry::with_magistrate_handlers().unwrap())
    }

    pub fn with_handlers(config: ConfigManager, handlers: HandlerRegistry) -> Self {
        let mut wallets = InMemoryWalletRepository::new();
        handlers.register_wallet_indexes(&mut wallets).unwrap();
        Self {
            registry: TransactionRegistry::with_magistrate_types().unwrap(),
            config,
            handlers,
            wallets,
            history: InMemoryTransactionHistory::new(),
        }
    }

    pub fn env(&self) -> Environment<'_> {
        Environment::new(&self.config, &self.history)
    }

    /// Gives the passphrase's wallet a large balance and returns its public key.
    pub fn fund(&mut self, passphrase: &str) -> String {
        let key = public_key(passphrase);
        self.wallets.set_balance(&key, FUNDS);
        key
    }

    pub fn sign(&self, builder: TransactionBuilder, passphrase: &str, nonce: u64) -> Transaction {
        builder
            .nonce(nonce)
            .sign(passphrase, &self.registry)
            .unwrap()
            .build(&self.registry)
            .unwrap()
    }

    /// Signs with the sender's next nonce.
    pub fn next(&self, builder: TransactionBuilder, passphrase: &str) -> Transaction {
        let nonce = self.wallet(passphrase).nonce + 1;
        self.sign(builder, passphrase, nonce)
    }

    pub fn wallet(&self, passphrase: &str) -> Wallet {
        let key = public_key(passphrase);
        self.wallets.get(&key).cloned().unwrap_or_else(|| Wallet::new(key))
    }

    pub fn handler(&self, tx: &Transaction) -> Arc<dyn TransactionHandler> {
        self.handlers.get(tx.internal_type()).unwrap()
    }

    pub fn check(&self, tx: &Transaction) -> Result<(), HandlerError> {
        let sender = self
            .wallets
            .get(tx.sender_public_key())
            .cloned()
            .unwrap_or_else(|| Wallet::new(tx.sender_public_key()));
        self.handler(tx)
            .throw_if_cannot_be_applied(&self.env(), tx, &sender, &self.wallets)
    }

    /// Checks, applies and records `tx`.
    pub fn apply(&mut self, tx: &Transaction) -> Result<(), HandlerError> {
        self.check(tx)?;
        let handler = self.handler(tx);
        let env = Environment::new(&self.config, &self.history);
        handler.apply(&env, tx, &mut self.wallets)?;
        self.history.append(tx.clone())?;
        Ok(())
    }

    pub fn revert(&mut self, tx: &Transaction) -> Result<(), HandlerError> {
        let handler = self.handler(tx);
        let env = Environment::new(&self.config, &self.history);
        handler.revert(&env, tx, &mut self.wallets)?;
        self.history.remove(&tx.id);
        Ok(())
    }

    /// Clears attributes and rebuilds them from history.
    pub fn bootstrap(&mut self) -> Result<usize, HandlerError> {
        self.wallets.reset_attributes();
        let env = Environment::new(&self.config, &self.history);
        self.handlers.bootstrap(&env, &mut self.wallets)
    }
}
