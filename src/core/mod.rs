// Magistrate transaction layer: wire codecs, schemas, and the handlers that check, apply and
// revert magistrate transactions against wallet state.
//
// INVARIANTS:
// - A transaction id is always recomputed from its canonical bytes, never taken from the caller.
// - A failed apply or revert leaves wallets exactly as they were.
// - Committed history holds exactly the applied transactions, in apply order.
// - Bootstrap over committed history reproduces the wallet attributes built by live application.

pub mod asset;
pub mod builder;
pub mod codecs;
pub mod cursor;
pub mod events;
pub mod fee;
pub mod handlers;
pub mod history;
pub mod mempool;
pub mod registry;
pub mod schema;
pub mod state;
pub mod transaction;

use tracing::{debug, info};

use crate::config::ConfigManager;
use crate::core::events::MemoryEventDispatcher;
use crate::core::handlers::{Environment, HandlerRegistry, TransactionHandler};
use crate::core::history::{HistoryError, InMemoryTransactionHistory};
use crate::core::mempool::Mempool;
use crate::core::registry::{SchemaVariant, TransactionRegistry};
use crate::core::schema::ValidationContext;
use crate::core::state::{InMemoryWalletRepository, Wallet, WalletRepository};
use crate::core::transaction::{Transaction, TransactionFactory};
use crate::error::{MagistrateError, Result};
use std::sync::Arc;

/// Transaction id, lowercase hex.
pub type TxHash = String;

/// Wires the type registry, handlers, wallet state, committed history, the pending pool and event
/// dispatch into one entry point.
///
/// Submission only admits a transaction to the pool. Applying and reverting are driven by the
/// caller, one transaction at a time, in nonce order per sender.
#[derive(Debug)]
pub struct Core {
    config: ConfigManager,
    registry: TransactionRegistry,
    handlers: HandlerRegistry,
    wallets: InMemoryWalletRepository,
    history: InMemoryTransactionHistory,
    mempool: Mempool,
    events: MemoryEventDispatcher,
}

impl Core {
    /// Core with the seven magistrate types and their handlers.
    pub fn new(config: ConfigManager) -> Result<Self> {
        Self::with_handlers(config, HandlerRegistry::with_magistrate_handlers()?)
    }

    pub fn with_handlers(config: ConfigManager, handlers: HandlerRegistry) -> Result<Self> {
        let mut wallets = InMemoryWalletRepository::new();
        handlers.register_wallet_indexes(&mut wallets)?;
        Ok(Self {
            config,
            registry: TransactionRegistry::with_magistrate_types()?,
            handlers,
            wallets,
            history: InMemoryTransactionHistory::new(),
            mempool: Mempool::new(),
            events: MemoryEventDispatcher::new(),
        })
    }

    /// Admits a transaction to the pool.
    ///
    /// Flow:
    /// 1. Re-decodes the canonical bytes, which recomputes the id
    /// 2. Validates against the signed schema of its type
    /// 3. Resolves the handler activated at the current milestone
    /// 4. Checks the transaction against committed wallet state
    /// 5. Runs the handler's pool admission rule and adds to the mempool under one pool write lock
    pub fn submit_transaction(&self, tx: Transaction) -> Result<TxHash> {
        self.submit_bytes(&tx.serialized)
    }

    pub fn submit_bytes(&self, bytes: &[u8]) -> Result<TxHash> {
        let tx = self.decode_valid(bytes)?;
        let handler = self.activated_handler(&tx)?;
        let sender = self.sender(&tx);
        handler.throw_if_cannot_be_applied(&self.env(), &tx, &sender, &self.wallets)?;

        let id = tx.id.clone();
        self.mempool.add_if(tx, |tx, pending| {
            handler
                .throw_if_cannot_enter_pool(tx, pending)
                .map_err(MagistrateError::from)
        })?;
        info!(transaction_id = %id, key = handler.key(), "Transaction admitted to pool");
        Ok(id)
    }

    /// Checks, applies and commits `tx`, then emits its events.
    ///
    /// `tx` goes through the same decoding and signed-schema validation as submission; only its
    /// serialized bytes are trusted.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<()> {
        let tx = &self.decode_valid(&tx.serialized)?;
        if self.history.contains(&tx.id) {
            return Err(HistoryError::Duplicate(tx.id.clone()).into());
        }
        let handler = self.activated_handler(tx)?;
        let sender = self.sender(tx);
        let snapshot = self.wallets.snapshot();

        let env = Environment::new(&self.config, &self.history);
        let applied = handler
            .throw_if_cannot_be_applied(&env, tx, &sender, &self.wallets)
            .and_then(|()| handler.apply(&env, tx, &mut self.wallets));
        if let Err(err) = applied {
            self.wallets.restore(&snapshot);
            debug!(transaction_id = %tx.id, error = %err, "Apply rejected, wallets restored");
            return Err(err.into());
        }

        self.history.append(tx.clone())?;
        self.mempool.remove_transaction(&tx.id)?;
        handler.emit_events(tx, &mut self.events);
        info!(transaction_id = %tx.id, key = handler.key(), "Transaction applied");
        Ok(())
    }

    /// Reverts a committed transaction. Transactions of one sender revert newest first.
    pub fn revert_transaction(&mut self, tx: &Transaction) -> Result<()> {
        let tx = &TransactionFactory::new(&self.registry).from_bytes(&tx.serialized)?;
        if !self.history.contains(&tx.id) {
            return Err(HistoryError::NotRecorded(tx.id.clone()).into());
        }
        let handler = self.handlers.get(tx.internal_type())?;
        let snapshot = self.wallets.snapshot();

        let env = Environment::new(&self.config, &self.history);
        if let Err(err) = handler.revert(&env, tx, &mut self.wallets) {
            self.wallets.restore(&snapshot);
            debug!(transaction_id = %tx.id, error = %err, "Revert failed, wallets restored");
            return Err(err.into());
        }

        self.history.remove(&tx.id);
        info!(transaction_id = %tx.id, key = handler.key(), "Transaction reverted");
        Ok(())
    }

    /// Rebuilds every wallet's magistrate attributes from committed history.
    /// Balances and nonces are left alone. Returns the number of rows replayed.
    pub fn bootstrap(&mut self) -> Result<usize> {
        let snapshot = self.wallets.snapshot();
        self.wallets.reset_attributes();
        let env = Environment::new(&self.config, &self.history);
        match self.handlers.bootstrap(&env, &mut self.wallets) {
            Ok(replayed) => Ok(replayed),
            Err(err) => {
                self.wallets.restore(&snapshot);
                Err(err.into())
            }
        }
    }

    pub fn set_height(&mut self, height: u64) {
        self.config.set_height(height);
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub fn registry(&self) -> &TransactionRegistry {
        &self.registry
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn wallets(&self) -> &InMemoryWalletRepository {
        &self.wallets
    }

    pub fn wallets_mut(&mut self) -> &mut InMemoryWalletRepository {
        &mut self.wallets
    }

    pub fn history(&self) -> &InMemoryTransactionHistory {
        &self.history
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn events(&self) -> &MemoryEventDispatcher {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut MemoryEventDispatcher {
        &mut self.events
    }

    /// Decodes canonical bytes, recomputing the id, and validates them against the signed schema.
    fn decode_valid(&self, bytes: &[u8]) -> Result<Transaction> {
        let tx = TransactionFactory::new(&self.registry).from_bytes(bytes)?;
        let ctx = ValidationContext {
            exceptions: Some(self.config.exceptions()),
            transaction_id: Some(&tx.id),
        };
        self.registry.validate(SchemaVariant::Signed, &tx.data, &ctx)?;
        Ok(tx)
    }

    fn env(&self) -> Environment<'_> {
        Environment::new(&self.config, &self.history)
    }

    fn activated_handler(&self, tx: &Transaction) -> Result<Arc<dyn TransactionHandler>> {
        Ok(self
            .handlers
            .get_activated_handler(tx.internal_type(), self.config.milestone())?)
    }

    /// Committed state of the sender; a wallet never seen before is empty.
    fn sender(&self, tx: &Transaction) -> Wallet {
        self.wallets
            .get(tx.sender_public_key())
            .cloned()
            .unwrap_or_else(|| Wallet::new(tx.sender_public_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Milestone, NetworkConfig};
    use crate::core::asset::{
        BridgechainRegistrationAsset, BusinessRegistrationAsset, BusinessUpdateAsset, EntityAction, EntityAsset,
        EntityData, EntitySubType, EntityType,
    };
    use crate::core::builder::TransactionBuilder;
    use crate::core::handlers::{HandlerError, PoolError};
    use crate::core::mempool::MempoolError;
    use crate::core::registry::RegistryError;
    use crate::signature::KeyPair;
    use std::sync::Barrier;

    const FUNDS: u64 = 500_000_000_000_000;

    fn business(name: &str) -> BusinessRegistrationAsset {
        BusinessRegistrationAsset {
            name: name.to_string(),
            website: "http://www.website.com".to_string(),
            vat: None,
            repository: None,
        }
    }

    fn funded_core(config: ConfigManager) -> (Core, String) {
        let mut core = Core::new(config).unwrap();
        let key = KeyPair::from_passphrase("alice").unwrap().public_key_hex();
        core.wallets_mut().set_balance(&key, FUNDS);
        (core, key)
    }

    fn signed(core: &Core, builder: TransactionBuilder, nonce: u64) -> Transaction {
        builder
            .nonce(nonce)
            .sign("alice", core.registry())
            .unwrap()
            .build(core.registry())
            .unwrap()
    }

    #[test]
    fn test_new_core() {
        let core = Core::new(ConfigManager::default()).unwrap();
        assert!(core.mempool().is_empty());
        assert!(core.history().is_empty());
        assert_eq!(core.handlers().len(), 7);
    }

    #[test]
    fn test_submit_admits_once() {
        let (core, _) = funded_core(ConfigManager::default());
        let tx = signed(&core, TransactionBuilder::business_registration(business("A")), 1);

        assert_eq!(core.submit_transaction(tx.clone()).unwrap(), tx.id);
        assert!(core.mempool().contains(&tx.id));
        assert_eq!(
            core.submit_transaction(tx.clone()),
            Err(MagistrateError::Mempool(MempoolError::DuplicateTransaction(tx.id.clone())))
        );

        let rival = signed(&core, TransactionBuilder::business_registration(business("B")), 1);
        match core.submit_transaction(rival) {
            Err(MagistrateError::Pool(err @ PoolError::Pending { .. })) => assert_eq!(err.code(), "ERR_PENDING"),
            other => panic!("expected a pending conflict, got {:?}", other),
        }
        println!("OK: pool admits one business registration per sender");
    }

    #[test]
    fn test_submit_rejects_unsigned_and_garbage() {
        let (core, key) = funded_core(ConfigManager::default());
        let unsigned = TransactionBuilder::business_registration(business("A"))
            .sender_public_key(key)
            .build(core.registry())
            .unwrap();
        assert!(matches!(core.submit_transaction(unsigned), Err(MagistrateError::Schema(_))));
        assert!(core.submit_bytes(&[0xff, 0x02]).is_err());
        assert!(core.mempool().is_empty());
    }

    #[test]
    fn test_submit_checks_committed_state() {
        let (core, _) = funded_core(ConfigManager::default());
        let update = signed(
            &core,
            TransactionBuilder::business_update(BusinessUpdateAsset {
                website: Some("http://www.other.com".to_string()),
                ..Default::default()
            }),
            1,
        );
        assert_eq!(
            core.submit_transaction(update),
            Err(MagistrateError::Handler(HandlerError::BusinessIsNotRegistered))
        );
    }

    #[test]
    fn test_entity_requires_activation() {
        let config = NetworkConfig {
            milestones: vec![Milestone {
                aip36: false,
                ..Milestone::default()
            }],
            ..NetworkConfig::default()
        };
        let (core, _) = funded_core(ConfigManager::new(config).unwrap());
        let tx = signed(
            &core,
            TransactionBuilder::entity(EntityAsset {
                entity_type: EntityType::Plugin,
                sub_type: EntitySubType::None,
                action: EntityAction::Register,
                registration_id: None,
                data: EntityData {
                    name: Some("plugin".to_string()),
                    ipfs_data: None,
                },
            }),
            1,
        );
        assert_eq!(
            core.submit_transaction(tx.clone()),
            Err(MagistrateError::Registry(RegistryError::NotActivated(tx.internal_type())))
        );
    }

    #[test]
    fn test_apply_and_revert() {
        let (mut core, key) = funded_core(ConfigManager::default());
        let before = core.wallets().get(&key).cloned().unwrap();
        let tx = signed(&core, TransactionBuilder::business_registration(business("A")), 1);
        core.submit_transaction(tx.clone()).unwrap();

        core.apply_transaction(&tx).unwrap();
        assert!(core.mempool().is_empty());
        assert_eq!(core.history().len(), 1);
        assert_eq!(core.events().names(), vec!["business.registered"]);
        let wallet = core.wallets().get(&key).unwrap();
        assert_eq!(wallet.nonce, 1);
        assert_eq!(wallet.balance, FUNDS - tx.fee());
        assert!(wallet.has_business());

        assert_eq!(
            core.apply_transaction(&tx),
            Err(MagistrateError::History(HistoryError::Duplicate(tx.id.clone())))
        );

        core.revert_transaction(&tx).unwrap();
        assert_eq!(core.wallets().get(&key), Some(&before));
        assert!(core.history().is_empty());
        assert_eq!(
            core.revert_transaction(&tx),
            Err(MagistrateError::History(HistoryError::NotRecorded(tx.id.clone())))
        );
    }

    #[test]
    fn test_submit_race_admits_one_registration_per_sender() {
        let (core, _) = funded_core(ConfigManager::default());
        let rivals: Vec<Transaction> = (0..8)
            .map(|i| signed(&core, TransactionBuilder::business_registration(business(&format!("rival{}", i))), 1))
            .collect();
        let barrier = Barrier::new(rivals.len());

        let admitted = std::thread::scope(|scope| {
            let handles: Vec<_> = rivals
                .iter()
                .map(|tx| {
                    let (core, barrier) = (&core, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        core.submit_transaction(tx.clone())
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|result| result.is_ok())
                .count()
        });
        assert_eq!(admitted, 1);
        assert_eq!(core.mempool().len(), 1);
        println!("OK: concurrent submissions admit a single business registration");
    }

    #[test]
    fn test_apply_validates_schema() {
        let (mut core, key) = funded_core(ConfigManager::default());
        let register = signed(
            &core,
            TransactionBuilder::entity(EntityAsset {
                entity_type: EntityType::Plugin,
                sub_type: EntitySubType::None,
                action: EntityAction::Register,
                registration_id: None,
                data: EntityData {
                    name: Some("plugin".to_string()),
                    ipfs_data: None,
                },
            }),
            1,
        );
        core.apply_transaction(&register).unwrap();

        let rename = signed(
            &core,
            TransactionBuilder::entity(EntityAsset {
                entity_type: EntityType::Plugin,
                sub_type: EntitySubType::None,
                action: EntityAction::Update,
                registration_id: Some(register.id.clone()),
                data: EntityData {
                    name: Some("renamed".to_string()),
                    ipfs_data: None,
                },
            }),
            2,
        );
        assert!(matches!(core.apply_transaction(&rename), Err(MagistrateError::Schema(_))));
        let wallet = core.wallets().get(&key).unwrap();
        assert_eq!(wallet.entity(&register.id).unwrap().data.name.as_deref(), Some("plugin"));
        assert_eq!(wallet.nonce, 1);

        let business_tx = signed(&core, TransactionBuilder::business_registration(business("A")), 2);
        core.apply_transaction(&business_tx).unwrap();
        let no_core_api = signed(
            &core,
            TransactionBuilder::bridgechain_registration(BridgechainRegistrationAsset {
                name: "chain".to_string(),
                seed_nodes: vec!["74.125.224.71".to_string()],
                genesis_hash: "7e".repeat(32),
                bridgechain_repository: "http://www.repository.com/myorg/myrepo".to_string(),
                bridgechain_asset_repository: None,
                ports: [("custom-port".to_string(), 4003)].into_iter().collect(),
            }),
            3,
        );
        assert!(matches!(core.apply_transaction(&no_core_api), Err(MagistrateError::Schema(_))));
        assert!(core.wallets().get(&key).unwrap().bridgechain(&"7e".repeat(32)).is_none());
        assert_eq!(core.history().len(), 2);
    }

    #[test]
    fn test_apply_recomputes_the_id() {
        let (mut core, _) = funded_core(ConfigManager::default());
        let mut tx = signed(&core, TransactionBuilder::business_registration(business("A")), 1);
        let real_id = tx.id.clone();
        tx.id = "00".repeat(32);
        core.apply_transaction(&tx).unwrap();
        assert!(core.history().contains(&real_id));
        assert!(!core.history().contains(&tx.id));
    }

    #[test]
    fn test_failed_apply_leaves_wallets_untouched() {
        let (mut core, key) = funded_core(ConfigManager::default());
        let before = core.wallets().snapshot();
        let wrong_nonce = signed(&core, TransactionBuilder::business_registration(business("A")), 5);
        assert_eq!(
            core.apply_transaction(&wrong_nonce),
            Err(MagistrateError::Handler(HandlerError::UnexpectedNonce { expected: 1, got: 5 }))
        );
        assert_eq!(core.wallets().snapshot(), before);
        assert!(core.history().is_empty());
        assert!(core.events().events().is_empty());
        assert!(core.wallets().get(&key).is_some());
    }

    #[test]
    fn test_bootstrap_rebuilds_attributes() {
        let (mut core, key) = funded_core(ConfigManager::default());
        let tx = signed(&core, TransactionBuilder::business_registration(business("A")), 1);
        core.apply_transaction(&tx).unwrap();
        let live = core.wallets().snapshot();

        core.wallets_mut().reset_attributes();
        assert!(!core.wallets().get(&key).unwrap().has_business());
        assert_eq!(core.bootstrap().unwrap(), 1);
        assert_eq!(core.wallets().snapshot(), live);
    }
}
