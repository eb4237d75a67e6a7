use crate::core::asset::MagistrateTransactionType;
use crate::core::events::{EventDispatcher, MagistrateEvent};
use crate::core::handlers::indexes::{self, BRIDGECHAINS, BUSINESSES};
use crate::core::handlers::registry::BUSINESS_REGISTRATION;
use crate::core::handlers::{magistrate, Environment, HandlerError, HandlerType, PoolError, TransactionHandler};
use crate::core::mempool::PoolQuery;
use crate::core::state::{BridgechainAttributes, Indexer, Wallet, WalletRepository};
use crate::core::transaction::Transaction;
use crate::utils;

/// Adds a bridgechain, keyed by genesis hash, to the sender's business.
///
/// Names are unique across every business, case-insensitively, resigned bridgechains included.
#[derive(Debug, Default, Clone, Copy)]
pub struct BridgechainRegistrationHandler;

/// Rejects the first port key that is not a package name.
pub(crate) fn check_port_keys<'a>(mut keys: impl Iterator<Item = &'a String>) -> Result<(), HandlerError> {
    match keys.find(|key| !utils::is_valid_package_name(key)) {
        Some(key) => Err(HandlerError::PortKeyMustBeValidPackageName(key.clone())),
        None => Ok(()),
    }
}

impl TransactionHandler for BridgechainRegistrationHandler {
    fn transaction_type(&self) -> MagistrateTransactionType {
        MagistrateTransactionType::BridgechainRegistration
    }

    fn dependencies(&self) -> &'static [HandlerType] {
        &[BUSINESS_REGISTRATION]
    }

    fn wallet_indexes(&self) -> Vec<(&'static str, Indexer)> {
        vec![(BRIDGECHAINS, indexes::bridgechain_indexer as Indexer)]
    }

    fn throw_if_cannot_be_applied(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        sender: &Wallet,
        wallets: &dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        magistrate::throw_if_cannot_be_applied(env, tx, sender, || {
            let asset = tx
                .asset()
                .as_bridgechain_registration()
                .ok_or_else(|| HandlerError::invariant("bridgechain registration without its asset"))?;
            let business = sender.business().ok_or(HandlerError::WalletIsNotBusiness)?;
            if business.resigned {
                return Err(HandlerError::BusinessIsResigned);
            }
            if business.bridgechains.contains_key(&asset.genesis_hash) {
                return Err(HandlerError::GenesisHashAlreadyRegistered);
            }

            let name = asset.name.to_lowercase();
            for wallet in indexes::indexed(wallets, BUSINESSES)? {
                let taken = wallet
                    .business()
                    .into_iter()
                    .flat_map(|b| b.bridgechains.values())
                    .any(|bridgechain| bridgechain.bridgechain_asset.name.to_lowercase() == name);
                if taken {
                    return Err(HandlerError::BridgechainAlreadyRegistered);
                }
            }

            check_port_keys(asset.ports.keys())
        })
    }

    fn apply_attributes(
        &self,
        _env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        let asset = tx
            .asset()
            .as_bridgechain_registration()
            .ok_or_else(|| HandlerError::invariant("bridgechain registration without its asset"))?;
        let registered: usize = indexes::indexed(wallets, BUSINESSES)?
            .iter()
            .filter_map(|wallet| wallet.business())
            .map(|business| business.bridgechains.len())
            .sum();

        wallets
            .find_by_public_key(tx.sender_public_key())
            .business_mut()
            .ok_or_else(|| HandlerError::invariant("bridgechain registration for a wallet without business"))?
            .bridgechains
            .insert(
                asset.genesis_hash.clone(),
                BridgechainAttributes {
                    bridgechain_asset: asset.clone(),
                    bridgechain_id: registered as u64 + 1,
                    resigned: false,
                },
            );
        Ok(())
    }

    /// Removes exactly the bridgechain this transaction registered.
    fn revert_attributes(
        &self,
        _env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        let asset = tx
            .asset()
            .as_bridgechain_registration()
            .ok_or_else(|| HandlerError::invariant("bridgechain registration without its asset"))?;
        wallets
            .find_by_public_key(tx.sender_public_key())
            .business_mut()
            .and_then(|business| business.bridgechains.remove(&asset.genesis_hash))
            .ok_or_else(|| HandlerError::invariant(format!("bridgechain {} is not registered", asset.genesis_hash)))?;
        Ok(())
    }

    fn emit_events(&self, tx: &Transaction, dispatcher: &mut dyn EventDispatcher) {
        dispatcher.dispatch(MagistrateEvent::BridgechainRegistered, &tx.data);
    }

    fn throw_if_cannot_enter_pool(&self, tx: &Transaction, pool: &dyn PoolQuery) -> Result<(), PoolError> {
        let Some(asset) = tx.asset().as_bridgechain_registration() else {
            return Ok(());
        };
        let name = asset.name.to_lowercase();
        magistrate::reject_pending(
            tx,
            magistrate::pending_of_type(tx, pool)?,
            |other| {
                other
                    .asset()
                    .as_bridgechain_registration()
                    .is_some_and(|pending| pending.name.to_lowercase() == name)
            },
            || format!("Bridgechain registration for \"{}\" already in the pool", asset.name),
        )
    }
}
