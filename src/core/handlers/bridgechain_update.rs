use crate::core::asset::{BridgechainUpdateAsset, MagistrateTransactionType};
use crate::core::events::{EventDispatcher, MagistrateEvent};
use crate::core::handlers::bridgechain_registration::check_port_keys;
use crate::core::handlers::indexes::{self, BUSINESSES};
use crate::core::handlers::registry::BRIDGECHAIN_REGISTRATION;
use crate::core::handlers::{magistrate, Environment, HandlerError, HandlerType, PoolError, TransactionHandler};
use crate::core::history::HistoryQuery;
use crate::core::mempool::PoolQuery;
use crate::core::state::{Wallet, WalletRepository};
use crate::core::transaction::Transaction;

/// Merges present fields into one bridgechain, addressed by its numeric id.
#[derive(Debug, Default, Clone, Copy)]
pub struct BridgechainUpdateHandler;

fn update_asset(tx: &Transaction) -> Result<&BridgechainUpdateAsset, HandlerError> {
    tx.asset()
        .as_bridgechain_update()
        .ok_or_else(|| HandlerError::invariant("bridgechain update without its asset"))
}

impl TransactionHandler for BridgechainUpdateHandler {
    fn transaction_type(&self) -> MagistrateTransactionType {
        MagistrateTransactionType::BridgechainUpdate
    }

    fn dependencies(&self) -> &'static [HandlerType] {
        &[BRIDGECHAIN_REGISTRATION]
    }

    fn throw_if_cannot_be_applied(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        sender: &Wallet,
        wallets: &dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        magistrate::throw_if_cannot_be_applied(env, tx, sender, || {
            let update = update_asset(tx)?;
            let business = sender.business().ok_or(HandlerError::BusinessIsNotRegistered)?;
            if business.resigned {
                return Err(HandlerError::BusinessIsResigned);
            }

            match business.bridgechain_by_id(update.bridgechain_id) {
                None => {
                    let elsewhere = indexes::indexed(wallets, BUSINESSES)?
                        .iter()
                        .filter_map(|wallet| wallet.business())
                        .any(|other| other.bridgechain_by_id(update.bridgechain_id).is_some());
                    return Err(if elsewhere {
                        HandlerError::BridgechainIsNotRegisteredByWallet
                    } else {
                        HandlerError::BridgechainIsNotRegistered
                    });
                }
                Some((_, bridgechain)) if bridgechain.resigned => return Err(HandlerError::BridgechainIsResigned),
                Some(_) => {}
            }

            match &update.ports {
                Some(ports) => check_port_keys(ports.keys()),
                None => Ok(()),
            }
        })
    }

    fn apply_attributes(
        &self,
        _env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        let update = update_asset(tx)?;
        wallets
            .find_by_public_key(tx.sender_public_key())
            .business_mut()
            .and_then(|business| business.bridgechain_by_id_mut(update.bridgechain_id))
            .ok_or_else(|| HandlerError::invariant(format!("bridgechain {} is not registered", update.bridgechain_id)))?
            .bridgechain_asset
            .merge(update);
        Ok(())
    }

    /// Replays the bridgechain's registration and every earlier update of the same bridgechain.
    fn revert_attributes(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        let update = update_asset(tx)?;
        let genesis_hash = wallets
            .find_by_public_key(tx.sender_public_key())
            .business()
            .and_then(|business| business.bridgechain_by_id(update.bridgechain_id))
            .map(|(genesis_hash, _)| genesis_hash.clone())
            .ok_or_else(|| HandlerError::invariant(format!("bridgechain {} is not registered", update.bridgechain_id)))?;

        let mut asset = magistrate::rows_before(env, HistoryQuery::of_type(BRIDGECHAIN_REGISTRATION), tx)?
            .iter()
            .rev()
            .filter_map(|row| row.asset().as_bridgechain_registration())
            .find(|registration| registration.genesis_hash == genesis_hash)
            .cloned()
            .ok_or_else(|| HandlerError::invariant(format!("no registration of bridgechain {} in history", genesis_hash)))?;
        for row in magistrate::rows_before(env, HistoryQuery::of_type(self.handler_type()), tx)? {
            if let Some(prior) = row.asset().as_bridgechain_update() {
                if prior.bridgechain_id == update.bridgechain_id {
                    asset.merge(prior);
                }
            }
        }

        wallets
            .find_by_public_key(tx.sender_public_key())
            .business_mut()
            .and_then(|business| business.bridgechains.get_mut(&genesis_hash))
            .ok_or_else(|| HandlerError::invariant(format!("bridgechain {} is not registered", genesis_hash)))?
            .bridgechain_asset = asset;
        Ok(())
    }

    fn emit_events(&self, tx: &Transaction, dispatcher: &mut dyn EventDispatcher) {
        dispatcher.dispatch(MagistrateEvent::BridgechainUpdated, &tx.data);
    }

    fn throw_if_cannot_enter_pool(&self, tx: &Transaction, pool: &dyn PoolQuery) -> Result<(), PoolError> {
        let Some(update) = tx.asset().as_bridgechain_update() else {
            return Ok(());
        };
        magistrate::reject_pending(
            tx,
            magistrate::pending_of_kind(tx, pool)?,
            |other| {
                other
                    .asset()
                    .as_bridgechain_update()
                    .is_some_and(|pending| pending.bridgechain_id == update.bridgechain_id)
            },
            || format!("Bridgechain update for bridgechainId \"{}\" already in the pool", update.bridgechain_id),
        )
    }
}
