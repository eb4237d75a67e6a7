use crate::core::asset::MagistrateTransactionType;
use crate::core::events::{EventDispatcher, MagistrateEvent};
use crate::core::handlers::indexes::{self, BRIDGECHAINS};
use crate::core::handlers::registry::BRIDGECHAIN_REGISTRATION;
use crate::core::handlers::{magistrate, Environment, HandlerError, HandlerType, PoolError, TransactionHandler};
use crate::core::mempool::PoolQuery;
use crate::core::state::{Wallet, WalletRepository};
use crate::core::transaction::Transaction;

/// Latches `resigned` on one bridgechain of the sender, addressed by genesis hash.
#[derive(Debug, Default, Clone, Copy)]
pub struct BridgechainResignationHandler;

impl BridgechainResignationHandler {
    fn set_resigned(tx: &Transaction, wallets: &mut dyn WalletRepository, resigned: bool) -> Result<(), HandlerError> {
        let genesis_hash = &tx
            .asset()
            .as_bridgechain_resignation()
            .ok_or_else(|| HandlerError::invariant("bridgechain resignation without its asset"))?
            .bridgechain_id;
        let bridgechain = wallets
            .find_by_public_key(tx.sender_public_key())
            .business_mut()
            .and_then(|business| business.bridgechains.get_mut(genesis_hash))
            .ok_or_else(|| HandlerError::invariant(format!("bridgechain {} is not registered", genesis_hash)))?;
        bridgechain.resigned = resigned;
        Ok(())
    }
}

impl TransactionHandler for BridgechainResignationHandler {
    fn transaction_type(&self) -> MagistrateTransactionType {
        MagistrateTransactionType::BridgechainResignation
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
            let genesis_hash = &tx
                .asset()
                .as_bridgechain_resignation()
                .ok_or_else(|| HandlerError::invariant("bridgechain resignation without its asset"))?
                .bridgechain_id;
            let business = sender.business().ok_or(HandlerError::WalletIsNotBusiness)?;
            if business.resigned {
                return Err(HandlerError::BusinessIsResigned);
            }

            match business.bridgechains.get(genesis_hash) {
                None if indexes::find_indexed(wallets, BRIDGECHAINS, genesis_hash)?.is_some() => {
                    Err(HandlerError::BridgechainIsNotRegisteredByWallet)
                }
                None => Err(HandlerError::BridgechainIsNotRegistered),
                Some(bridgechain) if bridgechain.resigned => Err(HandlerError::BridgechainIsResigned),
                Some(_) => Ok(()),
            }
        })
    }

    fn apply_attributes(
        &self,
        _env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        Self::set_resigned(tx, wallets, true)
    }

    fn revert_attributes(
        &self,
        _env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        Self::set_resigned(tx, wallets, false)
    }

    fn emit_events(&self, tx: &Transaction, dispatcher: &mut dyn EventDispatcher) {
        dispatcher.dispatch(MagistrateEvent::BridgechainResigned, &tx.data);
    }

    fn throw_if_cannot_enter_pool(&self, tx: &Transaction, pool: &dyn PoolQuery) -> Result<(), PoolError> {
        let Some(asset) = tx.asset().as_bridgechain_resignation() else {
            return Ok(());
        };
        magistrate::reject_pending(
            tx,
            magistrate::pending_of_kind(tx, pool)?,
            |other| {
                other
                    .asset()
                    .as_bridgechain_resignation()
                    .is_some_and(|pending| pending.bridgechain_id == asset.bridgechain_id)
            },
            || format!("Bridgechain resignation for bridgechainId \"{}\" already in the pool", asset.bridgechain_id),
        )
    }
}
