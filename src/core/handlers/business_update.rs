use crate::core::asset::MagistrateTransactionType;
use crate::core::events::{EventDispatcher, MagistrateEvent};
use crate::core::handlers::registry::BUSINESS_REGISTRATION;
use crate::core::handlers::{magistrate, Environment, HandlerError, HandlerType, PoolError, TransactionHandler};
use crate::core::history::HistoryQuery;
use crate::core::mempool::PoolQuery;
use crate::core::state::{Wallet, WalletRepository};
use crate::core::transaction::Transaction;

/// Merges present fields into the business asset. Reverts rebuild the asset from history, since a
/// merge cannot be undone from its result.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusinessUpdateHandler;

impl TransactionHandler for BusinessUpdateHandler {
    fn transaction_type(&self) -> MagistrateTransactionType {
        MagistrateTransactionType::BusinessUpdate
    }

    fn dependencies(&self) -> &'static [HandlerType] {
        &[BUSINESS_REGISTRATION]
    }

    fn throw_if_cannot_be_applied(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        sender: &Wallet,
        _wallets: &dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        magistrate::throw_if_cannot_be_applied(env, tx, sender, || {
            let business = sender.business().ok_or(HandlerError::BusinessIsNotRegistered)?;
            if business.resigned {
                return Err(HandlerError::BusinessIsResigned);
            }
            Ok(())
        })
    }

    fn apply_attributes(
        &self,
        _env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        let update = tx
            .asset()
            .as_business_update()
            .ok_or_else(|| HandlerError::invariant("business update without its asset"))?;
        wallets
            .find_by_public_key(tx.sender_public_key())
            .business_mut()
            .ok_or_else(|| HandlerError::invariant("business update for a wallet without business"))?
            .business_asset
            .merge(update);
        Ok(())
    }

    fn revert_attributes(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        let registration = magistrate::rows_before(env, HistoryQuery::of_type(BUSINESS_REGISTRATION), tx)?
            .pop()
            .ok_or_else(|| HandlerError::invariant("no business registration in history"))?;
        let mut asset = registration
            .asset()
            .as_business_registration()
            .cloned()
            .ok_or_else(|| HandlerError::invariant("business registration without its asset"))?;
        for row in magistrate::rows_before(env, HistoryQuery::of_type(self.handler_type()), tx)? {
            if let Some(update) = row.asset().as_business_update() {
                asset.merge(update);
            }
        }

        wallets
            .find_by_public_key(tx.sender_public_key())
            .business_mut()
            .ok_or_else(|| HandlerError::invariant("business update revert for a wallet without business"))?
            .business_asset = asset;
        Ok(())
    }

    fn emit_events(&self, tx: &Transaction, dispatcher: &mut dyn EventDispatcher) {
        dispatcher.dispatch(MagistrateEvent::BusinessUpdated, &tx.data);
    }

    fn throw_if_cannot_enter_pool(&self, tx: &Transaction, pool: &dyn PoolQuery) -> Result<(), PoolError> {
        magistrate::reject_pending(
            tx,
            magistrate::pending_of_kind(tx, pool)?,
            |_| true,
            || format!("Business update for \"{}\" already in the pool", tx.sender_public_key()),
        )
    }
}
