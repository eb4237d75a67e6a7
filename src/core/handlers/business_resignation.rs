use crate::core::asset::MagistrateTransactionType;
use crate::core::events::{EventDispatcher, MagistrateEvent};
use crate::core::handlers::registry::BUSINESS_REGISTRATION;
use crate::core::handlers::{magistrate, Environment, HandlerError, HandlerType, PoolError, TransactionHandler};
use crate::core::mempool::PoolQuery;
use crate::core::state::{Wallet, WalletRepository};
use crate::core::transaction::Transaction;

#[derive(Debug, Default, Clone, Copy)]
pub struct BusinessResignationHandler;

impl BusinessResignationHandler {
    fn set_resigned(tx: &Transaction, wallets: &mut dyn WalletRepository, resigned: bool) -> Result<(), HandlerError> {
        let business = wallets
            .find_by_public_key(tx.sender_public_key())
            .business_mut()
            .ok_or_else(|| HandlerError::invariant("business resignation for a wallet without business"))?;
        business.resigned = resigned;
        Ok(())
    }
}

impl TransactionHandler for BusinessResignationHandler {
    fn transaction_type(&self) -> MagistrateTransactionType {
        MagistrateTransactionType::BusinessResignation
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
            if business.bridgechains.values().any(|bridgechain| !bridgechain.resigned) {
                return Err(HandlerError::BridgechainsAreNotResigned);
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
        dispatcher.dispatch(MagistrateEvent::BusinessResigned, &tx.data);
    }

    fn throw_if_cannot_enter_pool(&self, tx: &Transaction, pool: &dyn PoolQuery) -> Result<(), PoolError> {
        magistrate::reject_pending(
            tx,
            magistrate::pending_of_kind(tx, pool)?,
            |_| true,
            || format!("Business resignation for \"{}\" already in the pool", tx.sender_public_key()),
        )
    }
}
