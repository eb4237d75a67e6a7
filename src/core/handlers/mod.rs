//! Per-type transaction handlers: the state machine that checks, applies and reverts magistrate
//! transactions against wallet state.
//!
//! A handler never re-validates inside `apply_to_sender`. The caller runs
//! [`TransactionHandler::throw_if_cannot_be_applied`] first and only applies on success.
//!
//! # Invariants
//! - `revert(tx)` after `apply(tx)` restores the wallet exactly, provided transactions of one sender
//!   are reverted in strict reverse nonce order.
//! - `bootstrap` over the committed history yields the same attributes as applying each
//!   transaction live.

pub mod base;
pub mod bridgechain_registration;
pub mod bridgechain_resignation;
pub mod bridgechain_update;
pub mod business_registration;
pub mod business_resignation;
pub mod business_update;
pub mod entity;
mod errors;
pub mod indexes;
pub(crate) mod magistrate;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

use tracing::debug;

use crate::config::{ConfigManager, Milestone};
use crate::core::asset::{MagistrateTransactionType, MAGISTRATE_TYPE_GROUP};
use crate::core::events::EventDispatcher;
use crate::core::history::{HistoryQuery, TransactionHistory};
use crate::core::mempool::PoolQuery;
use crate::core::registry::InternalTransactionType;
use crate::core::state::{Indexer, Wallet, WalletRepository};
use crate::core::transaction::Transaction;

pub use bridgechain_registration::BridgechainRegistrationHandler;
pub use bridgechain_resignation::BridgechainResignationHandler;
pub use bridgechain_update::BridgechainUpdateHandler;
pub use business_registration::BusinessRegistrationHandler;
pub use business_resignation::BusinessResignationHandler;
pub use business_update::BusinessUpdateHandler;
pub use entity::{DelegateEntityHook, EntityHandler, EntityRegistrationHook};
pub use errors::{HandlerError, PoolError};
pub use registry::HandlerRegistry;

/// Handlers are addressed by the transaction type they handle.
pub type HandlerType = InternalTransactionType;

/// Read-only collaborators a handler consults.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub config: &'a ConfigManager,
    pub history: &'a dyn TransactionHistory,
}

impl<'a> Environment<'a> {
    pub fn new(config: &'a ConfigManager, history: &'a dyn TransactionHistory) -> Self {
        Self { config, history }
    }
}

pub trait TransactionHandler: Send + Sync + fmt::Debug {
    fn transaction_type(&self) -> MagistrateTransactionType;

    fn handler_type(&self) -> HandlerType {
        InternalTransactionType::new(MAGISTRATE_TYPE_GROUP, self.transaction_type().as_u16())
    }

    fn key(&self) -> &'static str {
        self.transaction_type().key()
    }

    /// Handlers that must be registered before this one.
    fn dependencies(&self) -> &'static [HandlerType] {
        &[]
    }

    /// Secondary wallet indexes this handler maintains.
    fn wallet_indexes(&self) -> Vec<(&'static str, Indexer)> {
        Vec::new()
    }

    fn is_activated(&self, _milestone: &Milestone) -> bool {
        true
    }

    /// Read-only precondition check.
    fn throw_if_cannot_be_applied(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        sender: &Wallet,
        wallets: &dyn WalletRepository,
    ) -> Result<(), HandlerError>;

    /// Attribute mutation shared by live application and bootstrap. Balance and nonce are not touched.
    fn apply_attributes(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError>;

    /// Exact inverse of [`TransactionHandler::apply_attributes`] for the same transaction.
    fn revert_attributes(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError>;

    fn apply_to_sender(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        base::apply_to_sender(tx, wallets)?;
        self.apply_attributes(env, tx, wallets)?;
        wallets.reindex(tx.sender_public_key());
        Ok(())
    }

    fn revert_for_sender(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        base::revert_for_sender(tx, wallets)?;
        self.revert_attributes(env, tx, wallets)?;
        wallets.reindex(tx.sender_public_key());
        Ok(())
    }

    /// None of the magistrate types move funds to a third party.
    fn apply_to_recipient(
        &self,
        _env: &Environment<'_>,
        _tx: &Transaction,
        _wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    fn revert_for_recipient(
        &self,
        _env: &Environment<'_>,
        _tx: &Transaction,
        _wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    fn apply(&self, env: &Environment<'_>, tx: &Transaction, wallets: &mut dyn WalletRepository) -> Result<(), HandlerError> {
        self.apply_to_sender(env, tx, wallets)?;
        self.apply_to_recipient(env, tx, wallets)?;
        debug!(transaction_id = %tx.id, sender = tx.sender_public_key(), key = self.key(), "Applied transaction");
        Ok(())
    }

    fn revert(&self, env: &Environment<'_>, tx: &Transaction, wallets: &mut dyn WalletRepository) -> Result<(), HandlerError> {
        self.revert_for_sender(env, tx, wallets)?;
        self.revert_for_recipient(env, tx, wallets)?;
        debug!(transaction_id = %tx.id, sender = tx.sender_public_key(), key = self.key(), "Reverted transaction");
        Ok(())
    }

    /// Replays every committed transaction of this type, in commit order, onto wallet attributes.
    /// Returns the number of rows replayed.
    fn bootstrap(&self, env: &Environment<'_>, wallets: &mut dyn WalletRepository) -> Result<usize, HandlerError> {
        let rows = env.history.read(&HistoryQuery::of_type(self.handler_type()))?;
        for tx in &rows {
            self.apply_attributes(env, tx, wallets)?;
            wallets.reindex(tx.sender_public_key());
        }
        Ok(rows.len())
    }

    fn emit_events(&self, _tx: &Transaction, _dispatcher: &mut dyn EventDispatcher) {}

    /// Rejects transactions that conflict with one already pending.
    fn throw_if_cannot_enter_pool(&self, _tx: &Transaction, _pool: &dyn PoolQuery) -> Result<(), PoolError> {
        Ok(())
    }

    fn can_enter_transaction_pool(&self, tx: &Transaction, pool: &dyn PoolQuery) -> bool {
        self.throw_if_cannot_enter_pool(tx, pool).is_ok()
    }
}
