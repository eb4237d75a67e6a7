//! The generic entity type: one transaction type whose asset carries a register, update or resign
//! action over the entity taxonomy.
//!
//! Entities are keyed on the wallet by the id of their registering transaction. Type and sub type
//! are fixed at registration; later actions must repeat them. Per-type registration rules plug in
//! through [`EntityRegistrationHook`].

mod hooks;
mod register;
mod resign;
mod update;

use std::collections::BTreeMap;

pub use hooks::{DelegateEntityHook, EntityRegistrationHook};

use crate::config::Milestone;
use crate::core::asset::{EntityAction, EntityAsset, EntityType, MagistrateTransactionType};
use crate::core::handlers::indexes::{self, ENTITIES};
use crate::core::handlers::{magistrate, Environment, HandlerError, PoolError, TransactionHandler};
use crate::core::mempool::PoolQuery;
use crate::core::state::{Indexer, Wallet, WalletRepository};
use crate::core::transaction::Transaction;

/// An entity asset resolved against its action.
#[derive(Debug, Clone, Copy)]
pub enum EntityOperation<'a> {
    Register(&'a EntityAsset),
    Update { registration_id: &'a str, asset: &'a EntityAsset },
    Resign { registration_id: &'a str, asset: &'a EntityAsset },
}

impl<'a> EntityOperation<'a> {
    pub fn of(tx: &'a Transaction) -> Result<Self, HandlerError> {
        let asset = tx
            .asset()
            .as_entity()
            .ok_or_else(|| HandlerError::invariant("entity transaction without its asset"))?;
        let registration_id = || asset.registration_id.as_deref().ok_or(HandlerError::EntityNotRegistered);
        Ok(match asset.action {
            EntityAction::Register => EntityOperation::Register(asset),
            EntityAction::Update => EntityOperation::Update {
                registration_id: registration_id()?,
                asset,
            },
            EntityAction::Resign => EntityOperation::Resign {
                registration_id: registration_id()?,
                asset,
            },
        })
    }
}

/// Update and resign both target a live entity of the same type and sub type.
fn check_registered(sender: &Wallet, registration_id: &str, asset: &EntityAsset) -> Result<(), HandlerError> {
    let entity = sender.entity(registration_id).ok_or(HandlerError::EntityNotRegistered)?;
    if entity.resigned {
        return Err(HandlerError::EntityAlreadyResigned);
    }
    if entity.entity_type != asset.entity_type {
        return Err(HandlerError::EntityWrongType);
    }
    if entity.sub_type != asset.sub_type {
        return Err(HandlerError::EntityWrongSubType);
    }
    Ok(())
}

#[derive(Debug)]
pub struct EntityHandler {
    hooks: BTreeMap<EntityType, Box<dyn EntityRegistrationHook>>,
}

impl Default for EntityHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityHandler {
    /// Handler with the delegate hook installed.
    pub fn new() -> Self {
        Self::without_hooks().with_hook(EntityType::Delegate, DelegateEntityHook)
    }

    pub fn without_hooks() -> Self {
        Self { hooks: BTreeMap::new() }
    }

    /// Installs `hook` for `entity_type`, replacing any previous one.
    pub fn with_hook(mut self, entity_type: EntityType, hook: impl EntityRegistrationHook + 'static) -> Self {
        self.hooks.insert(entity_type, Box::new(hook));
        self
    }
}

impl TransactionHandler for EntityHandler {
    fn transaction_type(&self) -> MagistrateTransactionType {
        MagistrateTransactionType::Entity
    }

    fn wallet_indexes(&self) -> Vec<(&'static str, Indexer)> {
        vec![(ENTITIES, indexes::entity_indexer as Indexer)]
    }

    fn is_activated(&self, milestone: &Milestone) -> bool {
        milestone.aip36
    }

    fn throw_if_cannot_be_applied(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        sender: &Wallet,
        wallets: &dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        magistrate::throw_if_cannot_be_applied(env, tx, sender, || match EntityOperation::of(tx)? {
            EntityOperation::Register(asset) => {
                register::check(env, tx, asset, sender, wallets)?;
                match self.hooks.get(&asset.entity_type) {
                    Some(hook) => hook.check(asset, sender),
                    None => Ok(()),
                }
            }
            EntityOperation::Update { registration_id, asset } | EntityOperation::Resign { registration_id, asset } => {
                check_registered(sender, registration_id, asset)
            }
        })
    }

    fn apply_attributes(
        &self,
        _env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        match EntityOperation::of(tx)? {
            EntityOperation::Register(asset) => {
                register::apply(tx, asset, wallets);
                Ok(())
            }
            EntityOperation::Update { registration_id, asset } => update::apply(tx, registration_id, asset, wallets),
            EntityOperation::Resign { registration_id, .. } => resign::set_resigned(tx, registration_id, wallets, true),
        }
    }

    fn revert_attributes(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        match EntityOperation::of(tx)? {
            EntityOperation::Register(_) => register::revert(tx, wallets),
            EntityOperation::Update { registration_id, .. } => update::revert(env, tx, registration_id, wallets),
            EntityOperation::Resign { registration_id, .. } => {
                resign::set_resigned(tx, registration_id, wallets, false)
            }
        }
    }

    fn throw_if_cannot_enter_pool(&self, tx: &Transaction, pool: &dyn PoolQuery) -> Result<(), PoolError> {
        let Ok(operation) = EntityOperation::of(tx) else {
            return Ok(());
        };
        match operation {
            EntityOperation::Register(asset) => {
                let name = asset.data.name.as_deref().unwrap_or_default().to_lowercase();
                magistrate::reject_pending(
                    tx,
                    magistrate::pending_of_type(tx, pool)?,
                    |other| {
                        other.asset().as_entity().is_some_and(|pending| {
                            pending.action == EntityAction::Register
                                && pending.entity_type == asset.entity_type
                                && pending.data.name.as_deref().is_some_and(|n| n.to_lowercase() == name)
                        })
                    },
                    || format!("Entity registration for \"{}\" ({}) already in the pool", name, asset.entity_type),
                )
            }
            EntityOperation::Update { registration_id, .. } | EntityOperation::Resign { registration_id, .. } => {
                magistrate::reject_pending(
                    tx,
                    magistrate::pending_of_kind(tx, pool)?,
                    |other| {
                        other
                            .asset()
                            .as_entity()
                            .is_some_and(|pending| pending.registration_id.as_deref() == Some(registration_id))
                    },
                    || format!("Entity transaction for registrationId \"{}\" already in the pool", registration_id),
                )
            }
        }
    }
}
