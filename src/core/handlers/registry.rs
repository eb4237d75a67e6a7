//! Handler lookup by transaction type, with dependency and activation checks.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Milestone;
use crate::core::asset::MAGISTRATE_TYPE_GROUP;
use crate::core::handlers::{
    BridgechainRegistrationHandler, BridgechainResignationHandler, BridgechainUpdateHandler,
    BusinessRegistrationHandler, BusinessResignationHandler, BusinessUpdateHandler, EntityHandler, Environment,
    HandlerError, HandlerType, TransactionHandler,
};
use crate::core::registry::{InternalTransactionType, RegistryError};
use crate::core::state::{StateError, WalletRepository};

pub const BUSINESS_REGISTRATION: HandlerType = InternalTransactionType::new(MAGISTRATE_TYPE_GROUP, 0);
pub const BUSINESS_RESIGNATION: HandlerType = InternalTransactionType::new(MAGISTRATE_TYPE_GROUP, 1);
pub const BUSINESS_UPDATE: HandlerType = InternalTransactionType::new(MAGISTRATE_TYPE_GROUP, 2);
pub const BRIDGECHAIN_REGISTRATION: HandlerType = InternalTransactionType::new(MAGISTRATE_TYPE_GROUP, 3);
pub const BRIDGECHAIN_RESIGNATION: HandlerType = InternalTransactionType::new(MAGISTRATE_TYPE_GROUP, 4);
pub const BRIDGECHAIN_UPDATE: HandlerType = InternalTransactionType::new(MAGISTRATE_TYPE_GROUP, 5);
pub const ENTITY: HandlerType = InternalTransactionType::new(MAGISTRATE_TYPE_GROUP, 6);

#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<HandlerType, Arc<dyn TransactionHandler>>,
    /// Registration order; bootstrap replays in it so dependencies come first.
    order: Vec<HandlerType>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the seven magistrate handlers.
    pub fn with_magistrate_handlers() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(Arc::new(BusinessRegistrationHandler))?;
        registry.register(Arc::new(BusinessResignationHandler))?;
        registry.register(Arc::new(BusinessUpdateHandler))?;
        registry.register(Arc::new(BridgechainRegistrationHandler))?;
        registry.register(Arc::new(BridgechainResignationHandler))?;
        registry.register(Arc::new(BridgechainUpdateHandler))?;
        registry.register(Arc::new(EntityHandler::new()))?;
        Ok(registry)
    }

    pub fn register(&mut self, handler: Arc<dyn TransactionHandler>) -> Result<(), RegistryError> {
        let handler_type = handler.handler_type();
        if self.handlers.contains_key(&handler_type) {
            return Err(RegistryError::DuplicateHandler(handler_type));
        }
        if let Some(missing) = handler.dependencies().iter().find(|d| !self.handlers.contains_key(*d)) {
            return Err(RegistryError::MissingDependency {
                handler: handler_type,
                dependency: *missing,
            });
        }

        debug!(handler = %handler_type, key = handler.key(), "Registered handler");
        self.handlers.insert(handler_type, handler);
        self.order.push(handler_type);
        Ok(())
    }

    pub fn get(&self, handler_type: HandlerType) -> Result<Arc<dyn TransactionHandler>, RegistryError> {
        self.handlers
            .get(&handler_type)
            .cloned()
            .ok_or(RegistryError::UnknownType(handler_type))
    }

    pub fn get_activated_handler(
        &self,
        handler_type: HandlerType,
        milestone: &Milestone,
    ) -> Result<Arc<dyn TransactionHandler>, RegistryError> {
        let handler = self.get(handler_type)?;
        if !handler.is_activated(milestone) {
            return Err(RegistryError::NotActivated(handler_type));
        }
        Ok(handler)
    }

    /// Handlers in registration order.
    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn TransactionHandler>> {
        self.order.iter().filter_map(|t| self.handlers.get(t))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registers every handler's wallet indexes. Indexes already present are left alone.
    pub fn register_wallet_indexes(&self, wallets: &mut dyn WalletRepository) -> Result<(), StateError> {
        for handler in self.handlers() {
            for (name, indexer) in handler.wallet_indexes() {
                if !wallets.has_index(name) {
                    wallets.register_index(name, indexer)?;
                }
            }
        }
        Ok(())
    }

    /// Replays committed history through every handler active at `env`'s milestone.
    pub fn bootstrap(&self, env: &Environment<'_>, wallets: &mut dyn WalletRepository) -> Result<usize, HandlerError> {
        let milestone = env.config.milestone();
        let mut replayed = 0;
        for handler in self.handlers().filter(|h| h.is_activated(milestone)) {
            let rows = handler.bootstrap(env, wallets)?;
            debug!(key = handler.key(), rows, "Bootstrapped handler");
            replayed += rows;
        }
        info!(replayed, height = env.config.height(), "Bootstrap complete");
        Ok(replayed)
    }
}
