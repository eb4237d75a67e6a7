use crate::config::EntityNameScope;
use crate::core::asset::EntityAsset;
use crate::core::handlers::indexes::{self, ENTITIES};
use crate::core::handlers::{Environment, HandlerError};
use crate::core::state::{EntityAttributes, Wallet, WalletRepository};
use crate::core::transaction::Transaction;

/// Whether `existing` and `candidate` share a name under `scope`. Names compare case-insensitively.
pub(super) fn names_collide(scope: EntityNameScope, existing: &EntityAttributes, candidate: &EntityAsset) -> bool {
    let same_name = match (&existing.data.name, &candidate.data.name) {
        (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
        _ => false,
    };
    let same_kind = match scope {
        EntityNameScope::TypeAndSubType => {
            existing.entity_type == candidate.entity_type && existing.sub_type == candidate.sub_type
        }
        EntityNameScope::TypeOnly => existing.entity_type == candidate.entity_type,
    };
    same_name && same_kind
}

/// Resigned entities keep their name.
pub(super) fn check(
    env: &Environment<'_>,
    tx: &Transaction,
    asset: &EntityAsset,
    sender: &Wallet,
    wallets: &dyn WalletRepository,
) -> Result<(), HandlerError> {
    if sender.entity(&tx.id).is_some() {
        return Err(HandlerError::EntityAlreadyRegistered);
    }

    let scope = env.config.options().entity_name_scope;
    for wallet in indexes::indexed(wallets, ENTITIES)? {
        if wallet.entities().values().any(|entity| names_collide(scope, entity, asset)) {
            return Err(HandlerError::EntityNameAlreadyRegistered);
        }
    }
    Ok(())
}

pub(super) fn apply(tx: &Transaction, asset: &EntityAsset, wallets: &mut dyn WalletRepository) {
    wallets.find_by_public_key(tx.sender_public_key()).set_entity(
        tx.id.clone(),
        EntityAttributes {
            entity_type: asset.entity_type,
            sub_type: asset.sub_type,
            data: asset.data.clone(),
            resigned: false,
        },
    );
}

pub(super) fn revert(tx: &Transaction, wallets: &mut dyn WalletRepository) -> Result<(), HandlerError> {
    wallets
        .find_by_public_key(tx.sender_public_key())
        .forget_entity(&tx.id)
        .ok_or_else(|| HandlerError::invariant(format!("entity {} is not registered", tx.id)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::{EntityAction, EntityData, EntitySubType, EntityType};

    fn attributes(name: &str, entity_type: EntityType, sub_type: EntitySubType) -> EntityAttributes {
        EntityAttributes {
            entity_type,
            sub_type,
            data: EntityData {
                name: Some(name.to_string()),
                ipfs_data: None,
            },
            resigned: false,
        }
    }

    fn asset(name: &str, entity_type: EntityType, sub_type: EntitySubType) -> EntityAsset {
        EntityAsset {
            entity_type,
            sub_type,
            action: EntityAction::Register,
            registration_id: None,
            data: EntityData {
                name: Some(name.to_string()),
                ipfs_data: None,
            },
        }
    }

    #[test]
    fn test_names_collide() {
        let existing = attributes("Plugin1", EntityType::Plugin, EntitySubType::PluginCore);
        let same_kind = asset("plugin1", EntityType::Plugin, EntitySubType::PluginCore);
        let other_sub_type = asset("plugin1", EntityType::Plugin, EntitySubType::PluginDesktop);
        let other_type = asset("plugin1", EntityType::Module, EntitySubType::PluginCore);

        assert!(names_collide(EntityNameScope::TypeAndSubType, &existing, &same_kind));
        assert!(!names_collide(EntityNameScope::TypeAndSubType, &existing, &other_sub_type));
        assert!(names_collide(EntityNameScope::TypeOnly, &existing, &other_sub_type));
        assert!(!names_collide(EntityNameScope::TypeOnly, &existing, &other_type));
        assert!(!names_collide(
            EntityNameScope::TypeOnly,
            &existing,
            &asset("plugin2", EntityType::Plugin, EntitySubType::PluginCore)
        ));
    }
}
