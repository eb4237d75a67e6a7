use std::fmt;

use crate::core::asset::EntityAsset;
use crate::core::handlers::HandlerError;
use crate::core::state::Wallet;

/// Extra registration rule for one entity type, run after the name uniqueness check.
pub trait EntityRegistrationHook: Send + Sync + fmt::Debug {
    fn check(&self, asset: &EntityAsset, sender: &Wallet) -> Result<(), HandlerError>;
}

/// A delegate entity must be registered by that delegate, under its username.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelegateEntityHook;

impl EntityRegistrationHook for DelegateEntityHook {
    fn check(&self, asset: &EntityAsset, sender: &Wallet) -> Result<(), HandlerError> {
        let delegate = sender.delegate().ok_or(HandlerError::EntitySenderIsNotDelegate)?;
        if asset.data.name.as_deref() != Some(delegate.username.as_str()) {
            return Err(HandlerError::EntityNameDoesNotMatchDelegate);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::{EntityAction, EntityData, EntitySubType, EntityType};

    fn delegate_asset(name: &str) -> EntityAsset {
        EntityAsset {
            entity_type: EntityType::Delegate,
            sub_type: EntitySubType::None,
            action: EntityAction::Register,
            registration_id: None,
            data: EntityData {
                name: Some(name.to_string()),
                ipfs_data: None,
            },
        }
    }

    #[test]
    fn test_delegate_hook() {
        let mut wallet = Wallet::new("02aa");
        let hook = DelegateEntityHook;
        assert_eq!(
            hook.check(&delegate_asset("genesis_1"), &wallet),
            Err(HandlerError::EntitySenderIsNotDelegate)
        );

        wallet.set_delegate("genesis_1");
        assert_eq!(hook.check(&delegate_asset("genesis_1"), &wallet), Ok(()));
        assert_eq!(
            hook.check(&delegate_asset("genesis_2"), &wallet),
            Err(HandlerError::EntityNameDoesNotMatchDelegate)
        );
    }
}
