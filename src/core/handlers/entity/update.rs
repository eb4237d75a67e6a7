use crate::core::asset::{EntityAction, EntityAsset};
use crate::core::handlers::{magistrate, Environment, HandlerError};
use crate::core::history::HistoryQuery;
use crate::core::state::{EntityAttributes, WalletRepository};
use crate::core::transaction::Transaction;

pub(super) fn apply(
    tx: &Transaction,
    registration_id: &str,
    asset: &EntityAsset,
    wallets: &mut dyn WalletRepository,
) -> Result<(), HandlerError> {
    wallets
        .find_by_public_key(tx.sender_public_key())
        .entity_mut(registration_id)
        .ok_or_else(|| HandlerError::invariant(format!("entity {} is not registered", registration_id)))?
        .data
        .merge(&asset.data);
    Ok(())
}

/// Rebuilds the entity from its registration and the earlier updates of the same registration id.
pub(super) fn revert(
    env: &Environment<'_>,
    tx: &Transaction,
    registration_id: &str,
    wallets: &mut dyn WalletRepository,
) -> Result<(), HandlerError> {
    let rows = magistrate::rows_before(env, HistoryQuery::of_type(tx.internal_type()), tx)?;
    let registration = rows
        .iter()
        .find(|row| row.id == registration_id)
        .and_then(|row| row.asset().as_entity())
        .ok_or_else(|| HandlerError::invariant(format!("no registration of entity {} in history", registration_id)))?;

    let mut entity = EntityAttributes {
        entity_type: registration.entity_type,
        sub_type: registration.sub_type,
        data: registration.data.clone(),
        resigned: false,
    };
    let updates = rows
        .iter()
        .filter_map(|row| row.asset().as_entity())
        .filter(|prior| prior.action == EntityAction::Update)
        .filter(|prior| prior.registration_id.as_deref() == Some(registration_id));
    for prior in updates {
        entity.data.merge(&prior.data);
    }

    wallets
        .find_by_public_key(tx.sender_public_key())
        .set_entity(registration_id, entity);
    Ok(())
}
