use crate::core::handlers::HandlerError;
use crate::core::state::WalletRepository;
use crate::core::transaction::Transaction;

pub(super) fn set_resigned(
    tx: &Transaction,
    registration_id: &str,
    wallets: &mut dyn WalletRepository,
    resigned: bool,
) -> Result<(), HandlerError> {
    wallets
        .find_by_public_key(tx.sender_public_key())
        .entity_mut(registration_id)
        .ok_or_else(|| HandlerError::invariant(format!("entity {} is not registered", registration_id)))?
        .resigned = resigned;
    Ok(())
}
