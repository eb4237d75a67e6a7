//! Checks and effects every transaction shares: sender identity, network, signature, nonce and
//! fee payment.

use crate::core::handlers::{Environment, HandlerError};
use crate::core::state::{Wallet, WalletRepository};
use crate::core::transaction::Transaction;

pub fn throw_if_cannot_be_applied(env: &Environment<'_>, tx: &Transaction, sender: &Wallet) -> Result<(), HandlerError> {
    if tx.sender_public_key() != sender.public_key() {
        return Err(HandlerError::SenderPublicKeyMismatch);
    }

    let network = env.config.network();
    if tx.data.network != network {
        return Err(HandlerError::UnexpectedNetwork {
            expected: network,
            got: tx.data.network,
        });
    }

    if tx.data.signature.is_some() && !tx.verify().unwrap_or(false) {
        return Err(HandlerError::InvalidSignature);
    }

    let expected = sender.nonce.saturating_add(1);
    if tx.nonce() != expected {
        return Err(HandlerError::UnexpectedNonce {
            expected,
            got: tx.nonce(),
        });
    }

    let required = tx.fee().saturating_add(tx.data.amount);
    if sender.balance < required {
        return Err(HandlerError::InsufficientBalance {
            required,
            available: sender.balance,
        });
    }
    Ok(())
}

/// Charges the fee and advances the nonce.
pub fn apply_to_sender(tx: &Transaction, wallets: &mut dyn WalletRepository) -> Result<(), HandlerError> {
    let wallet = wallets.find_by_public_key(tx.sender_public_key());
    wallet.balance = wallet
        .balance
        .checked_sub(tx.fee())
        .ok_or_else(|| HandlerError::invariant(format!("balance of {} cannot cover fee {}", tx.sender_public_key(), tx.fee())))?;
    wallet.nonce = tx.nonce();
    Ok(())
}

/// Refunds the fee and rewinds the nonce. The transaction must be the sender's latest.
pub fn revert_for_sender(tx: &Transaction, wallets: &mut dyn WalletRepository) -> Result<(), HandlerError> {
    let wallet = wallets.find_by_public_key(tx.sender_public_key());
    if wallet.nonce != tx.nonce() {
        return Err(HandlerError::RevertOrderViolation {
            wallet: wallet.nonce,
            transaction: tx.nonce(),
        });
    }
    wallet.nonce = tx
        .nonce()
        .checked_sub(1)
        .ok_or_else(|| HandlerError::invariant("cannot revert a transaction with nonce 0"))?;
    wallet.balance = wallet
        .balance
        .checked_add(tx.fee())
        .ok_or_else(|| HandlerError::invariant("balance overflow on fee refund"))?;
    Ok(())
}
