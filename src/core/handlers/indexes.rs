//! Secondary wallet indexes maintained by the magistrate handlers.

use crate::core::handlers::HandlerError;
use crate::core::state::{Wallet, WalletRepository};

/// Wallets holding a business, resigned or not. Keyed by public key.
pub const BUSINESSES: &str = "businesses";

/// Keyed by bridgechain genesis hash. Hashes are unique per wallet only, so a key can have several holders.
pub const BRIDGECHAINS: &str = "bridgechains";

/// Keyed by the id of the registering entity transaction.
pub const ENTITIES: &str = "entities";

pub fn business_indexer(wallet: &Wallet) -> Vec<String> {
    if wallet.has_business() {
        vec![wallet.public_key().to_string()]
    } else {
        Vec::new()
    }
}

pub fn bridgechain_indexer(wallet: &Wallet) -> Vec<String> {
    wallet
        .business()
        .map(|business| business.bridgechains.keys().cloned().collect())
        .unwrap_or_default()
}

pub fn entity_indexer(wallet: &Wallet) -> Vec<String> {
    wallet.entities().keys().cloned().collect()
}

/// Wallets in `index`. A missing index means the handler set was wired incorrectly.
pub(crate) fn indexed<'a>(wallets: &'a dyn WalletRepository, index: &str) -> Result<Vec<&'a Wallet>, HandlerError> {
    wallets
        .get_index(index)
        .map_err(|e| HandlerError::invariant(e.to_string()))
}

pub(crate) fn find_indexed<'a>(
    wallets: &'a dyn WalletRepository,
    index: &str,
    key: &str,
) -> Result<Option<&'a Wallet>, HandlerError> {
    wallets
        .find_by_index(index, key)
        .map_err(|e| HandlerError::invariant(e.to_string()))
}
