//! Mempool (transaction pool): pending transactions that passed admission but are not applied yet.
//!
//! # Fairness and determinism
//!
//! **`arrival_index`:** A monotonic, node-local counter incremented on each successful `add_transaction()`.
//! It is not derived from system time and is not part of the transaction id, signature or wallet state.
//! Pending transactions are returned sorted by `(arrival_index, id)`, so the same pool contents always
//! yield the same order.
//!
//! # Invariants
//! - Storage is keyed by transaction id; a second transaction with the same id is rejected.
//! - `arrival_index` is never exposed outside this module.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::core::transaction::Transaction;
use crate::error::MagistrateError;

/// Internal mempool entry: transaction and its logical arrival order.
#[derive(Debug, Clone)]
struct MempoolEntry {
    tx: Transaction,
    arrival_index: u64,
}

/// Errors produced by the mempool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("Duplicate transaction: transaction with id {0} already exists")]
    DuplicateTransaction(String),

    #[error("Mempool lock poisoned")]
    Poisoned,
}

impl From<MempoolError> for MagistrateError {
    fn from(err: MempoolError) -> Self {
        MagistrateError::Mempool(err)
    }
}

/// Read access to pending transactions, as consumed by pool admission checks.
pub trait PoolQuery {
    /// Every pending transaction in arrival order.
    fn pending(&self) -> Result<Vec<Transaction>, MempoolError>;

    fn pending_by_sender(&self, public_key: &str) -> Result<Vec<Transaction>, MempoolError> {
        Ok(self
            .pending()?
            .into_iter()
            .filter(|tx| tx.sender_public_key() == public_key)
            .collect())
    }
}

#[derive(Debug, Default)]
struct PoolInner {
    transactions: HashMap<String, MempoolEntry>,
    next_arrival_index: u64,
}

impl PoolInner {
    fn insert(&mut self, tx: Transaction) -> Result<(), MempoolError> {
        if self.transactions.contains_key(&tx.id) {
            return Err(MempoolError::DuplicateTransaction(tx.id));
        }

        let arrival_index = self.next_arrival_index;
        self.next_arrival_index = arrival_index.saturating_add(1);
        self.transactions
            .insert(tx.id.clone(), MempoolEntry { tx, arrival_index });
        Ok(())
    }

    /// Sorted by (arrival_index, id).
    fn sorted(&self) -> Vec<Transaction> {
        let mut entries: Vec<&MempoolEntry> = self.transactions.values().collect();
        entries.sort_by(|a, b| (a.arrival_index, a.tx.id.as_str()).cmp(&(b.arrival_index, b.tx.id.as_str())));
        entries.into_iter().map(|e| e.tx.clone()).collect()
    }
}

impl PoolQuery for PoolInner {
    fn pending(&self) -> Result<Vec<Transaction>, MempoolError> {
        Ok(self.sorted())
    }
}

/// Thread-safe pool of pending transactions.
#[derive(Debug, Default)]
pub struct Mempool {
    inner: RwLock<PoolInner>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transaction. Errors if a transaction with the same id is already pending.
    pub fn add_transaction(&self, tx: Transaction) -> Result<(), MempoolError> {
        let mut inner = self.inner.write().map_err(|_| MempoolError::Poisoned)?;
        inner.insert(tx)
    }

    /// Adds `tx` only if `admit` accepts it against the pending set.
    ///
    /// `admit` sees the pool under the same write guard as the insert, so two admissions can never
    /// both pass against a pool that holds neither of them.
    pub fn add_if<E, F>(&self, tx: Transaction, admit: F) -> Result<(), E>
    where
        E: From<MempoolError>,
        F: FnOnce(&Transaction, &dyn PoolQuery) -> Result<(), E>,
    {
        let mut inner = self.inner.write().map_err(|_| MempoolError::Poisoned)?;
        admit(&tx, &*inner)?;
        Ok(inner.insert(tx)?)
    }

    pub fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, MempoolError> {
        let inner = self.inner.read().map_err(|_| MempoolError::Poisoned)?;
        Ok(inner.transactions.get(id).map(|e| e.tx.clone()))
    }

    /// Removes a transaction by id, typically once it has been applied.
    pub fn remove_transaction(&self, id: &str) -> Result<bool, MempoolError> {
        let mut inner = self.inner.write().map_err(|_| MempoolError::Poisoned)?;
        Ok(inner.transactions.remove(id).is_some())
    }

    /// All pending transactions sorted by (arrival_index, id).
    pub fn get_all_transactions(&self) -> Result<Vec<Transaction>, MempoolError> {
        let inner = self.inner.read().map_err(|_| MempoolError::Poisoned)?;
        Ok(inner.sorted())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.transactions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .read()
            .map(|inner| inner.transactions.contains_key(id))
            .unwrap_or(false)
    }

    pub fn clear(&self) -> Result<(), MempoolError> {
        let mut inner = self.inner.write().map_err(|_| MempoolError::Poisoned)?;
        inner.transactions.clear();
        Ok(())
    }
}

impl PoolQuery for Mempool {
    fn pending(&self) -> Result<Vec<Transaction>, MempoolError> {
        self.get_all_transactions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::BusinessUpdateAsset;
    use crate::core::builder::TransactionBuilder;
    use crate::core::registry::TransactionRegistry;

    fn tx(registry: &TransactionRegistry, passphrase: &str, nonce: u64) -> Transaction {
        TransactionBuilder::business_update(BusinessUpdateAsset {
            name: Some(format!("name{}", nonce)),
            ..Default::default()
        })
        .nonce(nonce)
        .sign(passphrase, registry)
        .unwrap()
        .build(registry)
        .unwrap()
    }

    #[test]
    fn test_add_and_duplicate() {
        let registry = TransactionRegistry::with_magistrate_types().unwrap();
        let mempool = Mempool::new();
        let t = tx(&registry, "alice", 1);
        mempool.add_transaction(t.clone()).unwrap();
        assert_eq!(mempool.len(), 1);
        assert!(mempool.contains(&t.id));
        assert_eq!(
            mempool.add_transaction(t.clone()).unwrap_err(),
            MempoolError::DuplicateTransaction(t.id.clone())
        );
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_add_if_sees_pool_under_the_same_guard() {
        let registry = TransactionRegistry::with_magistrate_types().unwrap();
        let mempool = Mempool::new();
        let first = tx(&registry, "alice", 1);
        let second = tx(&registry, "alice", 2);
        let one_per_sender = |tx: &Transaction, pool: &dyn PoolQuery| -> Result<(), MagistrateError> {
            if pool.pending_by_sender(tx.sender_public_key())?.is_empty() {
                Ok(())
            } else {
                Err(MagistrateError::Mempool(MempoolError::DuplicateTransaction(tx.id.clone())))
            }
        };

        mempool.add_if(first.clone(), one_per_sender).unwrap();
        assert!(mempool.add_if(second.clone(), one_per_sender).is_err());
        assert_eq!(mempool.pending().unwrap(), vec![first]);
        assert!(!mempool.contains(&second.id));
    }

    #[test]
    fn test_get_and_remove() {
        let registry = TransactionRegistry::with_magistrate_types().unwrap();
        let mempool = Mempool::new();
        let t = tx(&registry, "alice", 1);
        mempool.add_transaction(t.clone()).unwrap();
        assert_eq!(mempool.get_transaction(&t.id).unwrap(), Some(t.clone()));
        assert_eq!(mempool.get_transaction("missing").unwrap(), None);
        assert!(mempool.remove_transaction(&t.id).unwrap());
        assert!(!mempool.remove_transaction(&t.id).unwrap());
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_arrival_order_not_id_order() {
        let registry = TransactionRegistry::with_magistrate_types().unwrap();
        let mempool = Mempool::new();
        let a = tx(&registry, "alice", 1);
        let b = tx(&registry, "bob", 1);
        let (first, second) = if a.id > b.id { (a, b) } else { (b, a) };
        mempool.add_transaction(first.clone()).unwrap();
        mempool.add_transaction(second.clone()).unwrap();
        let pending = mempool.pending().unwrap();
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
    }

    #[test]
    fn test_pending_by_sender() {
        let registry = TransactionRegistry::with_magistrate_types().unwrap();
        let mempool = Mempool::new();
        let a1 = tx(&registry, "alice", 1);
        let a2 = tx(&registry, "alice", 2);
        let b1 = tx(&registry, "bob", 1);
        for t in [&a1, &b1, &a2] {
            mempool.add_transaction(t.clone()).unwrap();
        }
        let alice = mempool.pending_by_sender(a1.sender_public_key()).unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].id, a1.id);
        assert_eq!(alice[1].id, a2.id);

        mempool.clear().unwrap();
        assert!(mempool.pending().unwrap().is_empty());
    }
}
