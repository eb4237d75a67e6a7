//! Committed-transaction history, read back by bootstrap and by revert-by-replay.
//!
//! # Invariants
//! - `read` yields rows in commit order; rows of one sender are in ascending nonce order.
//! - Reads are paginated and restartable: `read` is the concatenation of every page.

use thiserror::Error;

use crate::core::registry::InternalTransactionType;
use crate::core::transaction::Transaction;
use crate::error::MagistrateError;

/// Rows fetched per page by [`TransactionHistory::read`].
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Transaction history is unavailable: {0}")]
    Unavailable(String),

    #[error("Transaction {0} is already recorded")]
    Duplicate(String),

    #[error("Transaction {0} is not recorded")]
    NotRecorded(String),
}

impl From<HistoryError> for MagistrateError {
    fn from(err: HistoryError) -> Self {
        MagistrateError::History(err)
    }
}

/// Selects the rows of one transaction type, optionally of one sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub transaction_type: InternalTransactionType,
    pub sender_public_key: Option<String>,
}

impl HistoryQuery {
    pub fn of_type(transaction_type: InternalTransactionType) -> Self {
        Self {
            transaction_type,
            sender_public_key: None,
        }
    }

    pub fn sender(mut self, public_key: impl Into<String>) -> Self {
        self.sender_public_key = Some(public_key.into());
        self
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        tx.internal_type() == self.transaction_type
            && self
                .sender_public_key
                .as_deref()
                .map_or(true, |key| key == tx.sender_public_key())
    }
}

/// Read access to committed transactions.
pub trait TransactionHistory {
    fn read_page(&self, query: &HistoryQuery, offset: usize, limit: usize) -> Result<Vec<Transaction>, HistoryError>;

    /// Every matching row, fetched page by page.
    fn read(&self, query: &HistoryQuery) -> Result<Vec<Transaction>, HistoryError> {
        let mut rows = Vec::new();
        loop {
            let page = self.read_page(query, rows.len(), DEFAULT_PAGE_SIZE)?;
            let done = page.len() < DEFAULT_PAGE_SIZE;
            rows.extend(page);
            if done {
                return Ok(rows);
            }
        }
    }
}

/// History kept in memory in commit order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionHistory {
    rows: Vec<Transaction>,
}

impl InMemoryTransactionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, tx: Transaction) -> Result<(), HistoryError> {
        if self.contains(&tx.id) {
            return Err(HistoryError::Duplicate(tx.id));
        }
        self.rows.push(tx);
        Ok(())
    }

    /// Removes a reverted transaction.
    pub fn remove(&mut self, id: &str) -> Option<Transaction> {
        let position = self.rows.iter().position(|tx| tx.id == id)?;
        Some(self.rows.remove(position))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.iter().any(|tx| tx.id == id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }
}

impl TransactionHistory for InMemoryTransactionHistory {
    fn read_page(&self, query: &HistoryQuery, offset: usize, limit: usize) -> Result<Vec<Transaction>, HistoryError> {
        let mut matching: Vec<&Transaction> = self.rows.iter().filter(|tx| query.matches(tx)).collect();
        if query.sender_public_key.is_some() {
            matching.sort_by_key(|tx| tx.nonce());
        }
        Ok(matching.into_iter().skip(offset).take(limit).cloned().collect())
    }
}
