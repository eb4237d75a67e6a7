//! Shared gate of every magistrate handler, and the history replay used by update reverts.

use tracing::debug;

use crate::core::fee;
use crate::core::handlers::{base, Environment, HandlerError, PoolError};
use crate::core::history::HistoryQuery;
use crate::core::mempool::PoolQuery;
use crate::core::state::Wallet;
use crate::core::transaction::Transaction;

/// Static fee, then the exception allow-list, then `rules`, then the base checks.
pub(crate) fn throw_if_cannot_be_applied<F>(
    env: &Environment<'_>,
    tx: &Transaction,
    sender: &Wallet,
    rules: F,
) -> Result<(), HandlerError>
where
    F: FnOnce() -> Result<(), HandlerError>,
{
    // The fee gate runs before the exception lookup: an allow-listed id must still pay the static fee.
    let expected = fee::static_fee(env.config.milestone(), tx.asset());
    if tx.fee() != expected {
        return Err(HandlerError::StaticFeeMismatch {
            expected,
            got: tx.fee(),
        });
    }

    if env.config.is_exception(&tx.id) {
        debug!(transaction_id = %tx.id, "Exception transaction skips precondition checks");
        return Ok(());
    }

    rules()?;
    base::throw_if_cannot_be_applied(env, tx, sender)
}

/// Committed rows of `query` from the sender of `tx` that precede it, in nonce order.
///
/// `tx` itself is skipped. Any other row at or above its nonce means a later transaction has not
/// been reverted yet.
pub(crate) fn rows_before(env: &Environment<'_>, query: HistoryQuery, tx: &Transaction) -> Result<Vec<Transaction>, HandlerError> {
    let rows = env.history.read(&query.sender(tx.sender_public_key()))?;
    let mut prior = Vec::with_capacity(rows.len());
    for row in rows {
        if row.id == tx.id {
            continue;
        }
        if row.nonce() >= tx.nonce() {
            return Err(HandlerError::ReplayOrderViolation(row.id));
        }
        prior.push(row);
    }
    Ok(prior)
}

/// Fails with `ERR_PENDING` when a pending transaction other than `tx` satisfies `conflicts`.
pub(crate) fn reject_pending<F>(
    tx: &Transaction,
    pending: Vec<Transaction>,
    conflicts: F,
    reason: impl FnOnce() -> String,
) -> Result<(), PoolError>
where
    F: Fn(&Transaction) -> bool,
{
    if pending.iter().any(|other| other.id != tx.id && conflicts(other)) {
        let reason = reason();
        debug!(transaction_id = %tx.id, %reason, "Rejected from pool");
        return Err(PoolError::pending(&tx.id, reason));
    }
    Ok(())
}

/// Pending transactions of the same type from the same sender.
pub(crate) fn pending_of_kind(tx: &Transaction, pool: &dyn PoolQuery) -> Result<Vec<Transaction>, PoolError> {
    Ok(pool
        .pending_by_sender(tx.sender_public_key())?
        .into_iter()
        .filter(|other| other.internal_type() == tx.internal_type())
        .collect())
}

/// Pending transactions of the same type from any sender.
pub(crate) fn pending_of_type(tx: &Transaction, pool: &dyn PoolQuery) -> Result<Vec<Transaction>, PoolError> {
    Ok(pool
        .pending()?
        .into_iter()
        .filter(|other| other.internal_type() == tx.internal_type())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigManager, Exceptions, NetworkConfig};
    use crate::core::asset::BusinessUpdateAsset;
    use crate::core::builder::TransactionBuilder;
    use crate::core::handlers::testing::{business_asset, Ledger};
    use crate::core::registry::InternalTransactionType;

    #[test]
    fn test_fee_is_checked_before_everything() {
        let ledger = Ledger::new();
        let builder = TransactionBuilder::business_registration(business_asset("A"));
        for fee in [0, 1, u64::MAX] {
            let tx = ledger.sign(builder.clone().fee(fee), "alice", 1);
            let sender = Wallet::new(tx.sender_public_key());
            let result = throw_if_cannot_be_applied(&ledger.env(), &tx, &sender, || {
                panic!("rules must not run on a fee mismatch")
            });
            assert_eq!(
                result,
                Err(HandlerError::StaticFeeMismatch {
                    expected: fee::BUSINESS_REGISTRATION_FEE,
                    got: fee
                })
            );
        }
    }

    #[test]
    fn test_exception_skips_rules_and_base() {
        let ledger = Ledger::new();
        let tx = ledger.sign(TransactionBuilder::business_resignation(), "alice", 7);
        let mut transactions = std::collections::BTreeSet::new();
        transactions.insert(tx.id.clone());
        let config = ConfigManager::new(NetworkConfig {
            exceptions: Exceptions { transactions },
            ..NetworkConfig::default()
        })
        .unwrap();
        let ledger = Ledger::with_config(config);

        let sender = Wallet::new(tx.sender_public_key());
        let result = throw_if_cannot_be_applied(&ledger.env(), &tx, &sender, || Err(HandlerError::BusinessIsResigned));
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_exception_still_pays_the_static_fee() {
        let ledger = Ledger::new();
        let tx = ledger.sign(TransactionBuilder::business_resignation().fee(1), "alice", 7);
        let config = ConfigManager::new(NetworkConfig {
            exceptions: Exceptions {
                transactions: [tx.id.clone()].into_iter().collect(),
            },
            ..NetworkConfig::default()
        })
        .unwrap();
        let ledger = Ledger::with_config(config);

        let sender = Wallet::new(tx.sender_public_key());
        let result = throw_if_cannot_be_applied(&ledger.env(), &tx, &sender, || Ok(()));
        assert_eq!(
            result,
            Err(HandlerError::StaticFeeMismatch {
                expected: fee::BUSINESS_RESIGNATION_FEE,
                got: 1
            })
        );
    }

    #[test]
    fn test_rows_before_detects_unreverted_rows() {
        let mut ledger = Ledger::new();
        let update = |name: &str| {
            TransactionBuilder::business_update(BusinessUpdateAsset {
                name: Some(name.to_string()),
                ..Default::default()
            })
        };
        let tx1 = ledger.sign(update("one"), "alice", 1);
        let tx2 = ledger.sign(update("two"), "alice", 2);
        let tx3 = ledger.sign(update("three"), "alice", 3);
        for tx in [&tx1, &tx2, &tx3] {
            ledger.history.append(tx.clone()).unwrap();
        }
        let query = HistoryQuery::of_type(InternalTransactionType::new(2, 2));

        let prior = rows_before(&ledger.env(), query.clone(), &tx3).unwrap();
        assert_eq!(prior, vec![tx1.clone(), tx2.clone()]);

        assert_eq!(
            rows_before(&ledger.env(), query, &tx2),
            Err(HandlerError::ReplayOrderViolation(tx3.id.clone()))
        );
    }
}
