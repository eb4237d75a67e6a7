use crate::core::asset::MagistrateTransactionType;
use crate::core::events::{EventDispatcher, MagistrateEvent};
use crate::core::handlers::indexes::{self, BUSINESSES};
use crate::core::handlers::{magistrate, Environment, HandlerError, PoolError, TransactionHandler};
use crate::core::mempool::PoolQuery;
use crate::core::state::{BusinessAttributes, Indexer, Wallet, WalletRepository};
use crate::core::transaction::Transaction;

/// Registers the sender's business. A wallet holds at most one, even after resigning it.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusinessRegistrationHandler;

impl TransactionHandler for BusinessRegistrationHandler {
    fn transaction_type(&self) -> MagistrateTransactionType {
        MagistrateTransactionType::BusinessRegistration
    }

    fn wallet_indexes(&self) -> Vec<(&'static str, Indexer)> {
        vec![(BUSINESSES, indexes::business_indexer as Indexer)]
    }

    fn throw_if_cannot_be_applied(
        &self,
        env: &Environment<'_>,
        tx: &Transaction,
        sender: &Wallet,
        _wallets: &dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        magistrate::throw_if_cannot_be_applied(env, tx, sender, || {
            if sender.has_business() {
                return Err(HandlerError::BusinessAlreadyRegistered);
            }
            Ok(())
        })
    }

    fn apply_attributes(
        &self,
        _env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        let asset = tx
            .asset()
            .as_business_registration()
            .ok_or_else(|| HandlerError::invariant("business registration without its asset"))?;
        let business_id = indexes::indexed(wallets, BUSINESSES)?.len() as u64 + 1;
        wallets
            .find_by_public_key(tx.sender_public_key())
            .set_business(BusinessAttributes::new(asset.clone(), business_id));
        Ok(())
    }

    fn revert_attributes(
        &self,
        _env: &Environment<'_>,
        tx: &Transaction,
        wallets: &mut dyn WalletRepository,
    ) -> Result<(), HandlerError> {
        wallets
            .find_by_public_key(tx.sender_public_key())
            .forget_business()
            .ok_or_else(|| HandlerError::invariant("reverting a registration of a wallet without business"))?;
        Ok(())
    }

    fn emit_events(&self, tx: &Transaction, dispatcher: &mut dyn EventDispatcher) {
        dispatcher.dispatch(MagistrateEvent::BusinessRegistered, &tx.data);
    }

    fn throw_if_cannot_enter_pool(&self, tx: &Transaction, pool: &dyn PoolQuery) -> Result<(), PoolError> {
        magistrate::reject_pending(
            tx,
            magistrate::pending_of_kind(tx, pool)?,
            |_| true,
            || format!("Business registration for \"{}\" already in the pool", tx.sender_public_key()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::TransactionBuilder;
    use crate::core::handlers::testing::{business_asset, Ledger};
    use crate::core::mempool::Mempool;

    #[test]
    fn test_register_once() {
        let mut ledger = Ledger::new();
        let alice = ledger.fund("alice");
        let tx = ledger.next(TransactionBuilder::business_registration(business_asset("Alice")), "alice");
        ledger.apply(&tx).unwrap();

        let wallet = ledger.wallet("alice");
        let business = wallet.business().unwrap();
        assert_eq!(business.business_asset, business_asset("Alice"));
        assert_eq!(business.business_id, 1);
        assert!(!business.resigned);
        assert_eq!(
            ledger.wallets.find_by_index(BUSINESSES, &alice).unwrap().map(|w| w.public_key()),
            Some(alice.as_str())
        );

        let again = ledger.next(TransactionBuilder::business_registration(business_asset("Other")), "alice");
        assert_eq!(ledger.check(&again), Err(HandlerError::BusinessAlreadyRegistered));
        println!("OK: second business registration rejected");
    }

    #[test]
    fn test_business_ids_count_up() {
        let mut ledger = Ledger::new();
        for (i, passphrase) in ["alice", "bob", "carol"].iter().enumerate() {
            ledger.fund(passphrase);
            let tx = ledger.next(TransactionBuilder::business_registration(business_asset(passphrase)), passphrase);
            ledger.apply(&tx).unwrap();
            assert_eq!(ledger.wallet(passphrase).business().unwrap().business_id, i as u64 + 1);
        }
    }

    #[test]
    fn test_revert_removes_business_and_index_entry() {
        let mut ledger = Ledger::new();
        let alice = ledger.fund("alice");
        let before = ledger.wallet("alice");
        let tx = ledger.next(TransactionBuilder::business_registration(business_asset("Alice")), "alice");
        ledger.apply(&tx).unwrap();
        ledger.revert(&tx).unwrap();

        assert_eq!(ledger.wallet("alice"), before);
        assert!(ledger.wallets.find_by_index(BUSINESSES, &alice).unwrap().is_none());
    }

    #[test]
    fn test_pool_rejects_second_pending_registration() {
        let ledger = Ledger::new();
        let pool = Mempool::new();
        let first = ledger.sign(TransactionBuilder::business_registration(business_asset("A")), "alice", 1);
        let second = ledger.sign(TransactionBuilder::business_registration(business_asset("B")), "alice", 1);
        let other = ledger.sign(TransactionBuilder::business_registration(business_asset("C")), "bob", 1);
        let handler = BusinessRegistrationHandler;

        assert!(handler.can_enter_transaction_pool(&first, &pool));
        pool.add_transaction(first.clone()).unwrap();
        assert!(handler.can_enter_transaction_pool(&first, &pool));
        let err = handler.throw_if_cannot_enter_pool(&second, &pool).unwrap_err();
        assert_eq!(err.code(), "ERR_PENDING");
        assert!(handler.can_enter_transaction_pool(&other, &pool));
    }
}
