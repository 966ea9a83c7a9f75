//! Consistent (serialized) operation policy
//!
//! Every mutating operation takes the store's ledger-wide lock for its whole
//! read-compute-write sequence. All mutations issued through strategies that
//! share a store are therefore linearizable: the final balances equal those of
//! applying the calls one by one in lock-acquisition order.
//!
//! `transfer` applies both legs inside one critical section, and `inquire`
//! takes the same lock, so no caller can observe a half-applied transfer.

use crate::cli::PolicyKind;
use crate::core::AccountStore;
use crate::strategy::{transfer_legs, OperationStrategy};
use crate::types::{Account, LedgerError};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Serialized operation policy
///
/// # Examples
///
/// ```
/// use atm_ledger::core::AccountStore;
/// use atm_ledger::strategy::{ConsistentPolicy, OperationStrategy};
/// use atm_ledger::types::Account;
/// use rust_decimal::Decimal;
/// use std::sync::Arc;
///
/// let store = Arc::new(AccountStore::from_accounts(vec![Account::new(
///     "000001",
///     "1234",
///     "Alice",
///     Decimal::new(1000, 0),
/// )]));
/// let policy = ConsistentPolicy::new(store.clone());
///
/// policy.deposit("000001", Decimal::new(100, 0)).unwrap();
/// assert_eq!(store.balance_of("000001"), Decimal::new(1100, 0));
/// ```
#[derive(Debug, Clone)]
pub struct ConsistentPolicy {
    store: Arc<AccountStore>,
}

impl ConsistentPolicy {
    /// Create a consistent policy over `store`
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self { store }
    }

    /// Add `delta` to the balance of `id` inside the critical section
    fn apply(&self, operation: &str, id: &str, delta: Decimal) -> Result<(), LedgerError> {
        let _guard = self.store.lock_mutations();

        let Some(current) = self.store.read_balance(id) else {
            warn!(policy = "consistent", operation, account = id, "unknown account, nothing changed");
            return Err(LedgerError::account_not_found(id));
        };

        let updated = current
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow(operation, id))?;
        self.store.write_balance(id, updated);

        debug!(policy = "consistent", operation, account = id, %current, %updated, "balance updated");
        Ok(())
    }
}

impl OperationStrategy for ConsistentPolicy {
    fn deposit(&self, id: &str, amount: Decimal) -> Result<(), LedgerError> {
        self.apply("deposit", id, amount)
    }

    fn withdraw(&self, id: &str, amount: Decimal) -> Result<(), LedgerError> {
        self.apply("withdraw", id, -amount)
    }

    fn transfer(&self, from: &str, to: &str, amount: Decimal) -> Result<(), LedgerError> {
        let _guard = self.store.lock_mutations();

        let (from_balance, to_balance) =
            match (self.store.read_balance(from), self.store.read_balance(to)) {
                (Some(from_balance), Some(to_balance)) => (from_balance, to_balance),
                (None, _) => {
                    warn!(policy = "consistent", operation = "transfer", account = from, "unknown account, nothing changed");
                    return Err(LedgerError::account_not_found(from));
                }
                (_, None) => {
                    warn!(policy = "consistent", operation = "transfer", account = to, "unknown account, nothing changed");
                    return Err(LedgerError::account_not_found(to));
                }
            };

        let (debited, credited) = transfer_legs(from, to, from_balance, to_balance, amount)?;
        self.store.write_balance(from, debited);
        self.store.write_balance(to, credited);

        debug!(policy = "consistent", from, to, %amount, "transfer applied");
        Ok(())
    }

    fn inquire(&self, id: &str) -> Option<Account> {
        let _guard = self.store.lock_mutations();
        self.store.read_account(id)
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Consistent
    }
}
