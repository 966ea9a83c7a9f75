//! Racy (unsynchronized) operation policy
//!
//! This policy exists to demonstrate the lost-update anomaly and must not be
//! "fixed". `deposit` and `withdraw` read the balance into a local snapshot,
//! hold for a simulated processing delay, then write `snapshot ± amount` back
//! without re-reading. Two overlapping calls on the same account both start
//! from the same snapshot and the later write discards the earlier one.
//!
//! `transfer` applies both legs immediately, with no delay and no lock, so it
//! is not atomic either; the window is just much narrower.
//!
//! Individual reads and writes are still memory-safe: each one locks only the
//! account's map entry, and only for that single access.

use crate::cli::PolicyKind;
use crate::core::AccountStore;
use crate::strategy::{transfer_legs, OperationStrategy};
use crate::types::{Account, LedgerError};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the racy policy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RacyConfig {
    /// Simulated processing delay between the read and the write
    pub latency: Duration,
}

impl Default for RacyConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(1000),
        }
    }
}

impl RacyConfig {
    /// Create a RacyConfig with the given delay in milliseconds
    ///
    /// A zero delay is accepted, but it closes most of the race window, so a
    /// warning is logged.
    pub fn from_millis(latency_ms: u64) -> Self {
        if latency_ms == 0 {
            warn!("racy latency is zero, lost updates will be rare");
        }

        Self {
            latency: Duration::from_millis(latency_ms),
        }
    }
}

/// Unsynchronized operation policy
#[derive(Debug, Clone)]
pub struct RacyPolicy {
    store: Arc<AccountStore>,
    config: RacyConfig,
}

impl RacyPolicy {
    /// Create a racy policy over `store`
    pub fn new(store: Arc<AccountStore>, config: RacyConfig) -> Self {
        Self { store, config }
    }

    /// Read, wait, then write `snapshot + delta` back
    fn apply(&self, operation: &str, id: &str, delta: Decimal) -> Result<(), LedgerError> {
        let Some(snapshot) = self.store.read_balance(id) else {
            warn!(policy = "racy", operation, account = id, "unknown account, nothing changed");
            return Err(LedgerError::account_not_found(id));
        };

        let updated = snapshot
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow(operation, id))?;

        thread::sleep(self.config.latency);

        let overwritten = self.store.write_balance(id, updated);
        debug!(policy = "racy", operation, account = id, %snapshot, %updated, ?overwritten, "balance written from stale snapshot");
        Ok(())
    }
}

impl OperationStrategy for RacyPolicy {
    fn deposit(&self, id: &str, amount: Decimal) -> Result<(), LedgerError> {
        self.apply("deposit", id, amount)
    }

    fn withdraw(&self, id: &str, amount: Decimal) -> Result<(), LedgerError> {
        self.apply("withdraw", id, -amount)
    }

    fn transfer(&self, from: &str, to: &str, amount: Decimal) -> Result<(), LedgerError> {
        let Some(from_balance) = self.store.read_balance(from) else {
            warn!(policy = "racy", operation = "transfer", account = from, "unknown account, nothing changed");
            return Err(LedgerError::account_not_found(from));
        };
        let Some(to_balance) = self.store.read_balance(to) else {
            warn!(policy = "racy", operation = "transfer", account = to, "unknown account, nothing changed");
            return Err(LedgerError::account_not_found(to));
        };

        let (debited, credited) = transfer_legs(from, to, from_balance, to_balance, amount)?;
        self.store.write_balance(from, debited);
        self.store.write_balance(to, credited);

        debug!(policy = "racy", from, to, %amount, "transfer applied");
        Ok(())
    }

    fn inquire(&self, id: &str) -> Option<Account> {
        self.store.read_account(id)
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Racy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn policy_with(balance: i64, latency_ms: u64) -> (Arc<AccountStore>, RacyPolicy) {
        let store = Arc::new(AccountStore::from_accounts(vec![
            Account::new("000001", "1234", "TestAccount1", Decimal::from(balance)),
            Account::new("000002", "5678", "TestAccount2", Decimal::ZERO),
        ]));
        let policy = RacyPolicy::new(store.clone(), RacyConfig::from_millis(latency_ms));
        (store, policy)
    }

    #[test]
    fn test_default_latency_is_one_second() {
        assert_eq!(RacyConfig::default().latency, Duration::from_secs(1));
    }

    #[test]
    fn test_sequential_calls_apply_normally() {
        let (store, policy) = policy_with(1000, 0);

        policy.deposit("000001", Decimal::from(100)).unwrap();
        policy.withdraw("000001", Decimal::from(40)).unwrap();

        assert_eq!(store.balance_of("000001"), Decimal::from(1060));
    }

    #[test]
    fn test_transfer_applies_both_legs() {
        let (store, policy) = policy_with(1000, 0);

        policy
            .transfer("000001", "000002", Decimal::from(300))
            .unwrap();

        assert_eq!(store.balance_of("000001"), Decimal::from(700));
        assert_eq!(store.balance_of("000002"), Decimal::from(300));
    }

    #[test]
    fn test_unknown_account_changes_nothing() {
        let (store, policy) = policy_with(1000, 0);

        assert!(policy.deposit("999999", Decimal::ONE).is_err());
        assert!(policy.withdraw("999999", Decimal::ONE).is_err());
        assert!(policy.transfer("000001", "999999", Decimal::ONE).is_err());
        assert!(policy.transfer("999999", "000001", Decimal::ONE).is_err());

        assert_eq!(store.balance_of("000001"), Decimal::from(1000));
        assert_eq!(store.balance_of("000002"), Decimal::ZERO);
        assert!(policy.inquire("999999").is_none());
    }

    #[test]
    fn test_overlapping_deposits_lose_an_update() {
        let (store, policy) = policy_with(1000, 300);
        let barrier = Barrier::new(2);

        thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(|| {
                    barrier.wait();
                    policy.deposit("000001", Decimal::from(100)).unwrap();
                });
            }
        });

        // Both calls snapshot 1000 long before either writes.
        assert_eq!(store.balance_of("000001"), Decimal::from(1100));
    }
}
