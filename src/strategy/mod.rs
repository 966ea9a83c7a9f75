//! Operation strategy module for account mutations
//!
//! This module defines the Strategy pattern for the four ATM operations
//! (deposit, withdraw, transfer, inquire) over a shared `AccountStore`. Two
//! policies are provided and selected at runtime:
//!
//! - `ConsistentPolicy`: every read-modify-write runs inside the store's
//!   critical section, so no update is ever lost
//! - `RacyPolicy`: reads, waits, then writes without any synchronization,
//!   reproducing the lost-update anomaly on purpose

use crate::cli::PolicyKind;
use crate::core::AccountStore;
use crate::types::{Account, LedgerError};
use rust_decimal::Decimal;
use std::sync::Arc;

pub mod consistent;
pub mod racy;

pub use consistent::ConsistentPolicy;
pub use racy::{RacyConfig, RacyPolicy};

/// Operation strategy trait for account operations
///
/// Implementations are shared between threads (usually behind an `Arc`) and
/// every method may be called concurrently from independent call sites.
///
/// # Unknown Accounts
///
/// Every operation that names an unknown identifier returns
/// `LedgerError::AccountNotFound` (or `None` for `inquire`) and leaves every
/// balance untouched. Callers are free to ignore the error.
///
/// # Overdrafts
///
/// No policy checks that a withdrawal or transfer is covered by the balance;
/// balances may go negative.
pub trait OperationStrategy: Send + Sync {
    /// Increase the balance of `id` by `amount`
    fn deposit(&self, id: &str, amount: Decimal) -> Result<(), LedgerError>;

    /// Decrease the balance of `id` by `amount`
    fn withdraw(&self, id: &str, amount: Decimal) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`
    ///
    /// Nothing is changed unless both accounts exist.
    fn transfer(&self, from: &str, to: &str, amount: Decimal) -> Result<(), LedgerError>;

    /// Snapshot of account `id`
    fn inquire(&self, id: &str) -> Option<Account>;

    /// Which policy this strategy implements
    fn kind(&self) -> PolicyKind;
}

/// Create an operation strategy over `store`
///
/// # Arguments
///
/// * `kind` - The policy to create (Consistent or Racy)
/// * `store` - The shared store the strategy operates on
/// * `config` - Optional configuration for the racy policy (ignored for consistent)
pub fn create_strategy(
    kind: PolicyKind,
    store: Arc<AccountStore>,
    config: Option<RacyConfig>,
) -> Arc<dyn OperationStrategy> {
    match kind {
        PolicyKind::Consistent => Arc::new(ConsistentPolicy::new(store)),
        PolicyKind::Racy => Arc::new(RacyPolicy::new(store, config.unwrap_or_default())),
    }
}

/// New balances of both legs of a transfer, from the balances read before it
///
/// A transfer of an account to itself nets out to its original balance.
pub(crate) fn transfer_legs(
    from: &str,
    to: &str,
    from_balance: Decimal,
    to_balance: Decimal,
    amount: Decimal,
) -> Result<(Decimal, Decimal), LedgerError> {
    let debited = from_balance
        .checked_sub(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow("transfer", from))?;

    let credit_base = if from == to { debited } else { to_balance };
    let credited = credit_base
        .checked_add(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow("transfer", to))?;

    Ok((debited, credited))
}
