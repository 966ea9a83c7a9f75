//! Account-related types for the ATM ledger
//!
//! This module defines the Account record held by the `AccountStore`.

use rust_decimal::Decimal;

/// Account identifier (the account number printed on the card)
pub type AccountId = String;

/// A single ledger record
///
/// Represents one line of the persisted ledger. The store exclusively owns these
/// records; strategies and callers only ever receive cloned snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Identifier, unique within a store
    pub id: AccountId,

    /// Credential (PIN), compared by exact string match
    pub credential: String,

    /// Display name of the account holder
    pub name: String,

    /// Current balance
    ///
    /// No sign invariant is enforced: withdrawals are not checked for
    /// sufficiency, so the balance may go negative.
    pub balance: Decimal,
}

impl Account {
    /// Create a new account record
    pub fn new(
        id: impl Into<AccountId>,
        credential: impl Into<String>,
        name: impl Into<String>,
        balance: Decimal,
    ) -> Self {
        Account {
            id: id.into(),
            credential: credential.into(),
            name: name.into(),
            balance,
        }
    }
}

/// Whether `pin` has the shape of an ATM PIN (exactly four ASCII digits)
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `id` has the shape of an account number (exactly six ASCII digits)
pub fn is_valid_account_number(id: &str) -> bool {
    id.len() == 6 && id.bytes().all(|b| b.is_ascii_digit())
}
