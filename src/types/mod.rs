//! Types module
//!
//! Contains core data structures used throughout the application:
//! - `account`: the ledger record and its identifier
//! - `error`: error types for the ledger

pub mod account;
pub mod error;

pub use account::{is_valid_account_number, is_valid_pin, Account, AccountId};
pub use error::LedgerError;
