//! Error types for the ATM ledger
//!
//! This module defines all error types that can occur while loading, saving,
//! or operating on the ledger. None of them is fatal for the hosting process.
//!
//! # Error Categories
//!
//! - **File I/O Errors**: ledger file missing, unreadable, or unwritable
//! - **Parsing Errors**: malformed ledger records
//! - **Operation Errors**: unknown account identifiers, duplicate identifiers,
//!   balance overflow

use thiserror::Error;

/// Main error type for the ledger
///
/// Each variant includes enough context to be logged on its own.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// The account identifier is not present in the store
    ///
    /// Returned by strategy operations. When this is returned no balance has
    /// been changed, so callers are free to ignore it.
    #[error("Account {id} not found")]
    AccountNotFound {
        /// The identifier that was looked up
        id: String,
    },

    /// An account with this identifier already exists in the store
    #[error("Duplicate account {id}")]
    DuplicateAccount {
        /// The duplicated identifier
        id: String,
    },

    /// The credential does not match the account (or is not a 4-digit PIN)
    #[error("Invalid account or PIN for {id}")]
    AuthenticationFailed {
        /// Account identifier that was presented
        id: String,
    },

    /// Balance arithmetic would overflow
    ///
    /// The operation is rejected and the balance is left unchanged.
    #[error("Arithmetic overflow in {operation} for account {id}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account identifier
        id: String,
    },

    /// A concurrently running operation did not complete (its thread panicked)
    #[error("Operation {operation} did not complete")]
    Interrupted {
        /// Description of the operation
        operation: String,
    },

    /// I/O error occurred while reading or writing the ledger file
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// Ledger record could not be parsed
    #[error("Ledger parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// Balance field of a ledger record is not a decimal number
    #[error("Invalid balance '{value}' at line {line}")]
    InvalidBalance {
        /// Line number of the record
        line: u64,
        /// The raw balance text
        value: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        if error.is_io_error() {
            return LedgerError::Io {
                message: error.to_string(),
            };
        }

        LedgerError::Parse {
            line: error.position().map(|pos| pos.line()),
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Create an AccountNotFound error
    pub fn account_not_found(id: &str) -> Self {
        LedgerError::AccountNotFound { id: id.to_string() }
    }

    /// Create a DuplicateAccount error
    pub fn duplicate_account(id: &str) -> Self {
        LedgerError::DuplicateAccount { id: id.to_string() }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, id: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            id: id.to_string(),
        }
    }

    /// Create an InvalidBalance error
    pub fn invalid_balance(line: u64, value: &str) -> Self {
        LedgerError::InvalidBalance {
            line,
            value: value.to_string(),
        }
    }
}
