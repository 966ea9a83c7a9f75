//! Core ledger module
//!
//! This module contains the shared account table:
//! - `account_store` - In-memory store of account records with load/save

pub mod account_store;

pub use account_store::AccountStore;
