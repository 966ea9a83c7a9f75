//! ATM Ledger Library
//! # Overview
//!
//! This library keeps per-account balances in memory and runs deposit,
//! withdrawal, transfer and inquiry operations against them from concurrent
//! threads, under one of two policies: a serialized one that never loses an
//! update, and an unsynchronized one that reproduces the lost-update anomaly.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, LedgerError)
//! - [`core`] - The shared [`AccountStore`] and its load/save checkpoints
//! - [`strategy`] - The [`OperationStrategy`] trait and its two policies
//! - [`io`] - Persisted ledger format and the account report
//! - [`simulator`] - Concurrent scenario runner
//! - [`cli`] / [`app`] - Command-line arguments and the flow behind them
//! - [`logging`] - Tracing subscriber setup
//!
//! # Policies
//!
//! - **Consistent**: every read-modify-write holds the store's critical section;
//!   concurrent calls are linearizable and transfers are atomic
//! - **Racy**: reads a snapshot, waits a simulated delay, writes the snapshot
//!   plus the amount back; overlapping calls on one account lose updates
//!
//! # Ledger Format
//!
//! One account per line: `<id> <credential> <name> <balance>`, separated by
//! single spaces. Lines with a different field count are skipped on load;
//! four-field lines that cannot be loaded are kept and written back unchanged.

// Module declarations
pub mod app;
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod simulator;
pub mod strategy;
pub mod types;

pub use core::AccountStore;
pub use io::{write_accounts_report, write_ledger, LedgerLine};
pub use strategy::{create_strategy, ConsistentPolicy, OperationStrategy, RacyConfig, RacyPolicy};
pub use types::{Account, AccountId, LedgerError};
