//! I/O module
//!
//! Handles the persisted ledger format and the account report.
//!
//! # Components
//!
//! - `ledger_format` - Ledger format handling (record conversion, serialization, report)
//! - `ledger_reader` - Streaming ledger reader with iterator interface

pub mod ledger_format;
pub mod ledger_reader;

pub use ledger_format::{
    convert_ledger_record, write_accounts_report, write_ledger, LedgerLine, LedgerRecord,
};
pub use ledger_reader::LedgerReader;
