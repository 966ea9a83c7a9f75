//! Ledger format handling for persisted accounts and the account report
//!
//! This module centralizes the on-disk text format, providing:
//! - LedgerRecord structure for deserialization
//! - Conversion from ledger records to domain types
//! - LedgerLine, one persisted line as loaded or kept verbatim
//! - Ledger serialization and the human-facing account report
//!
//! The persisted format is one record per line, fields separated by single
//! spaces: `<id> <credential> <name> <balance>`. There is no quoting and no
//! escaping, so names containing spaces are not representable.
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::types::{Account, LedgerError};
use csv::{ByteRecord, QuoteStyle, WriterBuilder};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Number of fields in a well-formed ledger record
pub const LEDGER_FIELDS: usize = 4;

/// Field delimiter of the persisted ledger
pub const LEDGER_DELIMITER: u8 = b' ';

/// Ledger record structure for deserialization
///
/// Fields are positional (the ledger has no header line). The balance is kept
/// as text so conversion errors can carry the raw value.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LedgerRecord {
    pub id: String,
    pub credential: String,
    pub name: String,
    pub balance: String,
}

/// One line of the persisted ledger
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerLine {
    /// A record loaded as an account
    Account(Account),
    /// A four-field record that could not be loaded, written back byte for byte
    Verbatim(ByteRecord),
}

impl From<Account> for LedgerLine {
    fn from(account: Account) -> Self {
        LedgerLine::Account(account)
    }
}

/// Number of fields a record splits into, ignoring trailing empty fields
///
/// `"a b c d "` counts as four fields, while `"a  b c d"` counts as five
/// because the empty field is interior.
pub fn field_count(record: &ByteRecord) -> usize {
    (0..record.len())
        .rev()
        .find(|&i| !record[i].is_empty())
        .map_or(0, |last| last + 1)
}

/// Parse a balance field
///
/// Accepts plain decimals (`1000.0`, `-12.5`) and scientific notation
/// (`1.5E3`), which is how very large or very small balances are sometimes
/// written by other tools. Digit separators (`1_000`) are not accepted.
pub fn parse_balance(value: &str) -> Option<Decimal> {
    if value.contains('_') {
        return None;
    }

    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

/// The persisted fields of `account`
pub fn account_record(account: &Account) -> ByteRecord {
    let balance = account.balance.to_string();
    ByteRecord::from(vec![
        account.id.as_str(),
        account.credential.as_str(),
        account.name.as_str(),
        balance.as_str(),
    ])
}

/// Convert a LedgerRecord to an Account
///
/// # Arguments
///
/// * `record` - The deserialized ledger record
/// * `line` - Line number of the record, used for error context
///
/// # Returns
///
/// * `Ok(Account)` - Successfully converted record
/// * `Err(LedgerError::InvalidBalance)` - The balance is not a decimal number
pub fn convert_ledger_record(record: LedgerRecord, line: u64) -> Result<Account, LedgerError> {
    let balance = parse_balance(&record.balance)
        .ok_or_else(|| LedgerError::invalid_balance(line, &record.balance))?;

    Ok(Account {
        id: record.id,
        credential: record.credential,
        name: record.name,
        balance,
    })
}

/// Write ledger lines in the persisted ledger format
///
/// Lines are written in the order given, one per line, never quoted.
/// Verbatim lines are written exactly as they were read.
///
/// # Arguments
///
/// * `lines` - Lines to serialize, in store order
/// * `output` - Writer receiving the ledger text
pub fn write_ledger(lines: &[LedgerLine], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = WriterBuilder::new()
        .delimiter(LEDGER_DELIMITER)
        .quote_style(QuoteStyle::Never)
        .has_headers(false)
        .from_writer(output);

    for line in lines {
        match line {
            LedgerLine::Account(account) => writer.write_byte_record(&account_record(account))?,
            LedgerLine::Verbatim(record) => writer.write_byte_record(record)?,
        }
    }

    writer.flush()?;

    Ok(())
}

/// Write the account report in CSV format
///
/// Columns: account, name, balance. Accounts keep the order given (store
/// order) and credentials are never printed.
///
/// # Arguments
///
/// * `accounts` - Slice of account snapshots to report
/// * `output` - Mutable reference to a writer for outputting CSV
pub fn write_accounts_report(
    accounts: &[Account],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "name", "balance"])?;

    for account in accounts {
        writer.write_record([
            account.id.clone(),
            account.name.clone(),
            format!("{:.2}", account.balance),
        ])?;
    }

    writer.flush()?;

    Ok(())
}
