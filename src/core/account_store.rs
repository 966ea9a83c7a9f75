//! Shared in-memory account ledger
//!
//! This module provides the `AccountStore`, the table of account records shared
//! by every operation strategy in the process.
//!
//! # Design
//!
//! Records live in a `DashMap` keyed by account identifier, so single reads and
//! single writes from many threads are memory-safe without a global lock. Load
//! order is kept separately in `order` and only matters for persistence and
//! reporting. Four-field lines that could not be loaded as accounts (and
//! duplicate identifiers) keep their place in `order` as verbatim records, so
//! a save never drops a line that a load accepted as a record.
//!
//! The store owns one ledger-wide mutation lock (`lock_mutations`). A strategy
//! that wants linearizable read-modify-write sequences takes it around the
//! whole sequence; a strategy that does not take it gets no ordering guarantee
//! between its read and its write. The public read accessors take it too, so
//! they never observe half of a serialized transfer.
//!
//! # Failure Semantics
//!
//! - `load` never fails: an unreadable ledger yields an empty store (logged)
//! - `save` logs and returns I/O errors; the previous file contents may remain
//! - `balance_of` returns zero for unknown identifiers

use crate::io::ledger_format::{account_record, write_ledger, LedgerLine};
use crate::io::ledger_reader::LedgerReader;
use crate::types::{Account, AccountId, LedgerError};
use csv::ByteRecord;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Position in the persisted ledger
#[derive(Debug, Clone)]
enum Slot {
    Account(AccountId),
    Verbatim(ByteRecord),
}

/// In-memory table of account records
///
/// Created once per process (usually from the persisted ledger) and shared by
/// reference, typically through an `Arc<AccountStore>`, with every strategy.
#[derive(Debug, Default)]
pub struct AccountStore {
    /// Account records by identifier
    accounts: DashMap<AccountId, Account>,

    /// Ledger lines in load order
    order: Vec<Slot>,

    /// Ledger-wide critical section for serialized mutations
    mutation_lock: Mutex<()>,
}

impl AccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from account records, keeping their order
    ///
    /// Identifiers must be unique: a record whose identifier was already seen
    /// is skipped with a warning and the first one wins.
    pub fn from_accounts<I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = Account>,
    {
        let mut store = Self::new();
        for account in accounts {
            if let Err(e) = store.insert(account) {
                warn!(error = %e, "skipping ledger record");
            }
        }
        store
    }

    /// Add an account at the end of the store order
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::DuplicateAccount` if the identifier is taken; the
    /// store is left unchanged.
    pub fn insert(&mut self, account: Account) -> Result<(), LedgerError> {
        if self.accounts.contains_key(account.id.as_str()) {
            return Err(LedgerError::duplicate_account(&account.id));
        }

        self.order.push(Slot::Account(account.id.clone()));
        self.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    /// Build a store from persisted ledger lines, keeping their order
    ///
    /// Verbatim lines are kept in place. An account whose identifier was
    /// already seen is not loaded (the first one wins) but is kept in place as
    /// a verbatim line, so saving writes it back.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = LedgerLine>,
    {
        let mut store = Self::new();
        for line in lines {
            match line {
                LedgerLine::Account(account) => {
                    let record = account_record(&account);
                    if let Err(e) = store.insert(account) {
                        warn!(error = %e, "ledger record not loaded, keeping it verbatim");
                        store.order.push(Slot::Verbatim(record));
                    }
                }
                LedgerLine::Verbatim(record) => store.order.push(Slot::Verbatim(record)),
            }
        }
        store
    }

    /// Load a store from a ledger file, reporting I/O failures
    ///
    /// Lines that do not have exactly four fields are skipped. Four-field
    /// records that cannot be loaded are kept verbatim and written back by
    /// `save`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Io` if the file cannot be opened or read.
    pub fn try_load(path: &Path) -> Result<Self, LedgerError> {
        let mut reader = LedgerReader::from_path(path)?;
        let lines = reader.by_ref().collect::<Result<Vec<_>, _>>()?;

        let store = Self::from_lines(lines);
        info!(
            path = %path.display(),
            accounts = store.len(),
            verbatim = store.order.len() - store.len(),
            skipped = reader.skipped(),
            "ledger loaded"
        );
        Ok(store)
    }

    /// Load a store from a ledger file
    ///
    /// Fail-open: if the ledger cannot be read the error is logged and an empty
    /// store is returned instead.
    pub fn load(path: &Path) -> Self {
        Self::try_load(path).unwrap_or_else(|e| {
            error!(path = %path.display(), error = %e, "failed to load ledger, starting empty");
            Self::new()
        })
    }

    /// Write every record to `path` in store order, replacing the file
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Io` if the file cannot be created or written. The
    /// error is also logged; callers are not expected to treat it as fatal.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let lines = self.lines();

        let result = File::create(path)
            .map_err(LedgerError::from)
            .and_then(|file| {
                let mut output = BufWriter::new(file);
                write_ledger(&lines, &mut output)?;
                output.flush()?;
                Ok(())
            });

        match &result {
            Ok(()) => info!(path = %path.display(), lines = lines.len(), "ledger saved"),
            Err(e) => error!(path = %path.display(), error = %e, "failed to save ledger"),
        }

        result
    }

    /// Snapshot of the account with identifier `id`
    pub fn lookup(&self, id: &str) -> Option<Account> {
        let _guard = self.lock_mutations();
        self.read_account(id)
    }

    /// Balance of account `id`, or zero if there is no such account
    pub fn balance_of(&self, id: &str) -> Decimal {
        let _guard = self.lock_mutations();
        self.read_balance(id).unwrap_or(Decimal::ZERO)
    }

    /// Snapshot of every account, in store order
    ///
    /// Taken inside the critical section, so every serialized transfer is
    /// either fully in the snapshot or not at all.
    pub fn accounts(&self) -> Vec<Account> {
        let _guard = self.lock_mutations();
        self.order
            .iter()
            .filter_map(|slot| match slot {
                Slot::Account(id) => self.read_account(id),
                Slot::Verbatim(_) => None,
            })
            .collect()
    }

    /// Snapshot of every persisted line, in store order
    pub fn lines(&self) -> Vec<LedgerLine> {
        let _guard = self.lock_mutations();
        self.order
            .iter()
            .filter_map(|slot| match slot {
                Slot::Account(id) => self.read_account(id).map(LedgerLine::Account),
                Slot::Verbatim(record) => Some(LedgerLine::Verbatim(record.clone())),
            })
            .collect()
    }

    /// Snapshot of account `id` if `credential` matches exactly
    pub fn verify_credential(&self, id: &str, credential: &str) -> Option<Account> {
        self.lookup(id)
            .filter(|account| account.credential == credential)
    }

    /// Whether an account with identifier `id` exists
    pub fn contains(&self, id: &str) -> bool {
        self.accounts.contains_key(id)
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the store holds no accounts
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Read the account `id` without entering the critical section
    pub(crate) fn read_account(&self, id: &str) -> Option<Account> {
        self.accounts.get(id).map(|entry| entry.value().clone())
    }

    /// Read the current balance of `id`
    ///
    /// The entry is locked only for the duration of the read.
    pub(crate) fn read_balance(&self, id: &str) -> Option<Decimal> {
        self.accounts.get(id).map(|entry| entry.balance)
    }

    /// Overwrite the balance of `id` with `balance`
    ///
    /// The entry is locked only for the duration of the write. Returns the
    /// balance that was replaced, or `None` if there is no such account.
    pub(crate) fn write_balance(&self, id: &str, balance: Decimal) -> Option<Decimal> {
        self.accounts.get_mut(id).map(|mut entry| {
            let previous = entry.balance;
            entry.balance = balance;
            debug!(account = id, %previous, %balance, "balance written");
            previous
        })
    }

    /// Enter the ledger-wide critical section
    ///
    /// A poisoned lock is recovered: the guarded data is `()`, and balances
    /// are only ever replaced whole, so there is no torn state to protect.
    pub(crate) fn lock_mutations(&self) -> MutexGuard<'_, ()> {
        self.mutation_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_ledger(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn sample_store() -> AccountStore {
        AccountStore::from_accounts(vec![
            Account::new("000001", "1234", "Alice", Decimal::new(10000, 1)),
            Account::new("000002", "5678", "Bob", Decimal::new(250, 0)),
        ])
    }

    #[test]
    fn test_new_creates_empty_store() {
        let store = AccountStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.accounts().is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut store = sample_store();

        let result = store.insert(Account::new("000001", "0000", "Mallory", Decimal::ZERO));

        assert_eq!(result, Err(LedgerError::duplicate_account("000001")));
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("000001").unwrap().name, "Alice");
    }

    #[test]
    fn test_from_accounts_first_duplicate_wins() {
        let store = AccountStore::from_accounts(vec![
            Account::new("000001", "1234", "Alice", Decimal::ONE),
            Account::new("000001", "9999", "Eve", Decimal::TEN),
        ]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.balance_of("000001"), Decimal::ONE);
    }

    #[test]
    fn test_lookup_and_balance_of() {
        let store = sample_store();

        let account = store.lookup("000002").unwrap();
        assert_eq!(account.name, "Bob");
        assert_eq!(store.balance_of("000002"), Decimal::new(250, 0));

        assert!(store.lookup("999999").is_none());
        assert_eq!(store.balance_of("999999"), Decimal::ZERO);
    }

    #[test]
    fn test_accounts_keeps_load_order() {
        let store = AccountStore::from_accounts(vec![
            Account::new("000003", "1", "C", Decimal::ZERO),
            Account::new("000001", "2", "A", Decimal::ZERO),
            Account::new("000002", "3", "B", Decimal::ZERO),
        ]);

        let ids: Vec<_> = store.accounts().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["000003", "000001", "000002"]);
    }

    #[test]
    fn test_verify_credential_exact_match_only() {
        let store = sample_store();

        assert!(store.verify_credential("000001", "1234").is_some());
        assert!(store.verify_credential("000001", "1234 ").is_none());
        assert!(store.verify_credential("000001", "5678").is_none());
        assert!(store.verify_credential("999999", "1234").is_none());
    }

    #[test]
    fn test_write_balance_returns_previous() {
        let store = sample_store();

        assert_eq!(
            store.write_balance("000001", Decimal::new(5, 0)),
            Some(Decimal::new(10000, 1))
        );
        assert_eq!(store.balance_of("000001"), Decimal::new(5, 0));
        assert_eq!(store.write_balance("999999", Decimal::ONE), None);
        assert!(!store.contains("999999"));
    }

    #[test]
    fn test_load_skips_malformed_lines() {
        let file = create_temp_ledger("000001 1234 TestAccount1 1000.0\n000002 5678\n");

        let store = AccountStore::load(file.path());

        assert_eq!(store.len(), 1);
        assert_eq!(store.balance_of("000001"), Decimal::new(10000, 1));
    }

    #[test]
    fn test_load_skips_bad_balance() {
        let file = create_temp_ledger("000001 1234 Alice lots\n000002 5678 Bob 3\n");

        let store = AccountStore::load(file.path());

        assert_eq!(store.len(), 1);
        assert!(store.contains("000002"));
    }

    #[test]
    fn test_save_writes_back_records_that_did_not_load() {
        let original: &[u8] = b"000001 1234 Al\xffce 1000.0\n\
000002 5678 Bob 3\n\
000003 1111 Carol NaN\n\
000004 2222 Dave Infinity\n\
000005 3333 Erin 1_000\n";
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(original).expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");

        let store = AccountStore::load(file.path());
        assert_eq!(store.len(), 1);
        assert!(store.contains("000002"));

        store.save(file.path()).unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), original.to_vec());
    }

    #[test]
    fn test_from_lines_keeps_duplicate_in_place() {
        let store = AccountStore::from_lines(vec![
            LedgerLine::from(Account::new("000001", "1234", "Alice", Decimal::ONE)),
            LedgerLine::from(Account::new("000001", "9999", "Eve", Decimal::TEN)),
            LedgerLine::from(Account::new("000002", "5678", "Bob", Decimal::ZERO)),
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.balance_of("000001"), Decimal::ONE);
        assert_eq!(
            store.lines()[1],
            LedgerLine::Verbatim(ByteRecord::from(vec!["000001", "9999", "Eve", "10"]))
        );
    }

    #[test]
    fn test_load_missing_file_yields_empty_store() {
        let store = AccountStore::load(Path::new("definitely/not/a/ledger.txt"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_try_load_missing_file_reports_io_error() {
        let result = AccountStore::try_load(Path::new("definitely/not/a/ledger.txt"));
        assert!(matches!(result, Err(LedgerError::Io { .. })));
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let store = sample_store();
        store.write_balance("000002", Decimal::new(-1275, 2));
        let file = NamedTempFile::new().expect("Failed to create temp file");

        store.save(file.path()).unwrap();
        let reloaded = AccountStore::load(file.path());

        assert_eq!(reloaded.accounts(), store.accounts());
    }

    #[test]
    fn test_save_overwrites_in_full() {
        let file = create_temp_ledger("000009 0000 Old 1\n000008 0000 Older 2\n000007 0000 Oldest 3\n");
        let store = sample_store();

        store.save(file.path()).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "000001 1234 Alice 1000.0\n000002 5678 Bob 250\n");
    }

    #[test]
    fn test_save_to_unwritable_path_is_reported() {
        let store = sample_store();
        let result = store.save(Path::new("definitely/not/a/dir/ledger.txt"));
        assert!(matches!(result, Err(LedgerError::Io { .. })));
    }
}
