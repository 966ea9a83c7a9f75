//! Streaming ledger reader with iterator interface
//!
//! Provides a streaming iterator over account records from a persisted ledger.
//! Delegates format concerns to the ledger_format module.
//!
//! # Design
//!
//! The LedgerReader wraps a csv::Reader configured for the ledger format
//! (space delimiter, no header, no quoting, flexible field counts) and yields
//! one `LedgerLine` per four-field record.
//!
//! # Malformed Records
//!
//! - Lines that do not split into exactly four fields are skipped silently
//!   (logged at debug level and counted in `skipped()`)
//! - Four-field records that are not UTF-8 or whose balance is not a decimal
//!   number are yielded as `LedgerLine::Verbatim` with their raw bytes
//!   (logged as a warning and counted in `verbatim()`)
//! - Underlying I/O errors are yielded as `Err` and end the iteration

use crate::io::ledger_format::{
    convert_ledger_record, field_count, LedgerLine, LedgerRecord, LEDGER_DELIMITER, LEDGER_FIELDS,
};
use crate::types::{Account, LedgerError};
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Streaming ledger reader
///
/// # Examples
///
/// ```no_run
/// use atm_ledger::io::LedgerReader;
/// use std::path::Path;
///
/// let reader = LedgerReader::from_path(Path::new("data.txt")).unwrap();
/// let lines: Vec<_> = reader.filter_map(Result::ok).collect();
/// println!("Read {} ledger lines", lines.len());
/// ```
#[derive(Debug)]
pub struct LedgerReader<R> {
    reader: csv::Reader<R>,
    record: ByteRecord,
    skipped: usize,
    verbatim: usize,
    failed: bool,
}

impl LedgerReader<File> {
    /// Open a ledger file for streaming iteration
    ///
    /// # Returns
    ///
    /// * `Ok(LedgerReader)` if the file opened successfully
    /// * `Err(LedgerError::Io)` if the file could not be opened
    pub fn from_path(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| LedgerError::Io {
            message: format!("Failed to open ledger '{}': {}", path.display(), e),
        })?;

        Ok(Self::from_reader(file))
    }
}

impl<R: Read> LedgerReader<R> {
    /// Wrap any reader producing ledger text
    pub fn from_reader(input: R) -> Self {
        let reader = ReaderBuilder::new()
            .delimiter(LEDGER_DELIMITER)
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .buffer_capacity(8 * 1024)
            .from_reader(input);

        Self {
            reader,
            record: ByteRecord::new(),
            skipped: 0,
            verbatim: 0,
            failed: false,
        }
    }

    /// Number of lines skipped so far because of a wrong field count
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of four-field records so far that could not be loaded
    pub fn verbatim(&self) -> usize {
        self.verbatim
    }

    /// Decode the current record, which has exactly four fields
    fn decode(&self, line: u64) -> Result<Account, LedgerError> {
        let record = StringRecord::from_byte_record(self.record.clone()).map_err(|e| {
            LedgerError::Parse {
                line: Some(line),
                message: e.utf8_error().to_string(),
            }
        })?;

        let record = record.deserialize::<LedgerRecord>(None)?;
        convert_ledger_record(record, line)
    }
}

impl<R: Read> Iterator for LedgerReader<R> {
    type Item = Result<LedgerLine, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            match self.reader.read_byte_record(&mut self.record) {
                Ok(false) => return None,
                Ok(true) => {}
                Err(e) => {
                    self.failed = e.is_io_error();
                    return Some(Err(e.into()));
                }
            }

            let line = self.record.position().map_or(0, |pos| pos.line());
            let fields = field_count(&self.record);

            if fields != LEDGER_FIELDS {
                debug!(line, fields, "skipping malformed ledger record");
                self.skipped += 1;
                continue;
            }

            self.record.truncate(LEDGER_FIELDS);
            let parsed = match self.decode(line) {
                Ok(account) => LedgerLine::Account(account),
                Err(e) => {
                    warn!(line, error = %e, "ledger record not loaded, keeping it verbatim");
                    self.verbatim += 1;
                    LedgerLine::Verbatim(self.record.clone())
                }
            };

            return Some(Ok(parsed));
        }
    }
}
