//! Application flow behind the CLI
//!
//! Loads the ledger, optionally checks the teller's PIN, runs the requested
//! operations concurrently through the selected policy, reports the resulting
//! balances, and writes the ledger back as the shutdown checkpoint.

use crate::cli::CliArgs;
use crate::core::AccountStore;
use crate::io::write_accounts_report;
use crate::simulator::{run_concurrently, sequential_balances, OperationOutcome};
use crate::strategy::create_strategy;
use crate::types::{is_valid_pin, Account, AccountId, LedgerError};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

/// What a run did
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// One outcome per requested operation, in request order
    pub outcomes: Vec<OperationOutcome>,

    /// Final snapshot of every account, in store order
    pub accounts: Vec<Account>,

    /// Accounts whose final balance differs from applying the operations
    /// one at a time, i.e. accounts that lost an update
    pub diverged: Vec<AccountId>,

    /// Whether the ledger was written back
    pub saved: bool,
}

/// Run the CLI flow, writing the account report to `output`
///
/// # Errors
///
/// * `LedgerError::AuthenticationFailed` if `--login` was given and does not
///   match; nothing is run and the ledger is not rewritten
/// * Errors writing the report to `output`
///
/// Failing to load or save the ledger is logged but does not fail the run.
pub fn run(args: &CliArgs, output: &mut dyn Write) -> Result<RunSummary, LedgerError> {
    let store = Arc::new(AccountStore::load(&args.ledger));

    if let Some(pin) = &args.login {
        if !is_valid_pin(pin) || store.verify_credential(&args.account, pin).is_none() {
            warn!(account = %args.account, "login rejected");
            return Err(LedgerError::AuthenticationFailed {
                id: args.account.clone(),
            });
        }
        info!(account = %args.account, "login accepted");
    }

    let strategy = create_strategy(args.policy, store.clone(), Some(args.to_racy_config()));
    let operations = args.to_operations();
    let expected = sequential_balances(store.accounts(), &operations);

    let outcomes = run_concurrently(strategy.as_ref(), operations);

    let accounts = store.accounts();
    let diverged: Vec<AccountId> = accounts
        .iter()
        .zip(&expected)
        .filter(|(actual, expected)| actual.balance != expected.balance)
        .map(|(actual, expected)| {
            warn!(
                account = %actual.id,
                expected = %expected.balance,
                actual = %actual.balance,
                "lost update: balance differs from sequential application"
            );
            actual.id.clone()
        })
        .collect();

    write_accounts_report(&accounts, output)?;

    let saved = !args.no_save && store.save(&args.ledger).is_ok();

    Ok(RunSummary {
        outcomes,
        accounts,
        diverged,
        saved,
    })
}
