use crate::io::ledger_format::parse_balance;
use crate::simulator::Operation;
use crate::strategy::RacyConfig;
use crate::types::is_valid_account_number;
use clap::{ArgAction, Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Run concurrent ATM operations against a ledger file
#[derive(Parser, Debug)]
#[command(name = "atm-ledger")]
#[command(about = "Run concurrent ATM operations against a ledger file", long_about = None)]
pub struct CliArgs {
    /// Ledger file path (`<id> <credential> <name> <balance>` per line)
    #[arg(value_name = "LEDGER", help = "Path to the ledger file")]
    pub ledger: PathBuf,

    /// Operation policy to use
    #[arg(
        long = "policy",
        value_name = "POLICY",
        default_value = "consistent",
        help = "Operation policy: 'consistent' serializes mutations, 'racy' reproduces lost updates"
    )]
    pub policy: PolicyKind,

    /// Account the operations are issued against
    #[arg(
        long = "account",
        value_name = "ID",
        default_value = "000001",
        value_parser = parse_account,
        help = "Six-digit account the deposits, withdrawals and transfers are issued against"
    )]
    pub account: String,

    /// Deposits to issue, each on its own thread
    #[arg(
        long = "deposit",
        value_name = "AMOUNT",
        action = ArgAction::Append,
        value_parser = parse_amount,
        help = "Deposit AMOUNT (repeatable, each runs on its own thread)"
    )]
    pub deposits: Vec<Decimal>,

    /// Withdrawals to issue, each on its own thread
    #[arg(
        long = "withdraw",
        value_name = "AMOUNT",
        action = ArgAction::Append,
        value_parser = parse_amount,
        help = "Withdraw AMOUNT (repeatable, each runs on its own thread)"
    )]
    pub withdrawals: Vec<Decimal>,

    /// Transfers to issue, each on its own thread
    #[arg(
        long = "transfer",
        value_name = "TO:AMOUNT",
        action = ArgAction::Append,
        value_parser = parse_transfer,
        help = "Transfer AMOUNT to account TO (repeatable, each runs on its own thread)"
    )]
    pub transfers: Vec<(String, Decimal)>,

    /// Simulated processing delay of the racy policy
    #[arg(
        long = "latency-ms",
        value_name = "MILLIS",
        help = "Racy policy delay between read and write (default: 1000)"
    )]
    pub latency_ms: Option<u64>,

    /// Credential to check before operating
    #[arg(
        long = "login",
        value_name = "PIN",
        help = "Check this 4-digit PIN against the account before operating"
    )]
    pub login: Option<String>,

    /// Skip writing the ledger back at shutdown
    #[arg(long = "no-save", help = "Do not write the ledger back at shutdown")]
    pub no_save: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "info",
        help = "Log level when RUST_LOG is unset (error, warn, info, debug, trace)"
    )]
    pub log_level: String,
}

/// Available operation policies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    Consistent,
    Racy,
}

impl CliArgs {
    /// Create a RacyConfig from CLI arguments
    ///
    /// Falls back to the default delay when `--latency-ms` is not given.
    pub fn to_racy_config(&self) -> RacyConfig {
        self.latency_ms
            .map(RacyConfig::from_millis)
            .unwrap_or_default()
    }

    /// The operations requested on the command line
    ///
    /// Deposits come first, then withdrawals, then transfers; they are all
    /// started together, so this order carries no meaning.
    pub fn to_operations(&self) -> Vec<Operation> {
        let deposits = self.deposits.iter().map(|&amount| Operation::Deposit {
            account: self.account.clone(),
            amount,
        });
        let withdrawals = self.withdrawals.iter().map(|&amount| Operation::Withdraw {
            account: self.account.clone(),
            amount,
        });
        let transfers = self.transfers.iter().map(|(to, amount)| Operation::Transfer {
            from: self.account.clone(),
            to: to.clone(),
            amount: *amount,
        });

        deposits.chain(withdrawals).chain(transfers).collect()
    }
}

fn parse_amount(value: &str) -> Result<Decimal, String> {
    parse_balance(value).ok_or_else(|| format!("'{}' is not a decimal amount", value))
}

fn parse_account(value: &str) -> Result<String, String> {
    if !is_valid_account_number(value) {
        return Err(format!("'{}' is not a six-digit account number", value));
    }

    Ok(value.to_string())
}

fn parse_transfer(value: &str) -> Result<(String, Decimal), String> {
    let (to, amount) = value
        .split_once(':')
        .ok_or_else(|| format!("'{}' is not of the form TO:AMOUNT", value))?;

    if to.is_empty() {
        return Err(format!("'{}' names no destination account", value));
    }

    Ok((parse_account(to)?, parse_amount(amount)?))
}
