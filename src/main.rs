//! ATM Ledger CLI
//!
//! Runs ATM operations concurrently against a ledger file and prints the
//! resulting balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- data.txt --deposit 100 --withdraw 40
//! cargo run -- data.txt --policy racy --deposit 100 --withdraw 40
//! cargo run -- data.txt --policy racy --latency-ms 200 --deposit 10 --deposit 10
//! cargo run -- data.txt --login 1234 --transfer 000002:25
//! ```
//!
//! Every requested operation runs on its own thread and all of them start at
//! the same moment. The final balances are written to stdout as CSV and the
//! ledger file is rewritten unless `--no-save` is given. Logs go to stderr.
//!
//! # Policies
//!
//! - **consistent**: mutations are serialized, no update is lost (default)
//! - **racy**: read, wait, write; overlapping operations lose updates
//!
//! # Exit Codes
//!
//! - 0: Success (an unreadable ledger or a failed save is logged, not fatal)
//! - 1: Error (bad arguments, rejected login, report not writable)

use atm_ledger::{app, cli, logging};
use std::process;

fn main() {
    // Parse command-line arguments using clap
    let args = cli::parse_args();

    logging::init(&args.log_level);

    // Report goes to stdout
    let mut output = std::io::stdout();
    if let Err(e) = app::run(&args, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
