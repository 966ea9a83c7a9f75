//! Concurrent scenario runner
//!
//! Reproduces the two-ATM demonstration: several tellers issue operations
//! against the same ledger at the same moment, each from its own OS thread.
//! All threads are released together through a barrier so their critical
//! windows overlap as much as possible, then every thread is joined.
//!
//! `sequential_balances` computes what the ledger would hold had the same
//! operations been applied one at a time, which is what a lost update is
//! measured against.

use crate::core::AccountStore;
use crate::strategy::{ConsistentPolicy, OperationStrategy};
use crate::types::{Account, AccountId, LedgerError};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::{Arc, Barrier};
use std::thread;
use tracing::{info, warn};

/// One teller action
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Deposit {
        account: AccountId,
        amount: Decimal,
    },
    Withdraw {
        account: AccountId,
        amount: Decimal,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    },
}

impl Operation {
    /// Issue this operation through `strategy`
    pub fn apply(&self, strategy: &dyn OperationStrategy) -> Result<(), LedgerError> {
        match self {
            Operation::Deposit { account, amount } => strategy.deposit(account, *amount),
            Operation::Withdraw { account, amount } => strategy.withdraw(account, *amount),
            Operation::Transfer { from, to, amount } => strategy.transfer(from, to, *amount),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Deposit { account, amount } => write!(f, "deposit {} into {}", amount, account),
            Operation::Withdraw { account, amount } => {
                write!(f, "withdraw {} from {}", amount, account)
            }
            Operation::Transfer { from, to, amount } => {
                write!(f, "transfer {} from {} to {}", amount, from, to)
            }
        }
    }
}

/// Result of one operation run by `run_concurrently`
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub operation: Operation,
    pub result: Result<(), LedgerError>,
}

/// Run every operation on its own thread, all released at once
///
/// Blocks until every thread has finished. Outcomes are returned in the order
/// of `operations`. A thread that panics is reported as
/// `LedgerError::Interrupted` instead of propagating the panic.
pub fn run_concurrently(
    strategy: &dyn OperationStrategy,
    operations: Vec<Operation>,
) -> Vec<OperationOutcome> {
    info!(
        policy = ?strategy.kind(),
        operations = operations.len(),
        "starting concurrent operations"
    );

    let barrier = Barrier::new(operations.len());

    let outcomes = thread::scope(|s| {
        let handles: Vec<_> = operations
            .iter()
            .map(|operation| {
                let barrier = &barrier;
                let operation = operation.clone();
                s.spawn(move || {
                    barrier.wait();
                    operation.apply(strategy)
                })
            })
            .collect();

        handles
            .into_iter()
            .zip(operations)
            .map(|(handle, operation)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(LedgerError::Interrupted {
                        operation: operation.to_string(),
                    })
                });
                OperationOutcome { operation, result }
            })
            .collect::<Vec<_>>()
    });

    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            warn!(operation = %outcome.operation, error = %e, "operation had no effect");
        }
    }

    outcomes
}

/// Balances after applying `operations` one at a time, in order
///
/// Applied through a `ConsistentPolicy` on a private copy of `accounts`.
/// Operations naming unknown accounts are skipped, exactly as they would be
/// when run concurrently.
pub fn sequential_balances(accounts: Vec<Account>, operations: &[Operation]) -> Vec<Account> {
    let store = Arc::new(AccountStore::from_accounts(accounts));
    let policy = ConsistentPolicy::new(store.clone());

    for operation in operations {
        let _ = operation.apply(&policy);
    }

    store.accounts()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{RacyConfig, RacyPolicy};
    use rstest::rstest;

    fn accounts() -> Vec<Account> {
        vec![
            Account::new("000001", "1234", "TestAccount1", Decimal::from(1000)),
            Account::new("000002", "5678", "TestAccount2", Decimal::from(500)),
        ]
    }

    fn deposit(amount: i64) -> Operation {
        Operation::Deposit {
            account: "000001".to_string(),
            amount: Decimal::from(amount),
        }
    }

    fn withdraw(amount: i64) -> Operation {
        Operation::Withdraw {
            account: "000001".to_string(),
            amount: Decimal::from(amount),
        }
    }

    #[rstest]
    #[case(deposit(100), "deposit 100 into 000001")]
    #[case(withdraw(40), "withdraw 40 from 000001")]
    #[case(
        Operation::Transfer { from: "000001".to_string(), to: "000002".to_string(), amount: Decimal::new(125, 1) },
        "transfer 12.5 from 000001 to 000002"
    )]
    fn test_operation_display(#[case] operation: Operation, #[case] expected: &str) {
        assert_eq!(operation.to_string(), expected);
    }

    #[test]
    fn test_run_concurrently_consistent() {
        let store = Arc::new(AccountStore::from_accounts(accounts()));
        let policy = ConsistentPolicy::new(store.clone());

        let outcomes = run_concurrently(&policy, vec![deposit(100), withdraw(40)]);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(outcomes[0].operation, deposit(100));
        assert_eq!(store.balance_of("000001"), Decimal::from(1060));
    }

    #[test]
    fn test_run_concurrently_reports_unknown_account() {
        let store = Arc::new(AccountStore::from_accounts(accounts()));
        let policy = ConsistentPolicy::new(store.clone());
        let unknown = Operation::Deposit {
            account: "999999".to_string(),
            amount: Decimal::ONE,
        };

        let outcomes = run_concurrently(&policy, vec![unknown, deposit(1)]);

        assert_eq!(outcomes[0].result, Err(LedgerError::account_not_found("999999")));
        assert!(outcomes[1].result.is_ok());
        assert_eq!(store.balance_of("000001"), Decimal::from(1001));
    }

    #[test]
    fn test_run_concurrently_with_no_operations() {
        let store = Arc::new(AccountStore::from_accounts(accounts()));
        let policy = ConsistentPolicy::new(store);

        assert!(run_concurrently(&policy, Vec::new()).is_empty());
    }

    #[test]
    fn test_run_concurrently_racy_loses_an_update() {
        let store = Arc::new(AccountStore::from_accounts(accounts()));
        let policy = RacyPolicy::new(store.clone(), RacyConfig::from_millis(300));

        run_concurrently(&policy, vec![deposit(100), withdraw(40)]);

        // One of the two writes is discarded; which one depends on scheduling.
        let balance = store.balance_of("000001");
        assert!(
            balance == Decimal::from(1100) || balance == Decimal::from(960),
            "unexpected balance {}",
            balance
        );
    }

    #[test]
    fn test_sequential_balances() {
        let operations = vec![
            deposit(100),
            withdraw(40),
            Operation::Transfer {
                from: "000001".to_string(),
                to: "000002".to_string(),
                amount: Decimal::from(60),
            },
            Operation::Deposit {
                account: "999999".to_string(),
                amount: Decimal::from(5),
            },
        ];

        let balances = sequential_balances(accounts(), &operations);

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].balance, Decimal::from(1000));
        assert_eq!(balances[1].balance, Decimal::from(560));
    }
}
