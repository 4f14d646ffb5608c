//! Account ledger
//!
//! In-memory account store owned exclusively by one worker process. Every
//! account carries its own lock; a balance read holds only that account's
//! lock, and a transfer takes both account locks in ascending account id
//! order and releases them in reverse, which rules out deadlock between
//! opposing transfers. The transaction log has its own lock, taken only
//! after the account locks.
//!
//! The sum of all balances in one ledger is conserved across any sequence
//! of successful transfers it executes.

use crate::common::dataset::{AccountRecord, ClientRecord, TransactionRecord};
use crate::common::{Error, Money, Result};
use crate::worker::txlog::TxLog;
use std::collections::HashMap;
use std::sync::Mutex;

/// One account: fixed reference fields plus a locked balance.
#[derive(Debug)]
pub struct Account {
    pub client_id: u32,
    pub kind: String,
    balance: Mutex<Money>,
}

pub struct Ledger {
    accounts: HashMap<u64, Account>,
    clients: HashMap<u32, ClientRecord>,
    log: TxLog,
}

impl Ledger {
    pub fn new(
        accounts: Vec<AccountRecord>,
        clients: HashMap<u32, ClientRecord>,
        log: TxLog,
    ) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|record| {
                (
                    record.account_id,
                    Account {
                        client_id: record.client_id,
                        kind: record.kind,
                        balance: Mutex::new(record.balance),
                    },
                )
            })
            .collect();
        Self {
            accounts,
            clients,
            log,
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Current balance, read under the account's lock and nothing else.
    pub fn balance(&self, account_id: u64) -> Result<Money> {
        let account = self
            .accounts
            .get(&account_id)
            .ok_or(Error::AccountNotFound(account_id))?;
        let balance = account.balance.lock().unwrap();
        Ok(*balance)
    }

    /// Move `amount` from `source` to `dest` and append a transaction
    /// record.
    ///
    /// Validation happens before any lock is taken. Both balances change
    /// under both locks, so no observer following the same discipline can
    /// see only one side of the transfer. Insufficient funds is a reported
    /// error with nothing mutated.
    pub fn transfer(&self, source: u64, dest: u64, amount: Money) -> Result<TransactionRecord> {
        if !amount.is_positive() {
            return Err(Error::NonPositiveAmount);
        }
        if source == dest {
            return Err(Error::SameAccount);
        }
        let src = self
            .accounts
            .get(&source)
            .ok_or(Error::SourceNotFound(source))?;
        let dst = self
            .accounts
            .get(&dest)
            .ok_or(Error::DestinationNotFound(dest))?;

        // Lock order is ascending account id, never source-then-dest.
        // Guards drop in reverse declaration order, releasing in reverse.
        let (first, second) = if source < dest { (src, dst) } else { (dst, src) };
        let mut first_balance = first.balance.lock().unwrap();
        let mut second_balance = second.balance.lock().unwrap();
        let (src_balance, dst_balance) = if source < dest {
            (&mut *first_balance, &mut *second_balance)
        } else {
            (&mut *second_balance, &mut *first_balance)
        };

        if *src_balance < amount {
            return Err(Error::InsufficientFunds {
                available: *src_balance,
            });
        }
        *src_balance -= amount;
        *dst_balance += amount;

        // The log lock nests strictly inside the account locks.
        Ok(self.log.append(source, dest, amount))
    }

    /// Sum of every balance in this ledger.
    pub fn total_balance(&self) -> Money {
        self.accounts
            .values()
            .map(|account| *account.balance.lock().unwrap())
            .sum()
    }

    pub fn log(&self) -> &TxLog {
        &self.log
    }
}
