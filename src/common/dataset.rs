//! Pipe-delimited data files
//!
//! A worker node loads its data once at startup from plain text files:
//! clients as `id|name|email|phone`, accounts per partition as
//! `accountId|clientId|balance|accountType`, transactions as
//! `id|sourceId|destId|amount|timestamp|status`. The coordinator's
//! reconciliation monitor re-reads the same account files, which makes
//! them the authoritative store for the system-wide balance.
//!
//! Loaders are tolerant: blank lines are ignored and malformed lines are
//! logged and skipped, never fatal.

use crate::common::{Error, Money, Result};
use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Read-only client reference data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl FromStr for ClientRecord {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('|').collect();
        if fields.len() < 4 {
            return Err(Error::InvalidRecord(line.trim().to_string()));
        }
        Ok(Self {
            id: fields[0]
                .parse()
                .map_err(|_| Error::InvalidRecord(line.trim().to_string()))?,
            name: fields[1].to_string(),
            email: fields[2].to_string(),
            phone: fields[3].to_string(),
        })
    }
}

impl ClientRecord {
    pub fn to_line(&self) -> String {
        format!("{}|{}|{}|{}", self.id, self.name, self.email, self.phone)
    }
}

/// One account as stored in a partition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub account_id: u64,
    pub client_id: u32,
    pub balance: Money,
    pub kind: String,
}

impl FromStr for AccountRecord {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('|').collect();
        if fields.len() < 4 {
            return Err(Error::InvalidRecord(line.trim().to_string()));
        }
        let invalid = || Error::InvalidRecord(line.trim().to_string());
        Ok(Self {
            account_id: fields[0].parse().map_err(|_| invalid())?,
            client_id: fields[1].parse().map_err(|_| invalid())?,
            balance: fields[2].parse().map_err(|_| invalid())?,
            kind: fields[3].to_string(),
        })
    }
}

impl AccountRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.account_id, self.client_id, self.balance, self.kind
        )
    }
}

/// Status tag of a transaction record. The core only ever produces
/// `Confirmed`; anything else in a loaded file is a data error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Confirmed,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Confirmed => write!(f, "Confirmed"),
        }
    }
}

impl FromStr for TxStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Confirmed" => Ok(TxStatus::Confirmed),
            other => Err(Error::InvalidRecord(format!("bad status: {}", other))),
        }
    }
}

/// One completed transfer, append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: u64,
    pub source: u64,
    pub dest: u64,
    pub amount: Money,
    pub timestamp: String,
    pub status: TxStatus,
}

impl FromStr for TransactionRecord {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('|').collect();
        if fields.len() < 6 {
            return Err(Error::InvalidRecord(line.trim().to_string()));
        }
        let invalid = || Error::InvalidRecord(line.trim().to_string());
        Ok(Self {
            id: fields[0].parse().map_err(|_| invalid())?,
            source: fields[1].parse().map_err(|_| invalid())?,
            dest: fields[2].parse().map_err(|_| invalid())?,
            amount: fields[3].parse().map_err(|_| invalid())?,
            timestamp: fields[4].to_string(),
            status: fields[5].parse()?,
        })
    }
}

impl TransactionRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.id, self.source, self.dest, self.amount, self.timestamp, self.status
        )
    }
}

// === File layout ===

pub fn clients_file(data_dir: &Path) -> PathBuf {
    data_dir.join("clients").join("clients.txt")
}

pub fn accounts_file(data_dir: &Path, partition: &str) -> PathBuf {
    data_dir
        .join(partition)
        .join(format!("accounts_{}.txt", partition))
}

pub fn transactions_file(data_dir: &Path) -> PathBuf {
    data_dir.join("transactions").join("transactions.txt")
}

// === Loaders ===

fn read_records<T: FromStr<Err = Error>>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse() {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("skipping bad line in {}: {}", path.display(), e),
        }
    }
    Ok(records)
}

pub fn load_clients(path: &Path) -> Result<HashMap<u32, ClientRecord>> {
    let records: Vec<ClientRecord> = read_records(path)?;
    Ok(records.into_iter().map(|c| (c.id, c)).collect())
}

pub fn load_accounts(path: &Path) -> Result<Vec<AccountRecord>> {
    read_records(path)
}

pub fn load_transactions(path: &Path) -> Result<Vec<TransactionRecord>> {
    read_records(path)
}

/// Append one confirmed transfer to the transactions file.
pub fn append_transaction(path: &Path, record: &TransactionRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", record.to_line())?;
    Ok(())
}
