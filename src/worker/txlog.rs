//! Transaction log
//!
//! Append-only record of confirmed transfers, totally ordered by a
//! dedicated lock that also hands out the per-node transaction id
//! sequence. Appends mirror to the node's transactions file when one is
//! configured; a file write failure is logged and never fails the
//! transfer that produced the record.

use crate::common::dataset::{self, TransactionRecord, TxStatus};
use crate::common::Money;
use std::path::PathBuf;
use std::sync::Mutex;

struct TxLogInner {
    next_id: u64,
    records: Vec<TransactionRecord>,
}

pub struct TxLog {
    inner: Mutex<TxLogInner>,
    file: Option<PathBuf>,
}

impl TxLog {
    pub fn new() -> Self {
        Self::with_history(Vec::new(), None)
    }

    /// Start from previously loaded records; new ids continue after the
    /// highest id seen.
    pub fn with_history(records: Vec<TransactionRecord>, file: Option<PathBuf>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            inner: Mutex::new(TxLogInner { next_id, records }),
            file,
        }
    }

    pub fn append(&self, source: u64, dest: u64, amount: Money) -> TransactionRecord {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut inner = self.inner.lock().unwrap();
        let record = TransactionRecord {
            id: inner.next_id,
            source,
            dest,
            amount,
            timestamp,
            status: TxStatus::Confirmed,
        };
        inner.next_id += 1;
        inner.records.push(record.clone());

        if let Some(path) = &self.file {
            if let Err(e) = dataset::append_transaction(path, &record) {
                tracing::warn!(
                    "failed to persist transaction {} to {}: {}",
                    record.id,
                    path.display(),
                    e
                );
            }
        }

        record
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the records appended so far, in id order.
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.inner.lock().unwrap().records.clone()
    }
}

impl Default for TxLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let log = TxLog::new();
        let a = log.append(101, 102, Money::parse("10.00").unwrap());
        let b = log.append(102, 101, Money::parse("5.00").unwrap());
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.status, TxStatus::Confirmed);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_ids_continue_from_history() {
        let history = vec![TransactionRecord {
            id: 41,
            source: 101,
            dest: 102,
            amount: Money::parse("1.00").unwrap(),
            timestamp: "2026-08-07 12:00:00".to_string(),
            status: TxStatus::Confirmed,
        }];
        let log = TxLog::with_history(history, None);
        assert_eq!(log.append(102, 103, Money::parse("2.00").unwrap()).id, 42);
    }

    #[test]
    fn test_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dataset::transactions_file(dir.path());
        let log = TxLog::with_history(Vec::new(), Some(path.clone()));
        log.append(101, 102, Money::parse("25.00").unwrap());
        log.append(101, 103, Money::parse("30.00").unwrap());

        let persisted = dataset::load_transactions(&path).unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[1].dest, 103);
    }
}
