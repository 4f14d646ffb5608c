//! Balance reconciliation
//!
//! The reconciliation loop recomputes the system-wide total balance by
//! re-reading the authoritative per-partition account files and compares
//! it against the previously recorded total. Drift beyond one cent is
//! logged as an alert with both totals and the delta; no corrective action
//! is taken. This is the only cross-cutting consistency check in the
//! system, since nothing like a distributed transaction exists between the
//! coordinator and the independently running worker copies.

use crate::common::{dataset, Money, Result};
use crate::coordinator::partition::PartitionMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Drift tolerance: one cent of monetary rounding.
const DRIFT_EPSILON: Money = Money::from_cents(1);

#[derive(Debug, Clone, Copy)]
pub struct AuditReport {
    pub previous: Option<Money>,
    pub total: Money,
    pub accounts: usize,
    pub drifted: bool,
}

pub struct AuditMonitor {
    data_dir: PathBuf,
    partitions: PartitionMap,
    last_total: Mutex<Option<Money>>,
}

impl AuditMonitor {
    pub fn new(data_dir: PathBuf, partitions: PartitionMap) -> Self {
        Self {
            data_dir,
            partitions,
            last_total: Mutex::new(None),
        }
    }

    /// One reconciliation pass over every partition file.
    pub fn run_once(&self) -> Result<AuditReport> {
        let mut total = Money::ZERO;
        let mut accounts = 0;

        for name in self.partitions.names() {
            let path = dataset::accounts_file(&self.data_dir, &name);
            if !path.exists() {
                continue;
            }
            let records = dataset::load_accounts(&path)?;
            accounts += records.len();
            total += records.iter().map(|a| a.balance).sum::<Money>();
        }

        let mut last = self.last_total.lock().unwrap();
        let previous = *last;
        let mut drifted = false;
        if let Some(previous) = previous {
            let delta = (total - previous).abs();
            if delta > DRIFT_EPSILON {
                drifted = true;
                tracing::warn!(
                    "reconciliation alert: previous total {}, current total {}, delta {}",
                    previous,
                    total,
                    delta
                );
            }
        }
        tracing::debug!("reconciliation: {} accounts, total {}", accounts, total);
        *last = Some(total);

        Ok(AuditReport {
            previous,
            total,
            accounts,
            drifted,
        })
    }

    /// Run the reconciliation loop for the life of the process. I/O errors
    /// are logged and the loop continues.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.run_once() {
                    tracing::warn!("reconciliation failed: {}", e);
                }
                tokio::time::sleep(period).await;
            }
        })
    }
}
