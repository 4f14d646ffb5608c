//! Request statistics
//!
//! Cheap cumulative counters bumped on the request path and reported by a
//! periodic background task. The reporter stays silent until there has
//! been traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct Stats {
    queries: AtomicU64,
    transfers: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub queries: u64,
    pub transfers: u64,
    pub errors: u64,
}

impl StatsSnapshot {
    pub fn total(&self) -> u64 {
        self.queries + self.transfers
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transfer(&self) {
        self.transfers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            transfers: self.transfers.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn spawn_reporter(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        let stats = self;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let snapshot = stats.snapshot();
                if snapshot.total() > 0 {
                    tracing::info!(
                        "stats: queries={}, transfers={}, errors={}, total={}",
                        snapshot.queries,
                        snapshot.transfers,
                        snapshot.errors,
                        snapshot.total()
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = Stats::new();
        stats.record_query();
        stats.record_query();
        stats.record_transfer();
        stats.record_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.queries, 2);
        assert_eq!(snapshot.transfers, 1);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.total(), 3);
    }
}
