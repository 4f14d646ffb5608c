//! Partition routing
//!
//! The account id space is split into contiguous, equally sized ranges,
//! one per partition. Routing is a pure function of the account id and the
//! configured range, so the coordinator and every worker compute the same
//! answer independently, including across restarts.

use crate::common::CoordinatorConfig;

/// Maps an account id to the name of the partition owning it.
#[derive(Debug, Clone, Copy)]
pub struct PartitionMap {
    base_id: u64,
    bucket_size: u64,
    num_partitions: u32,
}

impl PartitionMap {
    pub fn new(base_id: u64, total_span: u64, num_partitions: u32) -> Self {
        let bucket_size = (total_span / num_partitions as u64).max(1);
        Self {
            base_id,
            bucket_size,
            num_partitions,
        }
    }

    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(
            config.base_account_id,
            config.total_accounts,
            config.num_partitions,
        )
    }

    /// Partition owning `account_id`.
    ///
    /// Ids outside the configured range are clamped rather than rejected:
    /// below-range ids land on the first partition, above-range ids on the
    /// last, so malformed ids still route somewhere deterministic.
    pub fn partition_for(&self, account_id: u64) -> String {
        let index = account_id.saturating_sub(self.base_id) / self.bucket_size;
        Self::partition_name(index.min(self.num_partitions as u64 - 1) as u32)
    }

    /// Canonical name of the partition at `index` (zero-based).
    pub fn partition_name(index: u32) -> String {
        format!("part-{}", index + 1)
    }

    /// All partition names, in order.
    pub fn names(&self) -> impl Iterator<Item = String> {
        (0..self.num_partitions).map(Self::partition_name)
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }
}
