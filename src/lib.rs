//! # minibank
//!
//! A distributed, partitioned bank-account ledger:
//! - Central coordinator routing queries and transfers to worker nodes
//! - Range partitioning of the account id space with replicated serving
//! - Least-loaded node selection with failover on connection failure
//! - Deadlock-free concurrent transfers via ordered per-account locking
//! - Periodic system-wide balance reconciliation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  REQUEST|op|args   ┌──────────────────────────┐
//! │  Client   │ ─────────────────▶ │       Coordinator        │
//! └──────────┘  one line back     │  router · balancer ·     │
//!                                 │  registry · monitors     │
//!                                 └──────┬───────────┬───────┘
//!                    TASK|id|op|args     │           │
//!                       ┌────────────────┘           └──────────┐
//!                ┌──────▼───────┐                       ┌───────▼──────┐
//!                │  Worker 1    │                       │  Worker 2    │
//!                │ part-1..3    │                       │ part-1,3,4   │
//!                │ (own ledger) │                       │ (own ledger) │
//!                └──────────────┘                       └──────────────┘
//! ```
//!
//! Workers serving the same partition each load their own copy of the
//! data and are never synchronized; replicas drift as traffic lands on
//! one of them, and the reconciliation monitor only observes the files.
//!
//! ## Usage
//!
//! ### Seed the demo dataset
//! ```bash
//! minibank-coord seed --data ./data
//! ```
//!
//! ### Start a worker node
//! ```bash
//! minibank-worker serve --id worker-1 --bind 0.0.0.0:9101 \
//!   --data ./data --partitions part-1,part-2,part-3
//! ```
//!
//! ### Start the coordinator
//! ```bash
//! minibank-coord serve --bind 0.0.0.0:9000 --config minibank.toml
//! ```
//!
//! ### Use the client
//! ```bash
//! minibank balance 101
//! minibank transfer 101 102 500.00
//! minibank load-test 3 --count 100
//! ```

pub mod common;
pub mod coordinator;
pub mod worker;

// Re-export commonly used types
pub use common::{Config, Error, Money, Result};
pub use coordinator::Coordinator;
pub use worker::WorkerServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
