//! Worker node implementation
//!
//! A worker owns one or more partitions of the account space, loaded once
//! at startup from text files, and executes balance queries and transfers
//! against its private in-memory ledger under per-account locks.

pub mod ledger;
pub mod server;
pub mod txlog;

pub use ledger::Ledger;
pub use server::WorkerServer;
