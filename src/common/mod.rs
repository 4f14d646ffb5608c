//! Common utilities and types shared across minibank

pub mod config;
pub mod dataset;
pub mod error;
pub mod money;
pub mod proto;

pub use config::{Config, CoordinatorConfig, WorkerConfig, WorkerNodeConfig};
pub use error::{Error, Result};
pub use money::Money;
