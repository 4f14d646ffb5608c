//! Configuration for minibank components

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration, loaded from a TOML file plus `MINIBANK_`-prefixed
/// environment variables. Binaries override individual fields from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Coordinator-specific config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<CoordinatorConfig>,

    /// Worker-specific config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerConfig>,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from `path` (or `minibank.toml` in the working
    /// directory if not given) merged with environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("minibank").required(false)),
        };
        builder
            .add_source(config::Environment::with_prefix("MINIBANK").separator("__"))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

/// Static description of one worker node as the coordinator knows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerNodeConfig {
    /// Node name, used in logs and for deterministic tie-breaking
    pub name: String,

    /// TCP address the node listens on
    pub addr: String,

    /// Partitions this node serves
    pub partitions: Vec<String>,
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address for client requests
    #[serde(default = "default_coord_bind")]
    pub bind_addr: SocketAddr,

    /// Directory holding the partitioned data files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Number of partitions the account id space is split into
    #[serde(default = "default_num_partitions")]
    pub num_partitions: u32,

    /// First account id in the configured range
    #[serde(default = "default_base_account_id")]
    pub base_account_id: u64,

    /// Size of the account id range covered by all partitions together
    #[serde(default = "default_total_accounts")]
    pub total_accounts: u64,

    /// Hard deadline for a client-facing task wait
    #[serde(default = "default_task_timeout")]
    pub task_timeout_ms: u64,

    /// Dispatch attempts before a task fails with "no node available"
    #[serde(default = "default_max_dispatch_attempts")]
    pub max_dispatch_attempts: u32,

    /// Health probe loop period
    #[serde(default = "default_health_interval")]
    pub health_interval_ms: u64,

    /// Timeout of a single health probe connection attempt
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Reconciliation loop period
    #[serde(default = "default_audit_interval")]
    pub audit_interval_ms: u64,

    /// Statistics report period
    #[serde(default = "default_stats_interval")]
    pub stats_interval_ms: u64,

    /// Configured worker nodes, in tie-break order
    #[serde(default)]
    pub workers: Vec<WorkerNodeConfig>,
}

fn default_coord_bind() -> SocketAddr {
    "0.0.0.0:9000".parse().unwrap()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_num_partitions() -> u32 {
    4
}
fn default_base_account_id() -> u64 {
    101
}
fn default_total_accounts() -> u64 {
    5000
}
fn default_task_timeout() -> u64 {
    30_000
}
fn default_max_dispatch_attempts() -> u32 {
    3
}
fn default_health_interval() -> u64 {
    3_000
}
fn default_probe_timeout() -> u64 {
    1_500
}
fn default_audit_interval() -> u64 {
    60_000
}
fn default_stats_interval() -> u64 {
    30_000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_coord_bind(),
            data_dir: default_data_dir(),
            num_partitions: default_num_partitions(),
            base_account_id: default_base_account_id(),
            total_accounts: default_total_accounts(),
            task_timeout_ms: default_task_timeout(),
            max_dispatch_attempts: default_max_dispatch_attempts(),
            health_interval_ms: default_health_interval(),
            probe_timeout_ms: default_probe_timeout(),
            audit_interval_ms: default_audit_interval(),
            stats_interval_ms: default_stats_interval(),
            workers: Vec::new(),
        }
    }
}

impl CoordinatorConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn audit_interval(&self) -> Duration {
        Duration::from_millis(self.audit_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_partitions == 0 {
            return Err(Error::InvalidConfig("num_partitions must be >= 1".into()));
        }
        if self.total_accounts < self.num_partitions as u64 {
            return Err(Error::InvalidConfig(
                "total_accounts must cover at least one account per partition".into(),
            ));
        }
        if self.max_dispatch_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_dispatch_attempts must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Worker node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Node name (unique identifier)
    #[serde(default = "default_worker_id")]
    pub node_id: String,

    /// Bind address for task requests
    #[serde(default = "default_worker_bind")]
    pub bind_addr: SocketAddr,

    /// Directory holding the partitioned data files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Partitions this node loads and serves
    #[serde(default)]
    pub partitions: Vec<String>,
}

fn default_worker_id() -> String {
    "worker-1".to_string()
}
fn default_worker_bind() -> SocketAddr {
    "0.0.0.0:9101".parse().unwrap()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            node_id: default_worker_id(),
            bind_addr: default_worker_bind(),
            data_dir: default_data_dir(),
            partitions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_with_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[coordinator]
bind_addr = "127.0.0.1:9500"

[[coordinator.workers]]
name = "node-1"
addr = "127.0.0.1:9101"
partitions = ["part-1", "part-2"]
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        let coord = config.coordinator.unwrap();
        assert_eq!(coord.bind_addr, "127.0.0.1:9500".parse().unwrap());
        assert_eq!(coord.num_partitions, 4);
        assert_eq!(coord.task_timeout(), Duration::from_secs(30));
        assert_eq!(coord.workers.len(), 1);
        assert_eq!(coord.workers[0].partitions, vec!["part-1", "part-2"]);
        assert!(config.worker.is_none());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validate() {
        let mut coord = CoordinatorConfig::default();
        assert!(coord.validate().is_ok());

        coord.num_partitions = 0;
        assert!(coord.validate().is_err());

        coord.num_partitions = 4;
        coord.total_accounts = 2;
        assert!(coord.validate().is_err());
    }
}
