//! Node health monitoring
//!
//! A background loop probes every configured node with a bare TCP connect
//! under a short timeout; no payload is exchanged. The availability flag
//! is written only on a state change to keep the log quiet, and a node
//! transitioning to unavailable has its load counter zeroed so a stale
//! in-flight count cannot bias the balancer against it once it returns.

use crate::coordinator::balancer::NodeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

pub struct HealthMonitor {
    nodes: Arc<NodeSet>,
    interval: Duration,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(nodes: Arc<NodeSet>, interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            nodes,
            interval,
            probe_timeout,
        }
    }

    /// Probe every node once and record state changes.
    pub async fn sweep(&self) {
        for node in self.nodes.nodes() {
            let alive = probe(&node.addr, self.probe_timeout).await;
            if node.is_available() != alive {
                node.set_available(alive);
                if alive {
                    tracing::info!("node {} ({}) -> available", node.name, node.addr);
                } else {
                    node.reset_load();
                    tracing::warn!("node {} ({}) -> unavailable", node.name, node.addr);
                }
            }
        }
    }

    /// Run the probe loop for the life of the process. Never touches the
    /// client request path.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.sweep().await;
                tokio::time::sleep(self.interval).await;
            }
        })
    }
}

/// Bare TCP connect attempt; success means available.
pub async fn probe(addr: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::WorkerNodeConfig;
    use tokio::net::TcpListener;

    fn node_config(name: &str, addr: &str) -> WorkerNodeConfig {
        WorkerNodeConfig {
            name: name.to_string(),
            addr: addr.to_string(),
            partitions: vec!["part-1".to_string()],
        }
    }

    #[tokio::test]
    async fn test_probe() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        assert!(probe(&addr, Duration::from_secs(1)).await);

        drop(listener);
        assert!(!probe(&addr, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_sweep_marks_dead_node_and_resets_load() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live_addr = listener.local_addr().unwrap().to_string();

        let dead_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = dead_listener.local_addr().unwrap().to_string();
        drop(dead_listener);

        let nodes = Arc::new(NodeSet::from_config(&[
            node_config("live", &live_addr),
            node_config("dead", &dead_addr),
        ]));
        nodes.nodes()[1].begin_task();

        let monitor = HealthMonitor::new(
            nodes.clone(),
            Duration::from_millis(100),
            Duration::from_millis(500),
        );
        monitor.sweep().await;

        assert!(nodes.nodes()[0].is_available());
        assert!(!nodes.nodes()[1].is_available());
        assert_eq!(nodes.nodes()[1].load(), 0);
    }
}
