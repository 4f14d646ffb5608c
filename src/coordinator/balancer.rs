//! Worker node descriptors and load-balanced selection
//!
//! The coordinator keeps one descriptor per configured worker node:
//! address, served partitions, an availability flag flipped by the health
//! monitor and the dispatch path, and a live in-flight task counter. A node
//! is picked for a task by filtering to available nodes serving the target
//! partition and taking the least loaded one.
//!
//! Several nodes may serve the same partition from independently loaded
//! copies of the data; they are never synchronized with each other, so
//! replicas drift apart as transfers land on one of them. Selection is
//! about availability and load, not about picking the freshest copy.

use crate::common::WorkerNodeConfig;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Coordinator-side view of one worker node.
#[derive(Debug)]
pub struct WorkerNode {
    pub name: String,
    pub addr: String,
    pub partitions: HashSet<String>,
    available: AtomicBool,
    load: AtomicU32,
}

impl WorkerNode {
    pub fn new(config: &WorkerNodeConfig) -> Self {
        Self {
            name: config.name.clone(),
            addr: config.addr.clone(),
            partitions: config.partitions.iter().cloned().collect(),
            available: AtomicBool::new(true),
            load: AtomicU32::new(0),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn serves(&self, partition: &str) -> bool {
        self.partitions.contains(partition)
    }

    pub fn load(&self) -> u32 {
        self.load.load(Ordering::SeqCst)
    }

    pub fn begin_task(&self) {
        self.load.fetch_add(1, Ordering::SeqCst);
    }

    /// Saturating decrement: a reset can race an in-flight completion.
    pub fn end_task(&self) {
        let _ = self
            .load
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_sub(1))
            });
    }

    /// Stale in-flight counts from a dead node must not bias selection
    /// against it once it returns.
    pub fn reset_load(&self) {
        self.load.store(0, Ordering::SeqCst);
    }
}

/// Holds a node's in-flight slot for the duration of one dispatch attempt.
pub struct LoadGuard {
    node: Arc<WorkerNode>,
}

impl LoadGuard {
    pub fn new(node: Arc<WorkerNode>) -> Self {
        node.begin_task();
        Self { node }
    }

    pub fn node(&self) -> &Arc<WorkerNode> {
        &self.node
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.node.end_task();
    }
}

/// All configured worker nodes, in configuration order.
#[derive(Debug, Default)]
pub struct NodeSet {
    nodes: Vec<Arc<WorkerNode>>,
}

impl NodeSet {
    pub fn from_config(workers: &[WorkerNodeConfig]) -> Self {
        Self {
            nodes: workers.iter().map(|w| Arc::new(WorkerNode::new(w))).collect(),
        }
    }

    pub fn nodes(&self) -> &[Arc<WorkerNode>] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Count of available nodes serving `partition`.
    pub fn replicas_for(&self, partition: &str) -> usize {
        self.nodes.iter().filter(|n| n.serves(partition)).count()
    }

    /// Pick a node for a task targeting `partition`.
    ///
    /// Available nodes serving the partition are preferred; if none exist
    /// the set relaxes to any available node so a misrouted account id is
    /// still served. Among candidates the lowest in-flight count wins and
    /// ties go to the first node in configuration order.
    pub fn select(&self, partition: &str) -> Option<Arc<WorkerNode>> {
        let eligible: Vec<&Arc<WorkerNode>> = {
            let serving: Vec<&Arc<WorkerNode>> = self
                .nodes
                .iter()
                .filter(|n| n.is_available() && n.serves(partition))
                .collect();
            if serving.is_empty() {
                self.nodes.iter().filter(|n| n.is_available()).collect()
            } else {
                serving
            }
        };

        let mut best: Option<&Arc<WorkerNode>> = None;
        for node in eligible {
            match best {
                Some(current) if node.load() >= current.load() => {}
                _ => best = Some(node),
            }
        }
        best.cloned()
    }
}
