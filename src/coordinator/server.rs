//! Coordinator server
//!
//! Accepts client connections, turns each request line into a task,
//! dispatches it to a worker node picked by the load balancer, and relays
//! the single response line back. Dispatch retries against other nodes
//! under a bounded attempt budget; the client-facing wait is cut off by a
//! hard timeout.

use crate::common::proto::{self, ClientRequest, ResponseLine, TaskLine};
use crate::common::{CoordinatorConfig, Error, Result};
use crate::coordinator::audit::AuditMonitor;
use crate::coordinator::balancer::{LoadGuard, NodeSet};
use crate::coordinator::health::HealthMonitor;
use crate::coordinator::partition::PartitionMap;
use crate::coordinator::registry::TaskRegistry;
use crate::coordinator::stats::Stats;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Cap on concurrently handled client connections.
const MAX_CLIENT_CONNECTIONS: usize = 256;

pub struct Coordinator {
    listener: TcpListener,
    shared: Arc<Shared>,
}

struct Shared {
    config: CoordinatorConfig,
    partitions: PartitionMap,
    nodes: Arc<NodeSet>,
    registry: TaskRegistry,
    stats: Arc<Stats>,
    audit: Arc<AuditMonitor>,
}

impl Coordinator {
    pub async fn bind(config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr).await?;
        let partitions = PartitionMap::from_config(&config);
        let nodes = Arc::new(NodeSet::from_config(&config.workers));

        // A partition with a single serving node loses all traffic the
        // moment that node dies.
        for name in partitions.names() {
            let replicas = nodes.replicas_for(&name);
            if replicas < 2 {
                tracing::warn!("partition {} is served by {} node(s)", name, replicas);
            }
        }

        let audit = Arc::new(AuditMonitor::new(config.data_dir.clone(), partitions));
        let shared = Arc::new(Shared {
            config,
            partitions,
            nodes,
            registry: TaskRegistry::new(),
            stats: Arc::new(Stats::new()),
            audit,
        });

        Ok(Self { listener, shared })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn serve(self) -> Result<()> {
        let config = &self.shared.config;
        tracing::info!("starting coordinator on {}", self.local_addr()?);
        tracing::info!("  partitions: {}", self.shared.partitions.num_partitions());
        tracing::info!("  worker nodes: {}", self.shared.nodes.nodes().len());
        tracing::info!("  task timeout: {:?}", config.task_timeout());

        // Process-scoped background loops; no shutdown required.
        let _health = HealthMonitor::new(
            self.shared.nodes.clone(),
            config.health_interval(),
            config.probe_timeout(),
        )
        .spawn();
        let _audit = self.shared.audit.clone().spawn(config.audit_interval());
        let _stats = self
            .shared
            .stats
            .clone()
            .spawn_reporter(config.stats_interval());

        tracing::info!("coordinator ready");
        let permits = Arc::new(Semaphore::new(MAX_CLIENT_CONNECTIONS));
        loop {
            // Backpressure: stop accepting when the pool is exhausted
            let permit = permits.clone().acquire_owned().await.unwrap();
            match self.listener.accept().await {
                Ok((socket, peer)) => {
                    let shared = self.shared.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        // One client's failure never affects another.
                        if let Err(e) = handle_client(shared, socket).await {
                            tracing::debug!("client {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => tracing::warn!("accept failed: {}", e),
            }
        }
    }
}

async fn handle_client(shared: Arc<Shared>, socket: TcpStream) -> Result<()> {
    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        shared.stats.record_error();
        let response = ResponseLine::error(shared.registry.next_task_id(), "no request received");
        write_half
            .write_all((response.encode() + "\n").as_bytes())
            .await?;
        return Ok(());
    }

    let request = match ClientRequest::parse(&line) {
        Ok(request) => request,
        Err(_) => {
            shared.stats.record_error();
            let response =
                ResponseLine::error(shared.registry.next_task_id(), "invalid request format");
            write_half
                .write_all((response.encode() + "\n").as_bytes())
                .await?;
            return Ok(());
        }
    };

    match request.operation.as_str() {
        proto::OP_QUERY_BALANCE => shared.stats.record_query(),
        proto::OP_TRANSFER => shared.stats.record_transfer(),
        _ => {}
    }

    let (task_id, receiver) = shared.registry.register(&request.operation);
    let task = TaskLine {
        task_id,
        operation: request.operation.clone(),
        args: request.args,
    };
    tokio::spawn(dispatch_task(shared.clone(), task));

    // Hard deadline on the client-facing wait. Expiry completes the task
    // with a timeout error but does not cancel the in-flight worker call,
    // so a transfer may still land after the client saw this error.
    let response = match tokio::time::timeout(shared.config.task_timeout(), receiver).await {
        Ok(Ok(response)) => response,
        Ok(Err(_)) => {
            shared.stats.record_error();
            ResponseLine::error(task_id, Error::Internal("task abandoned".into())).encode()
        }
        Err(_) => {
            shared.stats.record_error();
            ResponseLine::error(task_id, Error::TaskTimeout).encode()
        }
    };
    shared.registry.remove(task_id);

    write_half
        .write_all((response.clone() + "\n").as_bytes())
        .await?;

    // A successful transfer moved money; reconcile now rather than waiting
    // for the periodic pass.
    if request.operation == proto::OP_TRANSFER && is_ok_response(&response) {
        let audit = shared.audit.clone();
        tokio::spawn(async move {
            if let Err(e) = audit.run_once() {
                tracing::warn!("post-transfer reconciliation failed: {}", e);
            }
        });
    }

    Ok(())
}

fn is_ok_response(line: &str) -> bool {
    ResponseLine::parse(line)
        .map(|r| r.result.is_ok())
        .unwrap_or(false)
}

/// Dispatch a task under a bounded retry budget.
///
/// A connection failure marks the node unavailable and the next attempt
/// goes to a different node. The retry is at-least-once: a node that was
/// slow rather than dead may still apply a transfer the coordinator has
/// already re-dispatched elsewhere. The wire protocol carries no
/// idempotency token, so this gap is documented rather than closed.
async fn dispatch_task(shared: Arc<Shared>, task: TaskLine) {
    let partition = target_partition(&shared, &task);

    for attempt in 1..=shared.config.max_dispatch_attempts {
        let Some(node) = shared.nodes.select(&partition) else {
            break;
        };
        let _guard = LoadGuard::new(node.clone());

        match send_to_node(&node.addr, &task).await {
            Ok(response) => {
                shared.registry.complete(task.task_id, response);
                return;
            }
            Err(e) => {
                tracing::warn!(
                    "dispatch attempt {}/{} for task {} to node {} failed: {}",
                    attempt,
                    shared.config.max_dispatch_attempts,
                    task.task_id,
                    node.name,
                    e
                );
                if node.is_available() {
                    node.set_available(false);
                    node.reset_load();
                }
            }
        }
    }

    shared.stats.record_error();
    tracing::warn!("no node available for task {}", task.task_id);
    shared.registry.complete(
        task.task_id,
        ResponseLine::error(task.task_id, Error::NoNodeAvailable).encode(),
    );
}

/// Route on the first operand when it parses as an account id; anything
/// else defaults to the first partition, as good a home as any for a
/// request the worker will reject.
fn target_partition(shared: &Shared, task: &TaskLine) -> String {
    match task.args.first().and_then(|a| a.parse::<u64>().ok()) {
        Some(account_id) => shared.partitions.partition_for(account_id),
        None => PartitionMap::partition_name(0),
    }
}

async fn send_to_node(addr: &str, task: &TaskLine) -> Result<String> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| Error::ConnectionFailed(format!("{}: {}", addr, e)))?;
    let (read_half, mut write_half) = stream.into_split();

    write_half
        .write_all((task.encode() + "\n").as_bytes())
        .await?;

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(Error::EmptyResponse);
    }
    Ok(line.trim_end().to_string())
}
