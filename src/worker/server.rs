//! Worker node server
//!
//! Accepts task connections from the coordinator: exactly one request
//! line in, exactly one response line out, then the connection closes. A
//! connection that closes without sending anything is a health probe and
//! is dropped silently. Per-request failures become structured error
//! responses; they never take the process down.

use crate::common::dataset;
use crate::common::proto::{self, ResponseLine, TaskLine};
use crate::common::{Error, Money, Result, WorkerConfig};
use crate::worker::ledger::Ledger;
use crate::worker::txlog::TxLog;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Cap on concurrently handled task connections.
const MAX_TASK_CONNECTIONS: usize = 256;

pub struct WorkerServer {
    config: WorkerConfig,
    listener: TcpListener,
    ledger: Arc<Ledger>,
}

impl WorkerServer {
    /// Load this node's data and bind the listener.
    pub async fn bind(config: WorkerConfig) -> Result<Self> {
        let ledger = Arc::new(load_ledger(&config)?);
        tracing::info!(
            "node {} loaded {} accounts, {} clients, {} prior transactions",
            config.node_id,
            ledger.account_count(),
            ledger.client_count(),
            ledger.log().len()
        );

        let listener = TcpListener::bind(config.bind_addr).await?;
        Ok(Self {
            config,
            listener,
            ledger,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        self.ledger.clone()
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!(
            "worker {} serving partitions {:?} on {}",
            self.config.node_id,
            self.config.partitions,
            self.local_addr()?
        );

        let permits = Arc::new(Semaphore::new(MAX_TASK_CONNECTIONS));
        loop {
            // Backpressure: stop accepting when the pool is exhausted
            let permit = permits.clone().acquire_owned().await.unwrap();
            match self.listener.accept().await {
                Ok((socket, peer)) => {
                    let ledger = self.ledger.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = handle_connection(ledger, socket).await {
                            tracing::debug!("connection {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => tracing::warn!("accept failed: {}", e),
            }
        }
    }
}

/// Build the ledger from the partition files this node is configured for.
fn load_ledger(config: &WorkerConfig) -> Result<Ledger> {
    let clients_path = dataset::clients_file(&config.data_dir);
    let clients = if clients_path.exists() {
        dataset::load_clients(&clients_path)?
    } else {
        tracing::warn!("clients file not found: {}", clients_path.display());
        HashMap::new()
    };

    let mut accounts = Vec::new();
    for partition in &config.partitions {
        let path = dataset::accounts_file(&config.data_dir, partition);
        if !path.exists() {
            tracing::warn!("partition file not found: {}", path.display());
            continue;
        }
        let records = dataset::load_accounts(&path)?;
        tracing::info!("partition {}: {} accounts", partition, records.len());
        accounts.extend(records);
    }

    let tx_path = dataset::transactions_file(&config.data_dir);
    let history = if tx_path.exists() {
        dataset::load_transactions(&tx_path)?
    } else {
        Vec::new()
    };
    let log = TxLog::with_history(history, Some(tx_path));

    Ok(Ledger::new(accounts, clients, log))
}

async fn handle_connection(ledger: Arc<Ledger>, socket: TcpStream) -> Result<()> {
    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        // Health probe: bare connect, no payload
        return Ok(());
    }

    let response = match TaskLine::parse(&line) {
        Ok(task) => {
            tracing::debug!("task {}: {}", task.task_id, task.operation);
            let response = match execute(&ledger, &task) {
                Ok(value) => ResponseLine::ok(task.task_id, value),
                Err(e) => ResponseLine::error(task.task_id, e),
            };
            response.encode()
        }
        // No task id to echo back; answer a bare error line
        Err(e) => format!("ERROR|{}", e),
    };

    write_half.write_all((response + "\n").as_bytes()).await?;
    Ok(())
}

/// Execute one operation against the ledger.
fn execute(ledger: &Ledger, task: &TaskLine) -> Result<String> {
    match task.operation.as_str() {
        proto::OP_QUERY_BALANCE => {
            let account_id = parse_account_id(task.args.first(), proto::OP_QUERY_BALANCE)?;
            Ok(ledger.balance(account_id)?.to_string())
        }
        proto::OP_TRANSFER => {
            if task.args.len() < 3 {
                return Err(Error::MissingArguments(proto::OP_TRANSFER));
            }
            let source = parse_account_id(task.args.first(), proto::OP_TRANSFER)?;
            let dest = parse_account_id(task.args.get(1), proto::OP_TRANSFER)?;
            let amount: Money = task.args[2].parse()?;
            let record = ledger.transfer(source, dest, amount)?;
            Ok(format!(
                "transfer {} completed: {} -> {} for {}",
                record.id, record.source, record.dest, record.amount
            ))
        }
        other => Err(Error::UnsupportedOperation(other.to_string())),
    }
}

fn parse_account_id(arg: Option<&String>, operation: &'static str) -> Result<u64> {
    let arg = arg.ok_or(Error::MissingArguments(operation))?;
    arg.parse()
        .map_err(|_| Error::InvalidAccountId(arg.clone()))
}
