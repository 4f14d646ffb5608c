//! Thin client for the minibank coordinator
//!
//! Issues a single request per connection and prints the response line,
//! or runs a concurrent load test mixing queries and transfers.

use clap::{Parser, Subcommand};
use minibank::common::proto::{ClientRequest, OP_QUERY_BALANCE, OP_TRANSFER};
use minibank::common::Money;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;

#[derive(Parser)]
#[command(name = "minibank")]
#[command(about = "minibank client")]
struct Cli {
    /// Coordinator address
    #[arg(long, global = true, default_value = "127.0.0.1:9000")]
    coordinator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query an account balance
    Balance {
        /// Account id
        account: u64,
    },
    /// Transfer funds between two accounts
    Transfer {
        /// Source account id
        source: u64,
        /// Destination account id
        dest: u64,
        /// Amount, two decimals (e.g. 500.00)
        amount: Money,
    },
    /// Fire a concurrent mix of queries and transfers
    LoadTest {
        /// Client id whose account range the test draws from
        client_id: u64,
        /// Number of requests to send
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Concurrent requests in flight
        #[arg(long, default_value_t = 10)]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Balance { account } => {
            let request = ClientRequest {
                operation: OP_QUERY_BALANCE.to_string(),
                args: vec![account.to_string()],
            };
            println!("{}", send_request(&cli.coordinator, &request).await?);
        }
        Commands::Transfer {
            source,
            dest,
            amount,
        } => {
            let request = ClientRequest {
                operation: OP_TRANSFER.to_string(),
                args: vec![source.to_string(), dest.to_string(), amount.to_string()],
            };
            println!("{}", send_request(&cli.coordinator, &request).await?);
        }
        Commands::LoadTest {
            client_id,
            count,
            concurrency,
        } => {
            load_test(&cli.coordinator, client_id, count, concurrency).await?;
        }
    }

    Ok(())
}

async fn send_request(coordinator: &str, request: &ClientRequest) -> anyhow::Result<String> {
    let stream = TcpStream::connect(coordinator).await?;
    let (read_half, mut write_half) = stream.into_split();

    write_half
        .write_all((request.encode() + "\n").as_bytes())
        .await?;

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    Ok(line.trim_end().to_string())
}

/// Alternate balance queries and small random transfers against accounts
/// derived from the client id, mimicking organic traffic.
async fn load_test(
    coordinator: &str,
    client_id: u64,
    count: usize,
    concurrency: usize,
) -> anyhow::Result<()> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let started = Instant::now();
    let mut handles = Vec::with_capacity(count);

    for i in 0..count {
        let coordinator = coordinator.to_string();
        let semaphore = semaphore.clone();
        let request = {
            let mut rng = rand::thread_rng();
            if i % 2 == 0 {
                ClientRequest {
                    operation: OP_QUERY_BALANCE.to_string(),
                    args: vec![(client_id * 100 + rng.gen_range(0..10)).to_string()],
                }
            } else {
                let source = client_id * 100 + rng.gen_range(0..10);
                let dest = ((client_id + 1) % 10) * 100 + rng.gen_range(0..10);
                let amount = Money::from_cents(rng.gen_range(1..10_000));
                ClientRequest {
                    operation: OP_TRANSFER.to_string(),
                    args: vec![source.to_string(), dest.to_string(), amount.to_string()],
                }
            }
        };
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await?;
            tokio::time::sleep(jitter).await;
            send_request(&coordinator, &request).await
        }));
    }

    let mut completed = 0usize;
    let mut errors = 0usize;
    for handle in handles {
        match handle.await? {
            Ok(line) if line.contains("|OK|") => completed += 1,
            _ => errors += 1,
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    println!("completed: {}/{}", completed, count);
    println!("errors: {}", errors);
    println!("elapsed: {:.2}s", elapsed);
    if elapsed > 0.0 {
        println!("requests/sec: {:.1}", count as f64 / elapsed);
    }

    Ok(())
}
