//! Worker node binary

use clap::{Parser, Subcommand};
use minibank::common::config::Config;
use minibank::WorkerServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minibank-worker")]
#[command(about = "minibank worker node - serves partitions of the account ledger")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the worker server
    Serve {
        /// Node name
        #[arg(long)]
        id: Option<String>,

        /// Bind address for task requests
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Data directory
        #[arg(long)]
        data: Option<PathBuf>,

        /// Partitions to load and serve (comma-separated)
        #[arg(long, value_delimiter = ',')]
        partitions: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut worker_config = config.worker.unwrap_or_default();

    match cli.command {
        Commands::Serve {
            id,
            bind,
            data,
            partitions,
        } => {
            // CLI arguments take priority over the file
            if let Some(id) = id {
                worker_config.node_id = id;
            }
            if let Some(bind) = bind {
                worker_config.bind_addr = bind;
            }
            if let Some(data) = data {
                worker_config.data_dir = data;
            }
            if !partitions.is_empty() {
                worker_config.partitions = partitions;
            }

            let worker = WorkerServer::bind(worker_config).await?;
            worker.serve().await?;
        }
    }

    Ok(())
}
