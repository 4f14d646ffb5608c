//! Coordinator binary

use clap::{Parser, Subcommand};
use minibank::common::config::Config;
use minibank::coordinator::bootstrap;
use minibank::Coordinator;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minibank-coord")]
#[command(about = "minibank coordinator - routes queries and transfers to worker nodes")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the coordinator server
    Serve {
        /// Bind address for client requests
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Data directory (authoritative account files)
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Generate the demo dataset
    Seed {
        /// Data directory to write into
        #[arg(long)]
        data: Option<PathBuf>,

        /// Number of accounts to create
        #[arg(long)]
        accounts: Option<u64>,

        /// RNG seed; identical seeds produce identical data
        #[arg(long, default_value_t = bootstrap::DEFAULT_SEED)]
        seed: u64,
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

    let mut coord_config = config.coordinator.unwrap_or_default();

    match cli.command {
        Commands::Serve { bind, data } => {
            // CLI arguments take priority over the file
            if let Some(bind) = bind {
                coord_config.bind_addr = bind;
            }
            if let Some(data) = data {
                coord_config.data_dir = data;
            }

            let coord = Coordinator::bind(coord_config).await?;
            coord.serve().await?;
        }
        Commands::Seed {
            data,
            accounts,
            seed,
        } => {
            if let Some(data) = data {
                coord_config.data_dir = data;
            }
            if let Some(accounts) = accounts {
                coord_config.total_accounts = accounts;
            }
            coord_config.validate()?;

            let summary = bootstrap::generate(&coord_config, seed)?;
            tracing::info!(
                "seeded {} clients and {} accounts across {} partitions, total balance {}",
                summary.clients,
                summary.accounts,
                coord_config.num_partitions,
                summary.total_balance
            );
        }
    }

    Ok(())
}
