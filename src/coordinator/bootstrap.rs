//! Seed dataset generation
//!
//! Writes the demo dataset the cluster runs against: client reference
//! data, accounts split across per-partition files, and an empty
//! transactions file. The RNG is explicitly seeded so repeated runs
//! produce byte-identical data.

use crate::common::dataset::{self, AccountRecord, ClientRecord};
use crate::common::{CoordinatorConfig, Money, Result};
use crate::coordinator::partition::PartitionMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const DEFAULT_SEED: u64 = 12345;

const NUM_CLIENTS: u32 = 1000;

const FIRST_NAMES: &[&str] = &[
    "Juan", "María", "Carlos", "Ana", "Pedro", "Laura", "Miguel", "Sofia", "Diego", "Carmen",
];
const LAST_NAMES: &[&str] = &[
    "Pérez", "López", "García", "Martínez", "Rodríguez", "González", "Hernández", "Díaz",
    "Moreno", "Muñoz",
];

#[derive(Debug, Clone, Copy)]
pub struct SeedSummary {
    pub clients: u32,
    pub accounts: u64,
    pub total_balance: Money,
}

/// Generate the full dataset under `config.data_dir`.
pub fn generate(config: &CoordinatorConfig, rng_seed: u64) -> Result<SeedSummary> {
    let map = PartitionMap::from_config(config);
    let mut rng = StdRng::seed_from_u64(rng_seed);

    write_clients(&config.data_dir)?;

    let mut writers: BTreeMap<String, BufWriter<File>> = BTreeMap::new();
    for name in map.names() {
        let path = dataset::accounts_file(&config.data_dir, &name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        writers.insert(name, BufWriter::new(File::create(path)?));
    }

    let mut total_balance = Money::ZERO;
    for i in 0..config.total_accounts {
        let account_id = config.base_account_id + i;
        let record = AccountRecord {
            account_id,
            client_id: 1 + (i % NUM_CLIENTS as u64) as u32,
            // uniform in [500.00, 5000.00)
            balance: Money::from_cents(50_000 + rng.gen_range(0..450_000)),
            kind: if i % 3 == 0 { "Ahorros" } else { "Corriente" }.to_string(),
        };
        total_balance += record.balance;
        let partition = map.partition_for(account_id);
        let writer = writers
            .get_mut(&partition)
            .expect("partition_for stays within configured names");
        writeln!(writer, "{}", record.to_line())?;
    }
    for writer in writers.values_mut() {
        writer.flush()?;
    }

    // Empty transactions file so workers start with a clean history
    let tx_path = dataset::transactions_file(&config.data_dir);
    if let Some(parent) = tx_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(&tx_path)?;

    Ok(SeedSummary {
        clients: NUM_CLIENTS,
        accounts: config.total_accounts,
        total_balance,
    })
}

fn write_clients(data_dir: &Path) -> Result<()> {
    let path = dataset::clients_file(data_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for i in 1..=NUM_CLIENTS {
        let record = ClientRecord {
            id: i,
            name: format!(
                "{} {}",
                FIRST_NAMES[i as usize % FIRST_NAMES.len()],
                LAST_NAMES[i as usize % LAST_NAMES.len()]
            ),
            email: format!("client{}@example.com", i),
            phone: format!("9{:08}", 10_000_000 + i),
        };
        writeln!(writer, "{}", record.to_line())?;
    }
    writer.flush()?;
    Ok(())
}
