//! account-features entrypoint: import CSV datasets, derive feature tables,
//! and write class-balanced copies, all against the local store.

use account_features::{
    config::{PipelineConfig, CONFIG_ENV},
    jobs,
    logging::StructuredLogger,
    storage::AccountStore,
};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tracing::info;

/// Feature derivation and class balancing for fake-account datasets
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file
    #[arg(long, env = CONFIG_ENV, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a CSV file as a raw table (first column is the integer id)
    Import {
        csv: PathBuf,
        /// Table name; defaults to the file stem
        #[arg(long)]
        name: Option<String>,
    },
    /// Derive the feature table for a raw table
    Features { table: String },
    /// Write a class-balanced copy of a raw table
    Balance {
        table: String,
        /// Resampling seed; defaults to the configured seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List stored raw and feature tables
    Tables,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let config = PipelineConfig::load(&args.config);

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(data_dir = ?config.store.data_dir, "account-features starting");

    let store = AccountStore::open(&config.store)?;

    match args.command {
        Command::Import { csv, name } => {
            let (table, rows) = jobs::import_file(&store, &csv, name.as_deref())?;
            println!("imported {} rows into {}", rows, table);
        }
        Command::Features { table } => {
            let features = jobs::build_features(&store, &config, &table)?;
            println!(
                "wrote {} feature rows ({} columns) to {}",
                features.rows.len(),
                features.columns.len() + 2,
                features.name
            );
        }
        Command::Balance { table, seed } => {
            let seed = seed.unwrap_or(config.balance.seed);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let report = jobs::balance_table(&store, &config, &table, &mut rng)?;
            if report.balanced_already() {
                println!("no balancing needed");
            }
            StructuredLogger::emit_json(&report, &mut std::io::stdout())?;
        }
        Command::Tables => {
            for name in store.raw_tables()? {
                println!("raw\t{}", name);
            }
            for name in store.feature_tables()? {
                println!("features\t{}", name);
            }
        }
    }

    Ok(())
}
