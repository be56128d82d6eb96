//! ETL Service - Normalizes the matchmaking demo export into relational tables
//!
//! Responsibilities:
//! - Load the wide demo CSV (one row per damage event)
//! - Extract players, maps, weapons, matches and rounds
//! - Rewrite every damage event against the generated ids
//! - Write one CSV per table for the loader
//!
//! Usage:
//!   cargo run --bin etl
//!   cargo run --bin etl -- --input data.csv --out-dir tables/ --limit 10000

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use etl::{pipeline, raw, writer};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "etl", about = "Normalizes the matchmaking demo CSV into relational tables")]
struct Args {
    /// Source CSV, one row per damage event
    #[arg(long, default_value = "base_dados/mm_master_demos.csv")]
    input: PathBuf,

    /// Directory for the normalized table files
    #[arg(long, default_value = "base_dados/tabelas_normalizadas")]
    out_dir: PathBuf,

    /// Only read the first N source rows (quick test runs)
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let started = Instant::now();

    println!("=== CS:GO Matchmaking ETL ===");
    println!("Input: {}", args.input.display());
    if let Some(limit) = args.limit {
        println!("Row limit: {}", limit);
    }

    let raw = raw::load(&args.input, args.limit)
        .with_context(|| format!("Failed to load source dataset {}", args.input.display()))?;
    println!("Loaded {} source rows ({} skipped)", raw.len(), raw.skipped);

    let tables = pipeline::run(&raw).context("Normalization failed")?;

    writer::write_all(&args.out_dir, &tables)
        .with_context(|| format!("Failed to write tables to {}", args.out_dir.display()))?;

    println!("\n=== Extraction Summary ===");
    println!("{}", tables.summary());
    println!("\nElapsed: {:.2?}", started.elapsed());
    println!("Tables written to: {}", args.out_dir.display());

    Ok(())
}
