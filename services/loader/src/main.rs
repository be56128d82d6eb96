//! Loader Service - Bulk loads the normalized tables into PostgreSQL
//!
//! Responsibilities:
//! - Recreate the schema (drop + create, children first)
//! - Insert players, maps, weapons, matches, rounds, damage_events in that order
//! - Chunk large tables; one transaction per table
//! - Tell connectivity problems apart from everything else
//!
//! Usage:
//!   DB_URL=postgres://postgres@localhost/csgo_analytics cargo run --bin loader

mod ddl;
mod error;
mod load;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::LoadError;

#[derive(Parser, Debug)]
#[command(name = "loader", about = "Loads the normalized tables into PostgreSQL")]
struct Args {
    /// Directory holding the ETL output
    #[arg(long, default_value = "base_dados/tabelas_normalizadas")]
    tables_dir: PathBuf,

    /// Rows per INSERT statement (capped by the bind parameter limit)
    #[arg(long, default_value_t = load::DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

async fn run(db_url: &str, args: &Args) -> Result<Vec<(&'static str, u64)>, LoadError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(db_url)
        .await
        .map_err(LoadError::Connectivity)?;
    println!("Connected");

    ddl::create_schema(&pool).await?;
    println!("Schema created");

    load::load_all(&pool, &args.tables_dir, args.batch_size).await
}

fn print_connectivity_help(err: &LoadError) {
    eprintln!("\nConnection error: {}", err);
    eprintln!("\nCheck:");
    eprintln!("  1. Is PostgreSQL running?");
    eprintln!("  2. Does the database named in DB_URL exist?");
    eprintln!("  3. Are the user and password in DB_URL correct?");
    eprintln!("\nTo create the database, run in psql:");
    eprintln!("  CREATE DATABASE csgo_analytics;");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let db_url = std::env::var("DB_URL").context("DB_URL env var missing")?;
    let started = Instant::now();

    println!("=== CS:GO Matchmaking Loader ===");
    println!("Tables: {}", args.tables_dir.display());

    let counts = match run(&db_url, &args).await {
        Ok(counts) => counts,
        Err(err) => {
            if err.is_connectivity() {
                print_connectivity_help(&err);
            } else {
                eprintln!("\nError: {}", err);
            }
            return Err(err).context("Load aborted");
        }
    };

    println!("\n=== Load Summary ===");
    for (table, rows) in &counts {
        println!("  {:<14} {:>10}", table, rows);
    }
    println!("\nLoad completed in {:.2?}", started.elapsed());

    Ok(())
}
