//! Reports Service - Aggregate queries and charts over the loaded database
//!
//! Responsibilities:
//! - Run the analytical queries against PostgreSQL
//! - Print every result as a table
//! - Write one CSV per result and a PNG chart where one applies
//!
//! Usage:
//!   DB_URL=postgres://postgres@localhost/csgo_analytics cargo run --bin reports

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use reports::{queries, Report};
use sqlx::postgres::PgPoolOptions;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reports", about = "Runs the analytical queries and renders charts")]
struct Args {
    /// Directory for the result CSVs and chart images
    #[arg(long, default_value = "modelos/graficos")]
    charts_dir: PathBuf,
}

fn save(report: &Report, dir: &Path) -> Result<()> {
    let csv_path = report.csv_path(dir);
    report
        .write_csv(&csv_path)
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;

    if let Some(chart) = &report.chart {
        let png_path = report.chart_path(dir);
        chart
            .save(&png_path)
            .with_context(|| format!("Failed to save chart {}", png_path.display()))?;
        println!("Chart saved: {}", png_path.display());
    }

    tracing::debug!(report = report.stem, rows = report.rows.len(), "report written");
    Ok(())
}

fn print_connectivity_help(err: &sqlx::Error) {
    eprintln!("\nConnection error: {}", err);
    eprintln!("\nCheck:");
    eprintln!("  1. Is PostgreSQL running?");
    eprintln!("  2. Has the loader been run against the database in DB_URL?");
    eprintln!("  3. Are the user and password in DB_URL correct?");
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

    println!("=== CS:GO Matchmaking Reports ===");

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&db_url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            print_connectivity_help(&err);
            return Err(err).context("Failed to connect to database");
        }
    };
    println!("Connected");

    fs::create_dir_all(&args.charts_dir)
        .with_context(|| format!("Failed to create {}", args.charts_dir.display()))?;

    let reports = queries::run_all(&pool).await.context("Report query failed")?;

    for report in &reports {
        println!("\n{}", report);
        save(report, &args.charts_dir)?;
    }

    println!("\n=== Reports Summary ===");
    println!("  Reports:  {:>4}", reports.len());
    println!(
        "  Charts:   {:>4}",
        reports.iter().filter(|r| r.chart.is_some()).count()
    );
    println!("\nOutput written to: {}", args.charts_dir.display());
    println!("Completed in {:.2?}", started.elapsed());

    Ok(())
}
