//! CLI entry point for the OTE market scraper.
//!
//! Subcommands:
//!   - `serve`: read API plus the daily scrape scheduler
//!   - `scrape`: scrape and store a single date
//!   - `backfill`: scrape a run of consecutive dates
//!   - `keygen`: issue a new API key

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use ote_scraper::commands;
use ote_scraper::models::config::AppConfig;
use ote_scraper::utils::dates::{parse_key_string, today_at_anchor_hour, tomorrow_at_anchor_hour};

#[derive(Parser)]
#[command(
    name = "ote-scraper",
    version,
    about = "Scrapes the OTE daily electricity market and serves the stored history",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the read API and the daily scheduler
    Serve,
    /// Scrape one date (today by default)
    Scrape {
        /// Date to scrape, YYYY-MM-DD
        #[arg(long, value_parser = parse_date, conflicts_with = "tomorrow")]
        date: Option<NaiveDate>,
        /// Scrape tomorrow's date
        #[arg(long)]
        tomorrow: bool,
    },
    /// Scrape consecutive dates, continuing past failures
    Backfill {
        /// First date, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        /// Number of days
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
    /// Generate an API key and store its hash
    Keygen,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_key_string(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ote_scraper::init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Serve => commands::serve(config).await.context("server failed")?,
        Commands::Scrape { date, tomorrow } => {
            let date = match date {
                Some(d) => d,
                None if tomorrow => tomorrow_at_anchor_hour().date(),
                None => today_at_anchor_hour().date(),
            };
            let record = commands::scrape(config, date)
                .await
                .with_context(|| format!("scraping {} failed", date))?;
            info!("Stored {} hours for {}", record.hours.len(), record.date);
        }
        Commands::Backfill { start, days } => {
            let report = commands::backfill(config, start, days).await?;
            for (date, err) in &report.failed {
                eprintln!("[failed] {}: {}", date, err);
            }
            info!("Job done: {} stored, {} failed", report.stored.len(), report.failed.len());
        }
        Commands::Keygen => {
            let key = commands::issue_api_key(config).await?;
            println!("A new API key for the OAM module: {}", key);
        }
    }

    Ok(())
}
