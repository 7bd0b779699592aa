use std::io::Write;
use std::path::PathBuf;

use agriwx_core::Config;
use agriwx_dashboard::{build_view, date_bounds, default_region, regions, render, ForecastFilter};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;

#[derive(Parser)]
#[command(author, version, about = "Per-region forecast trends from the local store", long_about = None)]
struct Cli {
    /// Region to show (defaults to dashboard.preferred_region)
    #[arg(short, long)]
    region: Option<String>,

    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Store file to read instead of storage.db_path
    #[arg(long, env = "AGRIWX_DB")]
    db: Option<PathBuf>,

    /// List regions and the stored date range, then exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    agriwx_core::init()?;

    let config = Config::load()?;
    let db_path = cli.db.unwrap_or(config.storage.db_path);
    let table = agriwx_store::load_all(&db_path)
        .with_context(|| format!("Failed to read forecast store {}", db_path.display()))?;
    tracing::debug!("Loaded {} forecast rows", table.len());

    let available = regions(&table);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if cli.list {
        match date_bounds(&table) {
            Some((start, end)) => writeln!(out, "Dates: {} to {}", start, end)?,
            None => writeln!(out, "No forecast data in the store yet.")?,
        }
        for region in &available {
            writeln!(out, "{}", region)?;
        }
        return Ok(());
    }

    let region = match cli.region {
        Some(region) => region,
        None => default_region(&available, &config.dashboard.preferred_region)
            .unwrap_or_default()
            .to_string(),
    };
    if !table.is_empty() && !available.contains(&region) {
        tracing::warn!("Unknown region {}; available: {}", region, available.join(", "));
    }

    let filter = ForecastFilter::new(region).between(cli.from, cli.to);
    render(&build_view(&table, &filter), &mut out)?;
    Ok(())
}
