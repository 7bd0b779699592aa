use std::process::ExitCode;

use agriwx_core::{AppError, Config};
use agriwx_ingest::{Crawler, RefreshReport};

async fn run() -> Result<RefreshReport, AppError> {
    agriwx_core::init()?;

    let config = Config::load_validated()?;
    tracing::debug!("Using store {}", config.storage.db_path.display());

    let mut crawler = Crawler::from_config(&config)?;
    Ok(crawler.refresh().await?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(report) => {
            println!(
                "Stored {} forecast rows for {} regions (fetched at {})",
                report.rows_written,
                report.regions.len(),
                report.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if !report.inverted.is_empty() {
                println!(
                    "Warning: {} rows have a maximum below the minimum temperature",
                    report.inverted.len()
                );
            }
            if report.pruned > 0 {
                println!("Pruned {} expired rows", report.pruned);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("Refresh failed: {}", err);
            eprintln!("{}", err.user_message());
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
