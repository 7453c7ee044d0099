use crate::config::cli::Args;
use crate::config::Config;
use crate::domain::ErrorRecord;
use crate::error::Result;
use crate::infrastructure::FileSystemStore;
use crate::services::{spinner, ProgressWriter, ScrapingService};
use clap::Parser;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

mod config;
mod domain;
mod error;
mod infrastructure;
mod normalize;
mod scrapers;
mod services;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let progress = match spinner(args.verbose) {
        Ok(pb) => pb,
        Err(e) => {
            eprintln!("Error: {}", e);
            ProgressBar::hidden()
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(ProgressWriter::new(progress.clone()))
        .init();

    let juristic_id = args.juristic_id.clone();
    let result = run(args, progress.clone()).await;
    progress.finish_and_clear();

    match result {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            let report = ErrorRecord {
                juristic_id: &juristic_id,
                error: e.to_string(),
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(_) => eprintln!("Error: {}", e),
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(args: Args, progress: ProgressBar) -> Result<PathBuf> {
    let config = Config::new(args)?;
    config.ensure_directories()?;

    let store = FileSystemStore::new(&config.args.data_dir, &config.args.debug_dir);
    let path = ScrapingService::new(&config, store, progress).run().await?;

    info!("Scraping completed successfully!");
    Ok(path)
}
