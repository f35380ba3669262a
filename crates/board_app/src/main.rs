mod catalog;
mod config;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use board_logging::{board_error, board_info, initialize, LogDestination};
use clap::Parser;

use crate::config::{load_file_config, Settings};

#[derive(Debug, Parser)]
#[command(name = "board_crawler")]
#[command(about = "Collect current programs and notices from the district education boards")]
pub(crate) struct Cli {
    /// RON configuration file (defaults to ./board_crawler.ron when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep the last three months instead of future items only
    #[arg(long)]
    diagnostic: bool,

    /// Directory the JSON documents are written to
    #[arg(long)]
    output: Option<PathBuf>,

    /// Maximum pages read per board
    #[arg(long)]
    page_cap: Option<u32>,

    /// Only walk the board with this id
    #[arg(long)]
    only: Option<String>,

    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log warnings and errors only
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match try_main(cli) {
        Ok(code) => code,
        Err(err) => {
            board_error!("{err:#}");
            eprintln!("board_crawler: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli) -> Result<ExitCode> {
    let file = load_file_config(cli.config.as_deref())?;
    let settings = Settings::resolve(file, &cli)?;

    let destination = match &settings.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    initialize(destination, settings.log_level);
    board_info!("profile: {}", settings.profile);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building the async runtime")?;
    let summary = runtime.block_on(run::run(&settings))?;

    if summary.failed_boards().next().is_some() {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
