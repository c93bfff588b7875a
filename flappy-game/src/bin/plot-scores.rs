use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use flappy_game::report::RunSummary;
use flappy_game::{DEFAULT_DATA_DIR, DEFAULT_SCORES_FILE};
use ql::log::init_logging;

/// Reads the scores of a finished run and writes summary and plot again, with the smoothed mean
#[derive(Parser)]
#[command(name = "plot-scores")]
struct Args {
    /// scores.txt of a training run
    #[arg(long, default_value_os_t = DEFAULT_SCORES_FILE.to_path_buf())]
    source: PathBuf,
    /// directory for scores.txt, scores.json and scores.svg
    #[arg(long, default_value_os_t = DEFAULT_DATA_DIR.to_path_buf())]
    destination: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(false);

    let scores = RunSummary::read_scores(&args.source)?;
    let summary = RunSummary::with_smoothed_averages(scores);
    log::info!("saving graphs to directory: {}", args.destination.display());
    summary.save(&args.destination)
}
