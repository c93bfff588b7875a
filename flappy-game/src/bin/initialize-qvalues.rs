use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use num_format::ToFormattedString;

use flappy_game::training::initialize_qvalues;
use flappy_game::DEFAULT_DATA_DIR;
use ql::format;
use ql::log::init_logging;
use ql::state::StateSpace;

/// Creates qvalues.json with zeros for every state of the state space
#[derive(Parser)]
#[command(name = "initialize-qvalues")]
struct Args {
    #[arg(long, default_value_os_t = DEFAULT_DATA_DIR.to_path_buf())]
    data_dir: PathBuf,
    /// has to match the bucket width of the training runs
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(i32).range(1..))]
    bucket_width: i32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(false);

    let space = StateSpace::with_bucket_width(args.bucket_width)?;
    let store = initialize_qvalues(&args.data_dir, &space)?;
    log::info!(
        "{} states written to {}",
        store.len().to_formatted_string(&format::number_format()),
        store.file().display()
    );
    Ok(())
}
