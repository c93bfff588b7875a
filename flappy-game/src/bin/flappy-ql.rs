use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use flappy_game::report::RunSummary;
use flappy_game::training::{finish, flappy_learner, train};
use flappy_game::DEFAULT_DATA_DIR;
use ql::log::init_logging;
use ql::state::StateSpace;
use ql::value_store::MissPolicy;

#[derive(Parser)]
#[command(name = "flappy-ql", about = "Tabular Q-learning agent playing headless Flappy Bird")]
struct Args {
    /// number of games to play
    #[arg(long, default_value = "1000")]
    iter: usize,
    /// output debug logs
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// frames per second; 30 = normal, 60 = fast, 120 = very fast. Unthrottled when omitted
    #[arg(long, value_parser = parse_frame_rate)]
    fps: Option<u32>,
    /// location of qvalues.json and the run summary
    #[arg(long, default_value_os_t = DEFAULT_DATA_DIR.to_path_buf())]
    data_dir: PathBuf,
    /// has to match the bucket width qvalues.json was initialized with
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(i32).range(1..))]
    bucket_width: i32,
    /// seed for the pipe layout
    #[arg(long)]
    seed: Option<u64>,
    /// stop on states missing in qvalues.json instead of treating them as zero
    #[arg(long, default_value_t = false)]
    fail_closed: bool,
}

fn parse_frame_rate(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(fps @ (30 | 60 | 120)) => Ok(fps),
        _ => Err(format!("'{}' is not one of 30, 60, 120", value)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let miss_policy = if args.fail_closed {
        MissPolicy::FailClosed
    } else {
        MissPolicy::ZeroDefault
    };
    let space = StateSpace::with_bucket_width(args.bucket_width)?;
    log::info!("bucket width {}, {} states in the state space", space.bucket_width(), space.len());

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::Relaxed))?;
    }
    let mut learner = flappy_learner(&args.data_dir, &space, miss_policy, args.seed).with_interrupt(interrupted);
    if let Some(fps) = args.fps {
        learner = learner.with_frame_rate(fps);
    }

    let mut summary = RunSummary::new();
    let run = train(&mut learner, args.iter, &mut summary);
    finish(&mut learner, run, &summary, &args.data_dir)
}
