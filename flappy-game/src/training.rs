use std::path::Path;

use anyhow::Result;

use ql::learn::{Parameter, QLearningAgent, SelfDrivingQLearner};
use ql::prelude::{Environment, QlError};
use ql::state::StateSpace;
use ql::value_store::{MissPolicy, ValueStore};

use crate::game::flappy_environment::FlappyEnvironment;
use crate::report::RunSummary;
use crate::QVALUES_FILE_NAME;

/// Writes a value store with zeros for every state of `space` to `data_dir`
pub fn initialize_qvalues(data_dir: &Path, space: &StateSpace) -> Result<ValueStore> {
    let store = ValueStore::seeded(&data_dir.join(QVALUES_FILE_NAME), space, MissPolicy::FailClosed);
    store.save()?;
    Ok(store)
}

/// A learner on a fresh game, continuing with the values stored in `data_dir`
pub fn flappy_learner(
    data_dir: &Path,
    space: &StateSpace,
    miss_policy: MissPolicy,
    seed: Option<u64>,
) -> SelfDrivingQLearner<FlappyEnvironment> {
    let store = ValueStore::load(&data_dir.join(QVALUES_FILE_NAME), miss_policy);
    let agent = QLearningAgent::new(store, space, Parameter::default());
    SelfDrivingQLearner::new(FlappyEnvironment::new(seed), agent)
}

/// Plays up to `games` games, recording each score in `summary`.
/// An interrupt ends the run early, but regularly.
pub fn train<E: Environment>(learner: &mut SelfDrivingQLearner<E>, games: usize, summary: &mut RunSummary) -> Result<()> {
    for _ in 0..games {
        match learner.learn_episode() {
            Ok(score) => summary.push(score),
            Err(e) if matches!(e.downcast_ref::<QlError>(), Some(QlError::Interrupted)) => {
                log::info!("interrupted after {} games", summary.len());
                return Ok(());
            }
            Err(e) => {
                log::error!("training aborted after {} games: {:#}", summary.len(), e);
                return Err(e);
            }
        }
    }
    Ok(())
}

/// End of a run: final checkpoint and run summary are both attempted, whatever failed before.
/// Returns the first error (the one of `run` first).
pub fn finish<E: Environment>(
    learner: &mut SelfDrivingQLearner<E>,
    run: Result<()>,
    summary: &RunSummary,
    data_dir: &Path,
) -> Result<()> {
    let shutdown = learner.shutdown();
    if let Err(e) = &shutdown {
        log::error!("final checkpoint failed: {:#}", e);
    }

    if let Some((score, game)) = summary.max_score() {
        log::info!("max score {} at game {}", score, game);
        log::info!("average at the end: {:.2}", summary.final_average().unwrap_or_default());
    }
    let saved = summary.save(data_dir);
    if let Err(e) = &saved {
        log::error!("run summary could not be written: {:#}", e);
    }

    run.and(shutdown).and(saved)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::anyhow;
    use tempfile::tempdir;

    use ql::state::StateKey;

    use crate::SCORES_TEXT_FILE_NAME;

    use super::*;

    #[test]
    fn test_train_and_finish() -> Result<()> {
        let dir = tempdir()?;
        let space = StateSpace::default();
        let mut learner = flappy_learner(dir.path(), &space, MissPolicy::ZeroDefault, Some(3));
        let mut summary = RunSummary::new();

        let run = train(&mut learner, 4, &mut summary);
        assert!(run.is_ok());
        assert_eq!(summary.len(), 4);
        finish(&mut learner, run, &summary, dir.path())?;

        assert!(dir.path().join(QVALUES_FILE_NAME).exists());
        assert_eq!(RunSummary::read_scores(&dir.path().join(SCORES_TEXT_FILE_NAME))?, summary.scores);
        Ok(())
    }

    #[test]
    fn test_finish_writes_summary_when_checkpoint_fails() -> Result<()> {
        let dir = tempdir()?;
        let space = StateSpace::default();
        let mut learner = flappy_learner(dir.path(), &space, MissPolicy::ZeroDefault, Some(3));
        let mut summary = RunSummary::new();
        train(&mut learner, 2, &mut summary)?;

        // the value store file can not be replaced by a directory
        fs::create_dir(dir.path().join(QVALUES_FILE_NAME))?;

        let err = finish(&mut learner, Err(anyhow!("game crashed")), &summary, dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "game crashed");
        assert_eq!(RunSummary::read_scores(&dir.path().join(SCORES_TEXT_FILE_NAME))?, summary.scores);

        let err = finish(&mut learner, Ok(()), &summary, dir.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<QlError>(), Some(QlError::Persistence { .. })));
        Ok(())
    }

    #[test]
    fn test_initialized_store_serves_a_finer_grid() -> Result<()> {
        let dir = tempdir()?;
        let space = StateSpace::with_bucket_width(5)?;
        let store = initialize_qvalues(dir.path(), &space)?;
        assert_eq!(store.len(), space.len());

        let mut learner = flappy_learner(dir.path(), &space, MissPolicy::FailClosed, Some(8));
        assert_eq!(learner.agent().store().len(), space.len());
        let mut summary = RunSummary::new();
        train(&mut learner, 3, &mut summary)?;
        assert_eq!(summary.len(), 3);
        // no state outside of the width-5 grid was needed
        assert_eq!(learner.agent().store().len(), space.len());

        let store = learner.agent().store();
        assert!(store.contains(&StateKey::new(495, 285, -3)));
        assert!(store.contains(&Parameter::default().initial_state));
        Ok(())
    }
}
