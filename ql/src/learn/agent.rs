use anyhow::Result;
use itertools::Itertools;

use crate::learn::episode_history::EpisodeHistory;
use crate::learn::policy::Policy;
use crate::learn::trainer::{Parameter, Trainer, TrainingOutcome};
use crate::prelude::{FlapAction, Observation};
use crate::state::StateSpace;
use crate::value_store::ValueStore;

/// Session context of one training run.
///
/// Owns everything that changes while playing: the value store, the policy's carried-over state,
/// the history of the running episode and the episode counter.
/// Episodes are strictly sequential: [Self::finish_episode] completes (including a checkpoint write)
/// before the next [Self::act] is served.
pub struct QLearningAgent {
    store: ValueStore,
    policy: Policy,
    trainer: Trainer,
    history: EpisodeHistory,
}

impl QLearningAgent {
    pub fn new(store: ValueStore, state_space: &StateSpace, param: Parameter) -> Self {
        let policy = Policy::new(state_space.mapper(), param.initial_state);
        Self {
            store,
            policy,
            trainer: Trainer::new(param),
            history: EpisodeHistory::new(),
        }
    }

    /// Chooses the action for this tick
    pub fn act(&mut self, observation: &Observation) -> Result<FlapAction> {
        self.policy.select(observation, &self.store, &mut self.history)
    }

    /// To be called exactly once after the terminal event of an episode
    pub fn finish_episode(&mut self) -> Result<TrainingOutcome> {
        let steps = self.history.len();
        if log::log_enabled!(log::Level::Debug) {
            let action_distribution = self
                .history
                .action_counts()
                .iter()
                .sorted_by_key(|(action, _)| action.numeric())
                .map(|(action, count)| format!("{} {}", action, count))
                .join(", ");
            log::debug!("episode ended after {} steps; actions: {}", steps, action_distribution);
        }
        self.trainer.update(&mut self.history, &mut self.store, false)
    }

    /// Unconditional checkpoint on orderly shutdown
    pub fn shutdown(&mut self) -> Result<()> {
        log::info!("shutting down after {} episodes", self.trainer.episode_count());
        self.trainer.checkpoint(&self.store, true)?;
        Ok(())
    }

    /// Start of a new run: seeds the policy's previous state/action again and drops any unfinished episode
    pub fn reset_session(&mut self) {
        self.policy.reset();
        self.history.take();
    }

    pub fn episode_count(&self) -> usize {
        self.trainer.episode_count()
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn history(&self) -> &EpisodeHistory {
        &self.history
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::learn::episode_history::Transition;
    use crate::state::StateKey;
    use crate::value_store::MissPolicy;

    use super::*;

    #[test]
    fn test_episode_boundary_keeps_previous_state() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("qvalues.json");
        let space = StateSpace::default();
        let mut agent = QLearningAgent::new(ValueStore::new(&file, MissPolicy::ZeroDefault), &space, Parameter::default());

        agent.act(&Observation::new(485.0, 10.0, 0))?;
        agent.act(&Observation::new(478.0, 8.0, 1))?;
        assert_eq!(agent.history().len(), 2);

        let outcome = agent.finish_episode()?;
        assert_eq!(outcome.updates, 2);
        assert!(agent.history().is_empty());

        // first transition of the next episode starts at the last state before the death
        agent.act(&Observation::new(485.0, 10.0, 0))?;
        assert_eq!(
            agent.history().transitions(),
            &[Transition::new(StateKey::new(470, 0, 1), FlapAction::NoFlap, StateKey::new(480, 10, 0))]
        );

        agent.reset_session();
        assert!(agent.history().is_empty());
        assert_eq!(agent.policy().previous_state(), StateKey::new(500, 280, 0));
        Ok(())
    }

    #[test]
    fn test_shutdown_always_writes() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("qvalues.json");
        let mut agent = QLearningAgent::new(
            ValueStore::new(&file, MissPolicy::ZeroDefault),
            &StateSpace::default(),
            Parameter::default(),
        );
        agent.act(&Observation::new(100.0, 100.0, 3))?;
        agent.finish_episode()?;
        assert!(!file.exists());

        agent.shutdown()?;
        let reloaded = ValueStore::load(&file, MissPolicy::FailClosed);
        assert_eq!(reloaded.len(), agent.store().len());
        assert!(reloaded.contains(&StateKey::new(500, 280, 0)));
        Ok(())
    }
}
