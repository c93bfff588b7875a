use anyhow::Result;

use crate::learn::episode_history::{EpisodeHistory, Transition};
use crate::prelude::FlapAction;
use crate::state::StateKey;
use crate::value_store::ValueStore;

pub struct Parameter {
    /// Learning rate α; weight of the new estimate against the old value
    pub alpha: f64,
    /// Discount rate 𝛾 (0 <= 𝛾 <= 1) for the value of the follow-up state; 1.0 = undiscounted
    pub gamma: f64,
    /// Credit for a transition which did not lead to death
    pub survival_reward: f64,
    /// Penalty for transitions considered responsible for the death
    pub death_reward: f64,
    /// Number of most recent transitions, which always get the death penalty
    pub terminal_transitions: usize,
    /// A death with a final vertical bucket above this is a collision with the upper pipe
    pub upper_collision_threshold: i32,
    /// Persist the value store every n-th episode
    pub checkpoint_interval: usize,
    /// Seed state of the policy at the start of a run
    pub initial_state: StateKey,
}

impl Default for Parameter {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            gamma: 1.0,
            survival_reward: 1.0,
            death_reward: -1000.0,
            terminal_transitions: 2,
            upper_collision_threshold: 120,
            checkpoint_interval: 25,
            initial_state: StateKey::new(500, 280, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrainingOutcome {
    /// Number of value updates applied (one per transition)
    pub updates: usize,
    /// Episode counter after this episode
    pub episode_count: usize,
    pub checkpoint_written: bool,
}

/// Backward credit assignment over a finished episode.
///
/// Walking the history from the death backwards:
/// - the `terminal_transitions` most recent transitions get the death penalty, whatever the action was
/// - if the bird died above the upper collision threshold, the most recent *flap* beyond those
///   also gets the death penalty; this fires for one transition only
/// - everything else earns the survival reward
///
/// Each transition `(s, a, s')` gets one TD(0) update:
/// `Q(s,a) <- (1 - α) Q(s,a) + α (r + 𝛾 max Q(s'))`
pub struct Trainer {
    param: Parameter,
    episode_count: usize,
}

impl Trainer {
    pub fn new(param: Parameter) -> Self {
        Self { param, episode_count: 0 }
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    /// Rewards in most-recent-first order, matching `transitions.iter().rev()`
    pub fn shape_rewards(&self, transitions: &[Transition]) -> Vec<f64> {
        let mut upper_collision_pending = match transitions.last() {
            Some(last) => last.next_state.y_bucket > self.param.upper_collision_threshold,
            None => false,
        };

        transitions
            .iter()
            .rev()
            .enumerate()
            .map(|(i, transition)| {
                if i < self.param.terminal_transitions {
                    self.param.death_reward
                } else if upper_collision_pending && transition.action == FlapAction::Flap {
                    upper_collision_pending = false;
                    self.param.death_reward
                } else {
                    self.param.survival_reward
                }
            })
            .collect()
    }

    /// Trains on the finished episode, consuming `history`.
    /// Persists the store when the checkpoint interval is reached or `force_checkpoint` is set.
    ///
    /// All or nothing: when a state of the episode is unknown to a fail-closed store, neither the store,
    /// the history nor the episode counter are touched.
    pub fn update(
        &mut self,
        history: &mut EpisodeHistory,
        store: &mut ValueStore,
        force_checkpoint: bool,
    ) -> Result<TrainingOutcome> {
        for transition in history.transitions() {
            store.get(&transition.state)?;
            store.get(&transition.next_state)?;
        }
        let transitions = history.take();
        let rewards = self.shape_rewards(&transitions);

        for (transition, reward) in transitions.iter().rev().zip(rewards) {
            self.apply_td_update(transition, reward, store)?;
        }

        self.episode_count += 1;
        let checkpoint_written = self.checkpoint(store, force_checkpoint)?;

        Ok(TrainingOutcome {
            updates: transitions.len(),
            episode_count: self.episode_count,
            checkpoint_written,
        })
    }

    /// Writes the store if `force` is set or the episode counter is at a checkpoint interval
    pub fn checkpoint(&self, store: &ValueStore, force: bool) -> Result<bool> {
        let due = self.param.checkpoint_interval > 0
            && self.episode_count > 0
            && self.episode_count % self.param.checkpoint_interval == 0;
        if due || force {
            log::info!("checkpoint at episode {}", self.episode_count);
            store.save()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn apply_td_update(&self, transition: &Transition, reward: f64, store: &mut ValueStore) -> Result<()> {
        let Transition { state, action, next_state } = *transition;
        let current = store.value(&state, action)?;
        let future = store.max_value(&next_state)?;
        let updated = (1.0 - self.param.alpha) * current + self.param.alpha * (reward + self.param.gamma * future);
        log::trace!("Q({}, {}) {:.2} -> {:.2} (reward {})", state, action, current, updated, reward);
        store.set(state, action, updated)
    }
}
