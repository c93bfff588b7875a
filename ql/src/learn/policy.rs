use anyhow::Result;

use crate::learn::episode_history::{EpisodeHistory, Transition};
use crate::prelude::{FlapAction, Observation};
use crate::state::{StateKey, StateMapper};
use crate::value_store::{ActionValues, ValueStore};

/// Greedy policy over the value store.
///
/// Carries the previous state and action across calls, so each call completes the transition
/// started by the call before. This bookkeeping survives episode boundaries within a run:
/// the first transition of an episode starts at the last state seen before the previous death.
pub struct Policy {
    mapper: StateMapper,
    initial_state: StateKey,
    previous_state: StateKey,
    previous_action: FlapAction,
}

impl Policy {
    pub fn new(mapper: StateMapper, initial_state: StateKey) -> Self {
        Self {
            mapper,
            initial_state,
            previous_state: initial_state,
            previous_action: FlapAction::NoFlap,
        }
    }

    /// Back to the seed state and no-flap; done once at the start of every run
    pub fn reset(&mut self) {
        self.previous_state = self.initial_state;
        self.previous_action = FlapAction::NoFlap;
    }

    pub fn mapper(&self) -> &StateMapper {
        &self.mapper
    }

    pub fn previous_state(&self) -> StateKey {
        self.previous_state
    }

    pub fn previous_action(&self) -> FlapAction {
        self.previous_action
    }

    /// Picks the action for the current observation and records the completed transition in `history`.
    pub fn select(
        &mut self,
        observation: &Observation,
        store: &ValueStore,
        history: &mut EpisodeHistory,
    ) -> Result<FlapAction> {
        let state = self.mapper.map_observation(observation);
        let values = store.get(&state)?;
        let action = best_action(values);
        log::debug!("state: {}, values: {:?} => {}", state, values, action);

        history.add(Transition::new(self.previous_state, self.previous_action, state));
        self.previous_state = state;
        self.previous_action = action;
        Ok(action)
    }
}

/// Flap only if it is strictly better - ties go to no-flap
pub fn best_action(values: ActionValues) -> FlapAction {
    let [no_flap, flap] = values;
    if flap > no_flap {
        FlapAction::Flap
    } else {
        FlapAction::NoFlap
    }
}
