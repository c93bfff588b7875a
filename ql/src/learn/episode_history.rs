use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::prelude::FlapAction;
use crate::state::StateKey;

/// One recorded step: the action taken in `state` led to `next_state`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub state: StateKey,
    pub action: FlapAction,
    pub next_state: StateKey,
}

impl Transition {
    pub fn new(state: StateKey, action: FlapAction, next_state: StateKey) -> Self {
        Self { state, action, next_state }
    }
}

/// Transitions of the running episode in chronological order
#[derive(Clone, Debug, Default)]
pub struct EpisodeHistory {
    transitions: Vec<Transition>,
}

impl EpisodeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn add(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Hands out all recorded transitions and leaves the history empty
    pub fn take(&mut self) -> Vec<Transition> {
        std::mem::take(&mut self.transitions)
    }

    pub fn action_counts(&self) -> FxHashMap<FlapAction, usize> {
        let mut counts = FxHashMap::default();
        for (action, count) in self.transitions.iter().map(|t| t.action).counts() {
            counts.insert(action, count);
        }
        counts
    }
}

impl FromIterator<Transition> for EpisodeHistory {
    fn from_iter<T: IntoIterator<Item = Transition>>(iter: T) -> Self {
        Self {
            transitions: iter.into_iter().collect(),
        }
    }
}
