use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::state::StateKey;

/// Data type we use to encode an action in the value store.
pub type ModelActionType = u8;

/// The two things the bird can do within one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FlapAction {
    #[default]
    NoFlap,
    Flap,
}

impl FlapAction {
    /// Number of possible actions
    pub const ACTION_SPACE: ModelActionType = 2;

    /// Identifying the action as a unique value in range (0..Self::ACTION_SPACE);
    /// also used as index into the action-value pair
    pub fn numeric(&self) -> ModelActionType {
        match self {
            FlapAction::NoFlap => 0,
            FlapAction::Flap => 1,
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.numeric() as usize
    }
}

impl Display for FlapAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// What the host game reports to the agent each tick.
///
/// Distances are measured from the bird's center to the center of the relevant upcoming pipe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    /// signed horizontal distance to the upcoming obstacle
    pub x_distance: f32,
    /// signed vertical distance to the target gap
    pub y_distance: f32,
    /// current vertical velocity of the bird (positive = falling)
    pub velocity: i32,
}

impl Observation {
    pub fn new(x_distance: f32, y_distance: f32, velocity: i32) -> Self {
        Self { x_distance, y_distance, velocity }
    }
}

/// Learning environment, modeling the world of the agent.
///
/// Contract for the host loop:
/// - exactly one action is applied per [Self::step], before physics are integrated for that tick
/// - a `true` (done) result of [Self::step] ends the episode; the host resets only via [Self::reset]
///   and produces no further observation before that
pub trait Environment {
    /// Resets the environment to a defined starting point (position, velocity, obstacles, score)
    fn reset(&mut self);

    /// Current observation
    fn observation(&self) -> Observation;

    /// Performs one time step with the given `action` applied and returns the done flag (e.g. collision)
    fn step(&mut self, action: FlapAction) -> bool;

    /// Score reached within the current episode
    fn score(&self) -> u32;
}

#[derive(Debug)]
pub enum QlError {
    /// Lookup of a state the value store does not know, while failing closed
    UnknownState(StateKey),
    /// Buckets need a positive width
    InvalidBucketWidth(i32),
    InvalidStateKey(String),
    /// Value store could not be written, even after retrying
    Persistence {
        path: PathBuf,
        attempts: usize,
        message: String,
    },
    /// The run was stopped from outside (e.g. Ctrl-C) in the middle of an episode
    Interrupted,
}

impl Display for QlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QlError::UnknownState(key) => write!(f, "unknown state '{}'", key),
            QlError::InvalidBucketWidth(width) => write!(f, "bucket width must be positive, got {}", width),
            QlError::InvalidStateKey(key) => write!(f, "'{}' is not a state key of the form <x>_<y>_<velocity>", key),
            QlError::Persistence { path, attempts, message } => {
                write!(f, "failed to write value store to {} ({} attempts): {}", path.display(), attempts, message)
            }
            QlError::Interrupted => write!(f, "training interrupted"),
        }
    }
}

impl std::error::Error for QlError {}
