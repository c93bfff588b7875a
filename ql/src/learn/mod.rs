pub mod agent;
pub mod episode_history;
pub mod policy;
pub mod self_driving_q_learner;
pub mod trainer;

pub use agent::QLearningAgent;
pub use episode_history::{EpisodeHistory, Transition};
pub use policy::Policy;
pub use self_driving_q_learner::SelfDrivingQLearner;
pub use trainer::{Parameter, Trainer, TrainingOutcome};
