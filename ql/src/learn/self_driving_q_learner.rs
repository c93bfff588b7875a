use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use num_format::ToFormattedString;

use crate::format;
use crate::learn::agent::QLearningAgent;
use crate::prelude::{Environment, QlError};

/// A self-driving Q-learning loop.
///
/// It's directly connected to a (game-) environment and drives the speed of the steps in that environment
/// with its responses: one action per tick, training after each death, then the environment is reset.
pub struct SelfDrivingQLearner<E: Environment> {
    environment: E,
    agent: QLearningAgent,
    /// real-time pacing; `None` = as fast as possible
    tick_interval: Option<Duration>,
    /// checked once per tick
    interrupt: Option<Arc<AtomicBool>>,
    step_count: usize,
}

impl<E: Environment> SelfDrivingQLearner<E> {
    pub fn new(environment: E, agent: QLearningAgent) -> Self {
        Self {
            environment,
            agent,
            tick_interval: None,
            interrupt: None,
            step_count: 0,
        }
    }

    /// Paces the loop to `frames_per_second` ticks per second
    pub fn with_frame_rate(mut self, frames_per_second: u32) -> Self {
        self.tick_interval = (frames_per_second > 0).then(|| Duration::from_secs(1) / frames_per_second);
        self
    }

    /// Once `flag` is raised, the running episode is abandoned with [QlError::Interrupted]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Plays one episode until the bird dies and trains on it. Returns the episode's score.
    pub fn learn_episode(&mut self) -> Result<u32> {
        let mut next_tick = Instant::now();
        let mut episode_steps: usize = 0;
        loop {
            if self.interrupt.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(QlError::Interrupted.into());
            }
            if let Some(interval) = self.tick_interval {
                let now = Instant::now();
                if next_tick > now {
                    thread::sleep(next_tick - now);
                }
                next_tick += interval;
            }

            let observation = self.environment.observation();
            let action = self.agent.act(&observation)?;
            self.step_count += 1;
            episode_steps += 1;

            if self.environment.step(action) {
                let score = self.environment.score();
                let outcome = self.agent.finish_episode()?;
                self.environment.reset();
                log::info!(
                    "episode: {}, score: {}, steps: {}, total steps: {}{}",
                    outcome.episode_count.to_formatted_string(&format::number_format()),
                    score,
                    episode_steps,
                    self.step_count.to_formatted_string(&format::number_format()),
                    if outcome.checkpoint_written { " (checkpoint)" } else { "" }
                );
                return Ok(score);
            }
        }
    }

    /// Plays `episodes` episodes and returns their scores in order
    pub fn learn_episodes(&mut self, episodes: usize) -> Result<Vec<u32>> {
        (0..episodes).map(|_| self.learn_episode()).collect()
    }

    /// Orderly end of the run; always persists the value store
    pub fn shutdown(&mut self) -> Result<()> {
        self.agent.shutdown()
    }

    pub fn agent(&self) -> &QLearningAgent {
        &self.agent
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }
}
