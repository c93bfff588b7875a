use rand::rngs::StdRng;
use rand::SeedableRng;

use ql::prelude::{Environment, FlapAction, Observation};

use crate::game::mechanics::{FlappyMechanics, GameInput, SCREEN_WIDTH};

/// Connects the headless game to the learner
pub struct FlappyEnvironment {
    mechanics: FlappyMechanics,
}

impl FlappyEnvironment {
    /// `seed` makes the pipe layout reproducible
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            mechanics: FlappyMechanics::new(rng),
        }
    }

    pub fn mechanics(&self) -> &FlappyMechanics {
        &self.mechanics
    }

    fn map_action_to_game_input(action: FlapAction) -> GameInput {
        match action {
            FlapAction::NoFlap => GameInput::None,
            FlapAction::Flap => GameInput::Flap,
        }
    }
}

impl Environment for FlappyEnvironment {
    fn reset(&mut self) {
        self.mechanics.reset();
    }

    fn observation(&self) -> Observation {
        let bird = self.mechanics.bird.shape.center();
        let (x_distance, y_distance) = match self.mechanics.target_pipe() {
            Some(pipe) => (pipe.bottom.center().x - bird.x, pipe.gap_center_y() - bird.y),
            None => (SCREEN_WIDTH - bird.x, 0),
        };
        Observation::new(x_distance as f32, y_distance as f32, self.mechanics.bird.velocity)
    }

    fn step(&mut self, action: FlapAction) -> bool {
        self.mechanics.time_step(Self::map_action_to_game_input(action));
        self.mechanics.finished
    }

    fn score(&self) -> u32 {
        self.mechanics.score
    }
}

#[cfg(test)]
mod tests {
    use ql::state::StateSpace;

    use crate::game::mechanics::SCREEN_HEIGHT;

    use super::*;

    #[test]
    fn test_initial_observation() {
        let environment = FlappyEnvironment::new(Some(3));
        let pipe = &environment.mechanics().pipes[0];
        let observation = environment.observation();
        // pipe spawns at the right border, bird center is at 117
        assert_eq!(observation.x_distance, (SCREEN_WIDTH + 26 - 117) as f32);
        assert_eq!(observation.y_distance, (pipe.gap_center_y() - (SCREEN_HEIGHT / 2 + 12)) as f32);
        assert_eq!(observation.velocity, 0);
    }

    #[test]
    fn test_observations_stay_in_the_state_space() {
        let space = StateSpace::default();
        let mapper = space.mapper();
        let mut environment = FlappyEnvironment::new(Some(11));
        for episode in 0..5 {
            let mut ticks = 0;
            loop {
                let observation = environment.observation();
                let key = mapper.map_observation(&observation);
                assert!(space.contains(&key), "{} outside the state space", key);

                // alternate between flapping phases and falling phases
                let action = if (ticks / 12 + episode) % 2 == 0 { FlapAction::Flap } else { FlapAction::NoFlap };
                ticks += 1;
                if environment.step(action) {
                    break;
                }
            }
            environment.reset();
            assert_eq!(environment.score(), 0);
            assert!(!environment.mechanics().finished);
        }
    }
}
