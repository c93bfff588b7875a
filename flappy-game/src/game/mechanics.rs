use rand::rngs::StdRng;
use rand::Rng;

use crate::game::algebra_2d::{AaBB, Vec2};

/// TOP / LEFT corner is 0/0
pub const SCREEN_WIDTH: i32 = 576;
/// The playfield ends at the ground
pub const PLAYFIELD_HEIGHT: i32 = 512;
const GROUND_HEIGHT: i32 = 112;
pub const SCREEN_HEIGHT: i32 = PLAYFIELD_HEIGHT + GROUND_HEIGHT;

const BIRD_LEFT_X: i32 = 100;
const BIRD_WIDTH: i32 = 34;
const BIRD_HEIGHT: i32 = 24;

const GRAVITY: i32 = 1;
const MAX_FALL_VELOCITY: i32 = 8;
pub const FLAP_VELOCITY: i32 = -10;

const PIPE_WIDTH: i32 = 52;
const PIPE_HEIGHT: i32 = 320;
pub const PIPE_GAP: i32 = 150;
/// pixels per tick
pub const SCROLL_SPEED: i32 = 7;
/// 900 ms at 30 fps
pub const PIPE_SPAWN_INTERVAL_TICKS: u32 = 27;
const GAP_CENTER_MAX_OFFSET: i32 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GameInput {
    #[default]
    None,
    Flap,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bird {
    pub shape: AaBB,
    /// pixels per tick; positive = falling
    pub velocity: i32,
}

impl Bird {
    fn initial() -> Self {
        Self {
            shape: AaBB::from_size(BIRD_LEFT_X, SCREEN_HEIGHT / 2, BIRD_WIDTH, BIRD_HEIGHT),
            velocity: 0,
        }
    }

    fn process_input(&mut self, input: GameInput) {
        if input == GameInput::Flap {
            self.velocity = FLAP_VELOCITY;
        }
    }

    /// gravity; the bird stops moving once it rests on the ground
    fn proceed(&mut self) {
        self.velocity = (self.velocity + GRAVITY).min(MAX_FALL_VELOCITY);
        if self.shape.max.y < PLAYFIELD_HEIGHT {
            self.shape = self.shape.translate(Vec2::new(0, self.velocity));
        }
    }
}

/// A top and a bottom pipe with a gap in between
#[derive(Clone, Debug, PartialEq)]
pub struct PipePair {
    pub top: AaBB,
    pub bottom: AaBB,
}

impl PipePair {
    pub fn new(left_x: i32, gap_center_y: i32) -> Self {
        Self {
            top: AaBB::from_size(left_x, gap_center_y - PIPE_GAP / 2 - PIPE_HEIGHT, PIPE_WIDTH, PIPE_HEIGHT),
            bottom: AaBB::from_size(left_x, gap_center_y + PIPE_GAP / 2, PIPE_WIDTH, PIPE_HEIGHT),
        }
    }

    pub fn gap_center_y(&self) -> i32 {
        (self.top.max.y + self.bottom.min.y).div_euclid(2)
    }

    fn proceed(&mut self) {
        let scroll = Vec2::new(-SCROLL_SPEED, 0);
        self.top = self.top.translate(scroll);
        self.bottom = self.bottom.translate(scroll);
    }

    fn collides(&self, shape: &AaBB) -> bool {
        self.top.intersects(shape) || self.bottom.intersects(shape)
    }
}

/// Headless side-scrolling game: one call to [FlappyMechanics::time_step] is one frame
#[derive(Clone, Debug)]
pub struct FlappyMechanics {
    pub bird: Bird,
    /// ordered from left to right
    pub pipes: Vec<PipePair>,
    pub score: u32,
    pub finished: bool,
    /// the bird is currently between the walls of the first pipe
    pipe_entered: bool,
    ticks_since_spawn: u32,
    rng: StdRng,
}

impl FlappyMechanics {
    pub fn new(rng: StdRng) -> Self {
        let mut mechanics = Self {
            bird: Bird::initial(),
            pipes: vec![],
            score: 0,
            finished: false,
            pipe_entered: false,
            ticks_since_spawn: 0,
            rng,
        };
        mechanics.spawn_pipes();
        mechanics
    }

    /// New game; the random generator keeps running
    pub fn reset(&mut self) {
        self.bird = Bird::initial();
        self.pipes.clear();
        self.score = 0;
        self.finished = false;
        self.pipe_entered = false;
        self.spawn_pipes();
    }

    /// physically move one time step forward
    pub fn time_step(&mut self, input: GameInput) {
        if self.finished {
            return;
        }
        self.bird.process_input(input);
        self.bird.proceed();
        self.check_pipe_passed();
        self.check_game_end_situation();
        if !self.finished {
            for pipe in self.pipes.iter_mut() {
                pipe.proceed();
            }
            self.pipes.retain(|p| p.bottom.max.x >= 0);

            self.ticks_since_spawn += 1;
            if self.ticks_since_spawn >= PIPE_SPAWN_INTERVAL_TICKS {
                self.spawn_pipes();
            }
        }
    }

    /// The pipe pair the bird has to fly through next: the first one, unless the bird has passed
    /// its center by more than 30 pixels
    pub fn target_pipe(&self) -> Option<&PipePair> {
        let bird_center_x = self.bird.shape.center().x;
        match self.pipes.first() {
            Some(first) if first.bottom.center().x - bird_center_x > -30 => Some(first),
            Some(first) => self.pipes.get(1).or(Some(first)),
            None => None,
        }
    }

    fn spawn_pipes(&mut self) {
        let offset = self.rng.gen_range(-GAP_CENTER_MAX_OFFSET..=GAP_CENTER_MAX_OFFSET);
        self.pipes.push(PipePair::new(SCREEN_WIDTH, SCREEN_HEIGHT / 2 + offset));
        self.ticks_since_spawn = 0;
    }

    fn check_pipe_passed(&mut self) {
        let Some(pipe) = self.pipes.first() else {
            return;
        };
        let bird = &self.bird.shape;
        if !self.pipe_entered && bird.min.x > pipe.bottom.min.x && bird.max.x < pipe.bottom.max.x {
            self.pipe_entered = true;
        }
        if self.pipe_entered && bird.min.x > pipe.bottom.max.x {
            self.score += 1;
            self.pipe_entered = false;
            log::trace!("pipe passed, score: {}", self.score);
        }
    }

    fn check_game_end_situation(&mut self) {
        let bird = &self.bird.shape;
        if self.pipes.iter().any(|p| p.collides(bird)) || bird.min.y < 0 || bird.max.y >= PLAYFIELD_HEIGHT {
            self.finished = true;
        }
    }
}
