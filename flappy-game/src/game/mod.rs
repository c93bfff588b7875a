pub mod algebra_2d;
pub mod flappy_environment;
pub mod mechanics;
