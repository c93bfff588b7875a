use std::path::PathBuf;

use lazy_static::lazy_static;

pub mod game;
pub mod report;
pub mod training;

pub const QVALUES_FILE_NAME: &str = "qvalues.json";
pub const SCORES_TEXT_FILE_NAME: &str = "scores.txt";
pub const SCORES_JSON_FILE_NAME: &str = "scores.json";
pub const SCORES_PLOT_FILE_NAME: &str = "scores.svg";

#[rustfmt::skip]
lazy_static! {
    /// relative to the working directory
    pub static ref DEFAULT_DATA_DIR: PathBuf = PathBuf::from("data");
    pub static ref DEFAULT_SCORES_FILE: PathBuf = DEFAULT_DATA_DIR.join(SCORES_TEXT_FILE_NAME);
}
