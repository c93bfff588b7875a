use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{SCORES_JSON_FILE_NAME, SCORES_PLOT_FILE_NAME, SCORES_TEXT_FILE_NAME};

pub mod plot;

/// number of most recent games in the smoothed mean
const SMOOTHING_WINDOW: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AverageKind {
    /// mean over all games so far
    #[default]
    Running,
    /// plain mean for the first games, then a sine-weighted mean over the last 100
    Smoothed,
}

impl Display for AverageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AverageKind::Running => write!(f, "Average"),
            AverageKind::Smoothed => write!(f, "Weighted mean"),
        }
    }
}

/// Scores of a training run, one per game, with an average series of the same length
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub scores: Vec<u32>,
    pub averages: Vec<f64>,
    pub average_kind: AverageKind,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_running_averages(scores: Vec<u32>) -> Self {
        Self {
            averages: running_averages(&scores),
            scores,
            average_kind: AverageKind::Running,
        }
    }

    pub fn with_smoothed_averages(scores: Vec<u32>) -> Self {
        Self {
            averages: smoothed_averages(&scores),
            scores,
            average_kind: AverageKind::Smoothed,
        }
    }

    /// Appends the score of a finished game (running average)
    pub fn push(&mut self, score: u32) {
        self.scores.push(score);
        let n = self.scores.len() as f64;
        let previous = self.averages.last().copied().unwrap_or(0.0);
        self.averages.push(previous + (score as f64 - previous) / n);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Best score and the 1-based number of the first game reaching it
    pub fn max_score(&self) -> Option<(u32, usize)> {
        self.scores
            .iter()
            .copied()
            .enumerate()
            // max_by_key returns the last maximum
            .rev()
            .max_by_key(|&(_, score)| score)
            .map(|(idx, score)| (score, idx + 1))
    }

    pub fn final_average(&self) -> Option<f64> {
        self.averages.last().copied()
    }

    /// Text layout, readable by [Self::parse_text]
    pub fn to_text(&self) -> String {
        let (max_score, max_game) = self.max_score().unwrap_or((0, 0));
        format!(
            "Max score: {} at game: {}\nAverage at the end: {}\nScores:\n[{}]\nAverages:\n[{}]",
            max_score,
            max_game,
            self.final_average().unwrap_or(0.0),
            self.scores.iter().join(", "),
            self.averages.iter().map(|a| format!("{:?}", a)).join(", "),
        )
    }

    /// Reads the score list back (fourth line); averages are recomputed by the caller
    pub fn parse_text(text: &str) -> Result<Vec<u32>> {
        let line = text
            .lines()
            .nth(3)
            .ok_or_else(|| anyhow!("scores line missing"))?
            .trim();
        let list = line
            .strip_prefix('[')
            .and_then(|l| l.strip_suffix(']'))
            .ok_or_else(|| anyhow!("malformed scores line: '{}'", line))?
            .trim();
        if list.is_empty() {
            return Ok(vec![]);
        }
        list.split(',')
            .map(|s| s.trim().parse::<u32>().with_context(|| format!("invalid score '{}'", s.trim())))
            .collect()
    }

    pub fn read_scores(file: &Path) -> Result<Vec<u32>> {
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
        Self::parse_text(&text)
    }

    pub fn write_text(&self, file: &Path) -> Result<()> {
        fs::write(file, self.to_text()).with_context(|| format!("failed to write {}", file.display()))
    }

    pub fn write_json(&self, file: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(file).with_context(|| format!("failed to create {}", file.display()))?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes text, json and plot into `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        self.write_text(&dir.join(SCORES_TEXT_FILE_NAME))?;
        self.write_json(&dir.join(SCORES_JSON_FILE_NAME))?;
        plot::plot_scores(self, &dir.join(SCORES_PLOT_FILE_NAME))?;
        log::info!("run summary of {} games written to {}", self.len(), dir.display());
        Ok(())
    }
}

pub fn running_averages(scores: &[u32]) -> Vec<f64> {
    scores
        .iter()
        .scan(0_u64, |sum, &score| {
            *sum += score as u64;
            Some(*sum)
        })
        .enumerate()
        .map(|(idx, sum)| sum as f64 / (idx + 1) as f64)
        .collect()
}

/// Weights for the smoothed mean, most recent game first.
/// Rising half sine wave: 1.0 for the most recent game, close to 0 for the oldest
fn smoothing_weights() -> Vec<f64> {
    (1..=SMOOTHING_WINDOW)
        .rev()
        .map(|i| ((PI * (i as f64 / SMOOTHING_WINDOW as f64) - FRAC_PI_2).sin() + 1.0) / 2.0)
        .collect()
}

pub fn smoothed_averages(scores: &[u32]) -> Vec<f64> {
    let weights = smoothing_weights();
    let weight_sum: f64 = weights.iter().sum();
    let running = running_averages(scores);
    (0..scores.len())
        .map(|idx| {
            if idx < SMOOTHING_WINDOW {
                running[idx]
            } else {
                weights
                    .iter()
                    .enumerate()
                    .map(|(i, w)| w * scores[idx - i] as f64)
                    .sum::<f64>()
                    / weight_sum
            }
        })
        .collect()
}
