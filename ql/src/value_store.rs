use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use num_format::ToFormattedString;
use rustc_hash::FxHashMap;
use tempfile::NamedTempFile;

use crate::format;
use crate::prelude::{FlapAction, QlError};
use crate::state::{StateKey, StateSpace};

/// A failed save is retried that many times
const SAVE_RETRIES: usize = 1;

/// Action-value pair: `[value(no-flap), value(flap)]`
pub type ActionValues = [f64; FlapAction::ACTION_SPACE as usize];

/// What a lookup of a never seeded state yields
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissPolicy {
    /// Unknown states read as `[0, 0]`; the trainer materializes them with its first update
    #[default]
    ZeroDefault,
    /// Unknown states are reported as [QlError::UnknownState]
    FailClosed,
}

/// Durable mapping from state to action-value pair.
///
/// Keys are never removed. The whole mapping is (re-)written on every [Self::save].
pub struct ValueStore {
    values: FxHashMap<StateKey, ActionValues>,
    file: PathBuf,
    miss_policy: MissPolicy,
}

impl ValueStore {
    /// An empty store, which will be persisted to `file`
    pub fn new(file: &Path, miss_policy: MissPolicy) -> Self {
        Self {
            values: FxHashMap::default(),
            file: file.to_path_buf(),
            miss_policy,
        }
    }

    /// Loads the store from `file`.
    /// A missing or unreadable file is not fatal - we start with an empty store then.
    pub fn load(file: &Path, miss_policy: MissPolicy) -> Self {
        let mut store = Self::new(file, miss_policy);
        if !file.exists() {
            log::info!("no value store found at {}; starting empty", file.display());
            return store;
        }
        match read_values(file) {
            Ok(values) => {
                log::info!(
                    "loaded {} states from {}",
                    values.len().to_formatted_string(&format::number_format()),
                    file.display()
                );
                store.values = values;
            }
            Err(e) => log::warn!("could not read value store {}: {:#}; starting empty", file.display(), e),
        }
        store
    }

    /// A store holding a `[0, 0]` pair for every state of `space`
    pub fn seeded(file: &Path, space: &StateSpace, miss_policy: MissPolicy) -> Self {
        let mut store = Self::new(file, miss_policy);
        store.seed(space.keys());
        store
    }

    /// Adds a zero-valued pair for each of `keys` not yet present. Existing values stay untouched.
    pub fn seed(&mut self, keys: impl IntoIterator<Item = StateKey>) {
        for key in keys {
            self.values.entry(key).or_insert([0.0, 0.0]);
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: &StateKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &ActionValues)> {
        self.values.iter()
    }

    pub fn get(&self, key: &StateKey) -> Result<ActionValues> {
        match (self.values.get(key), self.miss_policy) {
            (Some(&values), _) => Ok(values),
            (None, MissPolicy::ZeroDefault) => Ok([0.0, 0.0]),
            (None, MissPolicy::FailClosed) => Err(QlError::UnknownState(*key).into()),
        }
    }

    pub fn value(&self, key: &StateKey, action: FlapAction) -> Result<f64> {
        Ok(self.get(key)?[action.index()])
    }

    /// Highest action-value of that state
    pub fn max_value(&self, key: &StateKey) -> Result<f64> {
        let [no_flap, flap] = self.get(key)?;
        Ok(f64::max(no_flap, flap))
    }

    pub(crate) fn set(&mut self, key: StateKey, action: FlapAction, value: f64) -> Result<()> {
        if self.miss_policy == MissPolicy::FailClosed && !self.values.contains_key(&key) {
            return Err(QlError::UnknownState(key).into());
        }
        self.values.entry(key).or_insert([0.0, 0.0])[action.index()] = value;
        Ok(())
    }

    /// Writes the whole mapping (atomically replacing the file).
    /// A failed attempt is retried (once by default) before the error is surfaced.
    pub fn save(&self) -> Result<()> {
        let attempts = 1 + SAVE_RETRIES;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.write_file() {
                Ok(()) => {
                    log::info!(
                        "value store with {} states written to {}",
                        self.values.len().to_formatted_string(&format::number_format()),
                        self.file.display()
                    );
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("attempt {}/{} to write value store failed: {:#}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
        }
        Err(QlError::Persistence {
            path: self.file.clone(),
            attempts,
            message: last_error.map(|e| format!("{:#}", e)).unwrap_or_default(),
        }
            .into())
    }

    fn write_file(&self) -> Result<()> {
        let dir = match self.file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;

        let mut temp_file = NamedTempFile::new_in(dir).with_context(|| format!("creating temp file in {}", dir.display()))?;
        {
            let mut writer = BufWriter::new(temp_file.as_file_mut());
            serde_json::to_writer(&mut writer, &self.values)?;
            writer.flush()?;
        }
        temp_file
            .persist(&self.file)
            .map_err(|e| e.error)
            .with_context(|| format!("replacing {}", self.file.display()))?;
        Ok(())
    }
}

fn read_values(file: &Path) -> Result<FxHashMap<StateKey, ActionValues>> {
    let reader = BufReader::new(File::open(file)?);
    let values = serde_json::from_reader(reader)?;
    Ok(values)
}
