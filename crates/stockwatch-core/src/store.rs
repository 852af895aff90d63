//! JSON files in the watch directory.
//!
//! | File | Content | Missing file |
//! |------|---------|--------------|
//! | `stocks.json` | symbol → rule | error |
//! | `.stockwatch-settings.json` | [`SettingsFile`] | defaults |
//! | `.stockwatch-state.json` | symbol → alert state | empty |
//!
//! Rules are validated entry by entry: a bad entry is reported next to the
//! rules that did load. Only a file that cannot be read or parsed as a JSON
//! object fails as a whole.
//!
//! State is written whole through a temporary file in the same directory
//! that is renamed over the target, so a crash mid-write leaves the previous
//! state intact.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::alert::{AlertStates, RejectedRule, RuleEncoding, RuleSet};
use crate::config::SettingsFile;
use crate::{StoreError, Symbol, ValidationError};

pub const RULES_FILE: &str = "stocks.json";
pub const SETTINGS_FILE: &str = ".stockwatch-settings.json";
pub const STATE_FILE: &str = ".stockwatch-state.json";

const RULE_SHAPE: &str = "expected a threshold number or {\"threshold\", \"direction\"} record";

/// Outcome of reading the rules file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedRules {
    pub rules: RuleSet,
    pub rejected: Vec<RejectedRule>,
}

impl LoadedRules {
    /// Whether the file names `symbol`, with a valid rule or not.
    pub fn mentions(&self, symbol: &Symbol) -> bool {
        self.rules.contains(symbol)
            || self
                .rejected
                .iter()
                .any(|entry| entry.symbol().as_ref() == Some(symbol))
    }
}

/// Reads and writes the watch directory's files.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn rules_path(&self) -> PathBuf {
        self.dir.join(RULES_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Load and validate the rules file. Unlike the other files, a missing
    /// rules file is an error: there is nothing to watch.
    pub fn load_rules(&self) -> Result<LoadedRules, StoreError> {
        let path = self.rules_path();
        let raw: BTreeMap<String, serde_json::Value> =
            read_json(&path)?.ok_or_else(|| StoreError::NotFound { path: path.clone() })?;

        let mut malformed = Vec::new();
        let mut encoded = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            match serde_json::from_value::<RuleEncoding>(value) {
                Ok(encoding) => encoded.push((key, encoding)),
                Err(_) => malformed.push(RejectedRule {
                    error: ValidationError::InvalidRule {
                        symbol: Symbol::parse(&key)
                            .map(|symbol| symbol.to_string())
                            .unwrap_or_else(|_| key.trim().to_owned()),
                        reason: RULE_SHAPE.to_owned(),
                    },
                    key,
                }),
            }
        }

        let (rules, mut rejected) = RuleSet::from_encoded(encoded);
        rejected.extend(malformed);
        Ok(LoadedRules { rules, rejected })
    }

    pub fn load_settings(&self) -> Result<SettingsFile, StoreError> {
        Ok(read_json(&self.settings_path())?.unwrap_or_default())
    }

    pub fn load_state(&self) -> Result<AlertStates, StoreError> {
        Ok(read_json(&self.state_path())?.unwrap_or_default())
    }

    /// Replace the state file atomically.
    pub fn save_state(&self, states: &AlertStates) -> Result<(), StoreError> {
        let path = self.state_path();
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        let body = serde_json::to_vec_pretty(states).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;

        let mut file = NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        file.write_all(&body).map_err(io_error)?;
        file.write_all(b"\n").map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(&path).map_err(|error| io_error(error.error))?;
        Ok(())
    }
}

/// `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if body.trim().is_empty() {
        return Err(StoreError::Empty {
            path: path.to_path_buf(),
        });
    }

    serde_json::from_str(&body)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}
