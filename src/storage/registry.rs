//! Durable registry store
//!
//! Persists [`RegistryState`] as a pretty-printed JSON document.
//!
//! # Features
//!
//! - Atomic save (write to a temp file, then rename)
//! - Load with repair: every section is decoded on its own and falls back to
//!   its default, so hand-edited documents with missing keys still load
//! - Corrupt documents are preserved as `<name>.corrupt-<timestamp>` before a
//!   fresh state replaces them
//! - Operator maintenance resets
//!
//! # Example
//!
//! ```no_run
//! use homily::storage::RegistryStore;
//!
//! # fn example() -> Result<(), homily::error::RegistryError> {
//! let store = RegistryStore::new("data/registry.json");
//! let mut state = store.load()?;
//! state.reset_recent_window();
//! store.save(&state)?;
//! # Ok(())
//! # }
//! ```

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::state::{RegistryState, SCHEMA_VERSION};
use crate::models::PublicationRecord;
use crate::utils::error::RegistryError;

/// Which part of the registry a maintenance reset clears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Recent window only
    Recent,
    /// Used references and harvest events
    Harvest,
    /// History, statistics and cursors
    History,
    /// Everything
    All,
}

impl ResetScope {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Harvest => "harvest",
            Self::History => "history",
            Self::All => "all",
        }
    }

    /// What the reset does, for confirmation prompts
    pub fn description(&self) -> &'static str {
        match self {
            Self::Recent => "forget the recent window so any primary item may be picked again",
            Self::Harvest => "forget used references so the harvest source is rescanned",
            Self::History => "clear publication history, statistics and cursors",
            Self::All => "replace the registry with an empty one",
        }
    }
}

impl fmt::Display for ResetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ResetScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recent" | "window" => Ok(Self::Recent),
            "harvest" => Ok(Self::Harvest),
            "history" => Ok(Self::History),
            "all" | "wipe" => Ok(Self::All),
            other => Err(format!(
                "unknown reset scope '{other}' (expected recent, harvest, history or all)"
            )),
        }
    }
}

/// File-backed registry store
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// Create a store for the document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the registry document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, repairing what can be repaired
    ///
    /// A missing or structurally invalid document yields a fresh state. Only
    /// genuine I/O failures are returned as errors.
    pub fn load(&self) -> Result<RegistryState, RegistryError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No registry found, starting fresh");
                return Ok(RegistryState::new());
            }
            Err(e) => return Err(RegistryError::io(&self.path, e)),
        };

        match decode_document(&raw) {
            Ok(state) => {
                debug!(
                    path = %self.path.display(),
                    history = state.history.len(),
                    "Registry loaded"
                );
                Ok(state)
            }
            Err(reason) => {
                let corrupt = RegistryError::Corrupt {
                    path: self.path.clone(),
                    reason,
                };
                warn!(error = %corrupt, "Registry is corrupt, starting fresh");
                self.preserve_corrupt()?;
                Ok(RegistryState::new())
            }
        }
    }

    /// Atomically persist the registry
    pub fn save(&self, state: &RegistryState) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
        }

        // Write to temp file first, then rename (atomic)
        let temp_path = self.temp_path();
        let file = File::create(&temp_path).map_err(|e| RegistryError::io(&temp_path, e))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state)?;
        writer
            .flush()
            .map_err(|e| RegistryError::io(&temp_path, e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| RegistryError::io(&temp_path, e))?;

        fs::rename(&temp_path, &self.path).map_err(|e| RegistryError::io(&self.path, e))?;

        debug!(path = %self.path.display(), "Registry saved");
        Ok(())
    }

    /// Apply a maintenance reset and persist the result
    pub fn reset(&self, scope: ResetScope) -> Result<RegistryState, RegistryError> {
        let mut state = self.load()?;

        match scope {
            ResetScope::Recent => state.reset_recent_window(),
            ResetScope::Harvest => state.reset_harvest_cursor(),
            ResetScope::History => state.reset_history(),
            ResetScope::All => state = RegistryState::new(),
        }

        self.save(&state)?;
        info!(scope = %scope, "Registry reset");
        Ok(state)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "registry.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn preserve_corrupt(&self) -> Result<PathBuf, RegistryError> {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "registry.json".into());
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S")));
        let backup = self.path.with_file_name(name);

        fs::rename(&self.path, &backup).map_err(|e| RegistryError::io(&backup, e))?;
        warn!(backup = %backup.display(), "Corrupt registry preserved");
        Ok(backup)
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a registry document section by section
///
/// Returns `Err(reason)` only when the bytes are not a JSON object at all,
/// invalid UTF-8 included.
fn decode_document(raw: &[u8]) -> Result<RegistryState, String> {
    let value: Value = serde_json::from_slice(raw).map_err(|e| e.to_string())?;
    let Value::Object(map) = value else {
        return Err("top-level value is not an object".to_string());
    };

    let defaults = RegistryState::new();
    let state = RegistryState {
        schema_version: map
            .get("schema_version")
            .and_then(Value::as_u64)
            .map_or(1, |v| v.min(u64::from(SCHEMA_VERSION)) as u32),
        history: decode_history(&map),
        rotation: section(&map, "rotation", defaults.rotation.clone()),
        harvest: section(&map, "harvest", defaults.harvest.clone()),
        rate_gate: section(&map, "rate_gate", defaults.rate_gate),
        alternation: section(&map, "alternation", defaults.alternation),
        stats: section(&map, "stats", defaults.stats.clone()),
        pending_moves: section(&map, "pending_moves", Vec::new()),
    };

    Ok(state.migrate())
}

fn section<T: DeserializeOwned>(map: &Map<String, Value>, key: &str, default: T) -> T {
    match map.get(key) {
        None | Some(Value::Null) => default,
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(section = key, error = %e, "Invalid registry section, using default");
                default
            }
        },
    }
}

/// Decode history records one by one, dropping the ones that do not parse
fn decode_history(map: &Map<String, Value>) -> Vec<PublicationRecord> {
    let Some(Value::Array(entries)) = map.get("history") else {
        return Vec::new();
    };

    let mut history = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<PublicationRecord>(entry.clone()) {
            Ok(record) => history.push(record),
            Err(e) => warn!(index = index, error = %e, "Dropping unreadable history record"),
        }
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ContentItem, Outcome};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> RegistryStore {
        RegistryStore::new(dir.path().join("data").join("registry.json"))
    }

    #[test]
    fn test_missing_registry_is_fresh() {
        let dir = TempDir::new().unwrap();
        let state = store(&dir).load().unwrap();
        assert_eq!(state, RegistryState::new());
    }

    #[test]
    fn test_save_load_preserves_state() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut state = RegistryState::new();
        let item = ContentItem::text("a.txt", "Grace and peace");
        state.record_success(
            PublicationRecord::new(Utc::now(), &item, Outcome::Success, 1, 900),
            5,
        );
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.alternation.last_category, Some(Category::Primary));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_corrupt_registry_is_preserved() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        let state = store.load().unwrap();
        assert_eq!(state, RegistryState::new());

        let backups: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_reset_all() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut state = RegistryState::new();
        state.harvest.next_number = 12;
        store.save(&state).unwrap();

        let state = store.reset(ResetScope::All).unwrap();
        assert_eq!(state.harvest.next_number, 1);
        assert_eq!(store.load().unwrap().harvest.next_number, 1);
    }

    #[test]
    fn test_reset_scope_from_str() {
        assert_eq!("recent".parse::<ResetScope>().unwrap(), ResetScope::Recent);
        assert_eq!("ALL".parse::<ResetScope>().unwrap(), ResetScope::All);
        assert!("everything".parse::<ResetScope>().is_err());
    }
}
