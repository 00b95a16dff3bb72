//! Key-value persistence of session summaries.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::card::FlashcardsSessionSummary;
use super::search::build_flashcards_last_report_storage_key;
use super::summary::sanitize_flashcard_ids;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to access store {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode store: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String-to-string storage with last-write-wins semantics.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten after every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens `path`, starting empty when the file does not exist yet. A file
    /// that is not a JSON object of strings is moved to `<path>.corrupt` and
    /// the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("store {} is unreadable, starting empty: {}", path.display(), e);
                set_aside(&path);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        log::debug!("opened store {} with {} entries", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let raw = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, raw).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".corrupt");
    PathBuf::from(name)
}

fn set_aside(path: &Path) {
    let target = corrupt_path(path);
    match fs::rename(path, &target) {
        Ok(()) => log::info!("moved unreadable store to {}", target.display()),
        Err(e) => log::warn!("failed to move {} aside: {}", path.display(), e),
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSummary {
    confirm_ids: Vec<String>,
    pass_ids: Vec<String>,
    saved_at: i64,
}

/// Saves `summary` under `key`; a summary without ids removes the key.
pub fn store_flashcards_session_summary(
    store: &mut dyn KeyValueStore,
    key: &str,
    summary: &FlashcardsSessionSummary,
) -> Result<(), StorageError> {
    let confirm_ids = sanitize_flashcard_ids(&summary.confirm_ids);
    let pass_ids = sanitize_flashcard_ids(&summary.pass_ids);
    if confirm_ids.is_empty() && pass_ids.is_empty() {
        return store.remove(key);
    }

    let envelope = StoredSummary {
        confirm_ids,
        pass_ids,
        saved_at: Utc::now().timestamp_millis(),
    };
    store.set(key, serde_json::to_string(&envelope)?)
}

fn string_ids(value: Option<&Value>) -> Vec<String> {
    let ids: Vec<&str> = value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    sanitize_flashcard_ids(&ids)
}

/// Reads the summary under `key`. Missing, malformed or empty entries are
/// `None`; non-string ids inside the lists are skipped.
pub fn load_flashcards_session_summary(store: &dyn KeyValueStore, key: &str) -> Option<FlashcardsSessionSummary> {
    let raw = store.get(key).filter(|raw| !raw.is_empty())?;

    let parsed: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("ignoring corrupt summary under {}: {}", key, e);
            return None;
        }
    };
    let Some(object) = parsed.as_object() else {
        log::warn!("ignoring summary under {}: not an object", key);
        return None;
    };

    let summary = FlashcardsSessionSummary::new(
        string_ids(object.get("confirmIds")),
        string_ids(object.get("passIds")),
    );
    if summary.is_empty() {
        None
    } else {
        Some(summary)
    }
}

pub fn store_flashcards_last_report_summary(
    store: &mut dyn KeyValueStore,
    locale: &str,
    summary: &FlashcardsSessionSummary,
) -> Result<(), StorageError> {
    store_flashcards_session_summary(store, &build_flashcards_last_report_storage_key(locale), summary)
}

pub fn load_flashcards_last_report_summary(
    store: &dyn KeyValueStore,
    locale: &str,
) -> Option<FlashcardsSessionSummary> {
    load_flashcards_session_summary(store, &build_flashcards_last_report_storage_key(locale))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(confirm: &[&str], pass: &[&str]) -> FlashcardsSessionSummary {
        FlashcardsSessionSummary::new(
            confirm.iter().map(|v| v.to_string()).collect(),
            pass.iter().map(|v| v.to_string()).collect(),
        )
    }

    #[test]
    fn stores_envelope_and_loads_it_back() {
        let mut store = MemoryStore::new();
        store_flashcards_session_summary(&mut store, "k", &summary(&["a", "a", " "], &["b"])).unwrap();

        let raw: Value = serde_json::from_str(&store.get("k").unwrap()).unwrap();
        assert_eq!(raw["confirmIds"], serde_json::json!(["a"]));
        assert_eq!(raw["passIds"], serde_json::json!(["b"]));
        assert!(raw["savedAt"].as_i64().unwrap() > 0);

        assert_eq!(load_flashcards_session_summary(&store, "k"), Some(summary(&["a"], &["b"])));
    }

    #[test]
    fn empty_summary_removes_key() {
        let mut store = MemoryStore::new();
        store_flashcards_session_summary(&mut store, "k", &summary(&["a"], &[])).unwrap();
        assert_eq!(store.len(), 1);

        store_flashcards_session_summary(&mut store, "k", &summary(&[], &[""])).unwrap();
        assert!(store.get("k").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_entries_load_as_none() {
        let mut store = MemoryStore::new();
        for (key, raw) in [
            ("garbage", "{not json"),
            ("array", "[1, 2]"),
            ("null", "null"),
            ("empty", r#"{"confirmIds": [], "passIds": [""]}"#),
        ] {
            store.set(key, raw.to_string()).unwrap();
            assert_eq!(load_flashcards_session_summary(&store, key), None, "{}", key);
        }

        store
            .set("mixed", r#"{"confirmIds": ["a", 3, null], "passIds": "b"}"#.to_string())
            .unwrap();
        assert_eq!(load_flashcards_session_summary(&store, "mixed"), Some(summary(&["a"], &[])));
        assert_eq!(load_flashcards_session_summary(&store, "absent"), None);
    }

    #[test]
    fn last_report_is_keyed_by_locale() {
        let mut store = MemoryStore::new();
        store_flashcards_last_report_summary(&mut store, "en", &summary(&["a"], &["b"])).unwrap();
        assert!(store.get("open-physica:flashcards:last-report:v1:en").is_some());
        assert_eq!(load_flashcards_last_report_summary(&store, "it"), None);
        assert_eq!(
            load_flashcards_last_report_summary(&store, "EN"),
            Some(summary(&["a"], &["b"]))
        );
    }

    #[test]
    fn file_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("store.json");

        let mut store = FileStore::open(&path).unwrap();
        store_flashcards_session_summary(&mut store, "k", &summary(&["a"], &["b"])).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(load_flashcards_session_summary(&reopened, "k"), Some(summary(&["a"], &["b"])));

    }

    #[test]
    fn unreadable_file_store_starts_empty_and_is_set_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[").unwrap();

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(load_flashcards_session_summary(&store, "k"), None);
        assert_eq!(fs::read_to_string(dir.path().join("store.json.corrupt")).unwrap(), "[");
        assert!(!path.exists());

        store_flashcards_session_summary(&mut store, "k", &summary(&["a"], &[])).unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(load_flashcards_session_summary(&reopened, "k"), Some(summary(&["a"], &[])));
    }
}
