use crate::journal_entry::{JournalEntry, LocalRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

pub const ENTRIES_KEY: &str = "journalEntries";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not encode journal entries: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key-value slots, the same shape as a browser's local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    /// All stored `(key, value)` pairs.
    fn entries(&self) -> Vec<(String, String)>;
}

/// In-memory store. Backs the session copy of the theme.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.slots.insert(key.to_string(), value);
        Ok(())
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.slots
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Durable store kept as a single JSON object file. Every `set` rewrites the
/// whole file through a sibling temp file and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    slots: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store; an
    /// unreadable or malformed one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let slots = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(slots) => slots,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "durable store is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read durable store, starting empty");
                BTreeMap::new()
            }
        };
        FileStore { path, slots }
    }

    fn flush(&self) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(&self.slots)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|source| StorageError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let previous = self.slots.insert(key.to_string(), value);
        if let Err(err) = self.flush() {
            match previous {
                Some(old) => self.slots.insert(key.to_string(), old),
                None => self.slots.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.slots
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Theme> {
        match value.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageInfo {
    pub theme: Theme,
    pub saved_entries: usize,
    /// Sum of stored value lengths in KB.
    pub usage_kb: f64,
}

impl StorageInfo {
    pub fn usage_label(&self) -> String {
        format!("{:.2}", self.usage_kb)
    }
}

/// Reads and writes the local origin and the theme preference.
pub struct Persistence {
    durable: Box<dyn KeyValueStore + Send>,
    session: MemoryStore,
    default_theme: Theme,
}

impl Persistence {
    pub fn new(durable: Box<dyn KeyValueStore + Send>, default_theme: Theme) -> Self {
        Persistence {
            durable,
            session: MemoryStore::default(),
            default_theme,
        }
    }

    /// Loads the saved local entries. Missing or corrupt data yields an empty
    /// collection.
    pub fn load_local(&self) -> Vec<JournalEntry> {
        let Some(raw) = self.durable.get(ENTRIES_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<LocalRecord>>(&raw) {
            Ok(records) => {
                info!(count = records.len(), "loaded local entries");
                records.into_iter().map(JournalEntry::from).collect()
            }
            Err(err) => {
                warn!(error = %err, "error parsing saved entries, ignoring them");
                Vec::new()
            }
        }
    }

    /// Overwrites the entries slot with the full local collection.
    pub fn save_local(&mut self, entries: &[JournalEntry]) -> Result<(), StorageError> {
        let records: Vec<LocalRecord> = entries.iter().map(LocalRecord::from).collect();
        let serialized = serde_json::to_string(&records)?;
        self.durable.set(ENTRIES_KEY, serialized)?;
        info!(count = records.len(), "saved local entries");
        Ok(())
    }

    pub fn load_theme(&self) -> Theme {
        self.durable
            .get(THEME_KEY)
            .and_then(|v| Theme::parse(&v))
            .or_else(|| self.session.get(THEME_KEY).and_then(|v| Theme::parse(&v)))
            .unwrap_or(self.default_theme)
    }

    /// Writes the theme to both the durable and the session store.
    pub fn save_theme(&mut self, theme: Theme) -> Result<(), StorageError> {
        self.session.set(THEME_KEY, theme.as_str().to_string())?;
        self.durable.set(THEME_KEY, theme.as_str().to_string())
    }

    pub fn storage_info(&self) -> StorageInfo {
        let saved_entries = self
            .durable
            .get(ENTRIES_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<serde_json::Value>>(&raw).ok())
            .map_or(0, |v| v.len());
        let bytes: usize = self.durable.entries().iter().map(|(_, v)| v.len()).sum();
        StorageInfo {
            theme: self.load_theme(),
            saved_entries,
            usage_kb: bytes as f64 / 1024.0,
        }
    }
}
