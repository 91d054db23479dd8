use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Minimum number of words a new entry body must contain.
pub const MIN_WORDS: usize = 10;

/// Which source produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Static,
    Local,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub id: Option<String>,
    pub origin: Origin,
    pub title: String,
    pub content: String,
    pub date: String,
}

impl JournalEntry {
    pub fn new_static(title: String, content: String, date: String) -> Self {
        JournalEntry {
            id: None,
            origin: Origin::Static,
            title,
            content,
            date,
        }
    }

    pub fn new_local(id: String, title: String, content: String, date: String) -> Self {
        JournalEntry {
            id: Some(id),
            origin: Origin::Local,
            title,
            content,
            date,
        }
    }

    pub fn is_mutable(&self) -> bool {
        self.origin == Origin::Local
    }

    /// Stable identity used by the view layer to attach per-entry UI state.
    pub fn key(&self) -> EntryKey {
        EntryKey {
            origin: self.origin,
            ident: match &self.id {
                Some(id) => id.clone(),
                None => self.title.trim().to_string(),
            },
        }
    }

    /// Line shown under the header when the entry is expanded.
    pub fn meta_line(&self) -> String {
        match self.origin {
            Origin::Json => format!("Added via Python Backend • {}", self.date),
            _ => format!("Posted on: {}", self.date),
        }
    }
}

/// `(origin, id-or-title)`, unique across the rendered journal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub origin: Origin,
    pub ident: String,
}

/// Persisted shape of a local entry under the `journalEntries` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub title: String,
    pub content: String,
    pub date: String,
    #[serde(rename = "isNew", default = "default_is_new")]
    pub is_new: bool,
    #[serde(default)]
    pub id: Option<String>,
}

fn default_is_new() -> bool {
    true
}

impl From<&JournalEntry> for LocalRecord {
    fn from(entry: &JournalEntry) -> Self {
        LocalRecord {
            title: entry.title.clone(),
            content: entry.content.clone(),
            date: entry.date.clone(),
            is_new: true,
            id: entry.id.clone(),
        }
    }
}

impl From<LocalRecord> for JournalEntry {
    fn from(record: LocalRecord) -> Self {
        JournalEntry {
            id: record.id,
            origin: Origin::Local,
            title: record.title,
            content: record.content,
            date: record.date,
        }
    }
}

/// One element of the reflections file maintained by the offline script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub name: String,
    pub date: String,
    pub reflection: String,
}

impl Reflection {
    pub fn synthesized_title(&self) -> String {
        format!("Python Entry: {} - {}", self.date, self.name)
    }

    pub fn to_entry(&self) -> JournalEntry {
        JournalEntry {
            id: None,
            origin: Origin::Json,
            title: self.synthesized_title(),
            content: self.reflection.clone(),
            date: self.date.clone(),
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Long US date, e.g. `October 18, 2026`.
pub fn display_date(now: DateTime<Local>) -> String {
    now.format("%B %-d, %Y").to_string()
}

pub fn local_id(millis: i64) -> String {
    format!("entry-{millis}")
}
