use crate::journal_entry::JournalEntry;
use crate::remote::{RemoteSource, DEFAULT_REMOTE};
use crate::storage::Theme;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG: &str = "journal.toml";

#[derive(Parser, Debug)]
#[command(name = "journal", about = "Read and write reflection journal entries", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Durable store holding local entries and the theme
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Reflections resource: a file path or an http(s) URL
    #[arg(long, global = true)]
    pub remote: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive journal (default)
    Tui,
    /// Write the journal as an HTML page
    Render(RenderArgs),
    /// Fetch the reflections and save them to the export file
    Export(ExportArgs),
    /// Print entry counts per origin
    Stats,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Directory for the export file; the configured export dir when omitted
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticEntry {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub date: String,
}

impl From<StaticEntry> for JournalEntry {
    fn from(entry: StaticEntry) -> Self {
        JournalEntry::new_static(entry.title, entry.content, entry.date)
    }
}

/// Contents of `journal.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub remote: String,
    pub export_dir: PathBuf,
    pub log_file: PathBuf,
    pub default_theme: Theme,
    /// Delay before a confirmed deletion starts removing the entry.
    pub delete_processing_ms: u64,
    pub removal_animation_ms: u64,
    pub notification_ms: u64,
    pub static_entries: Vec<StaticEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: PathBuf::from("journal_store.json"),
            remote: DEFAULT_REMOTE.to_string(),
            export_dir: PathBuf::from("."),
            log_file: PathBuf::from("journal.log"),
            default_theme: Theme::Light,
            delete_processing_ms: 1000,
            removal_animation_ms: 500,
            notification_ms: 3000,
            static_entries: Vec::new(),
        }
    }
}

impl Config {
    /// Loads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Config::default())
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the file named on the command line and applies flag overrides.
    pub fn from_cli(cli: &Cli) -> Result<Config, ConfigError> {
        let mut config = Config::load(&cli.config)?;
        if let Some(store) = &cli.store {
            config.store_path = store.clone();
        }
        if let Some(remote) = &cli.remote {
            config.remote = remote.clone();
        }
        Ok(config)
    }

    pub fn remote_source(&self) -> RemoteSource {
        RemoteSource::parse(&self.remote)
    }

    pub fn static_journal(&self) -> Vec<JournalEntry> {
        self.static_entries
            .iter()
            .cloned()
            .map(JournalEntry::from)
            .collect()
    }

    pub fn timings(&self) -> Timings {
        Timings {
            delete_processing: Duration::from_millis(self.delete_processing_ms),
            removal_animation: Duration::from_millis(self.removal_animation_ms),
            notification: Duration::from_millis(self.notification_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub delete_processing: Duration,
    pub removal_animation: Duration,
    pub notification: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Config::default().timings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("journal.toml")).unwrap();
        assert_eq!(config.remote, "backend/reflections.json");
        assert_eq!(config.default_theme, Theme::Light);
        assert!(config.static_entries.is_empty());
        assert_eq!(config.timings().delete_processing, Duration::from_millis(1000));
    }

    #[test]
    fn parses_static_entries_and_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.toml");
        fs::write(
            &path,
            r#"
store_path = "data/store.json"
default_theme = "dark"
notification_ms = 100

[[static_entries]]
title = "Week 1"
content = "Intro to the course"
date = "Jan 8"

[[static_entries]]
title = "Week 2"
content = "More"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store_path, PathBuf::from("data/store.json"));
        assert_eq!(config.default_theme, Theme::Dark);
        assert_eq!(config.timings().notification, Duration::from_millis(100));
        assert_eq!(config.remote, DEFAULT_REMOTE);

        let entries = config.static_journal();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Week 1");
        assert_eq!(entries[0].date, "Jan 8");
        assert_eq!(entries[1].date, "");
        assert!(entries.iter().all(|e| !e.is_mutable()));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.toml");
        fs::write(&path, "store_path = [").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn cli_flags_override_the_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("journal.toml");
        let cli = Cli::parse_from([
            "journal",
            "--config",
            config_path.to_str().unwrap(),
            "--store",
            "other.json",
            "--remote",
            "https://example.org/reflections.json",
            "stats",
        ]);
        assert!(matches!(cli.command, Some(Command::Stats)));

        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.store_path, PathBuf::from("other.json"));
        assert_eq!(
            config.remote_source(),
            RemoteSource::Http("https://example.org/reflections.json".into())
        );
    }
}
