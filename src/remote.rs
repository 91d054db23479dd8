use crate::journal_entry::Reflection;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_REMOTE: &str = "backend/reflections.json";
pub const EXPORT_FILE_NAME: &str = "journal_reflections_export.json";

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("HTTP error! status: {0}")]
    Status(reqwest::StatusCode),
    #[error("could not parse reflections: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("could not write {path}: {source}")]
    Export {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where the reflections file lives: a path next to the journal, or a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSource {
    File(PathBuf),
    Http(String),
}

impl RemoteSource {
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            RemoteSource::Http(source.to_string())
        } else {
            RemoteSource::File(PathBuf::from(source))
        }
    }

    /// One read of the resource. Errors are returned so a manual refresh can
    /// show them.
    pub async fn try_fetch(&self, client: &reqwest::Client) -> Result<Vec<Reflection>, RemoteError> {
        let reflections: Vec<Reflection> = match self {
            RemoteSource::File(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| RemoteError::Read {
                        path: path.clone(),
                        source,
                    })?;
                serde_json::from_str(&text)?
            }
            RemoteSource::Http(url) => {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|source| RemoteError::Request {
                        url: url.clone(),
                        source,
                    })?;
                if !response.status().is_success() {
                    return Err(RemoteError::Status(response.status()));
                }
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|source| RemoteError::Request {
                        url: url.clone(),
                        source,
                    })?;
                serde_json::from_slice(&bytes)?
            }
        };
        info!(count = reflections.len(), source = %self, "fetched json reflections");
        Ok(reflections)
    }

    /// Like [`RemoteSource::try_fetch`], but an unreachable or malformed
    /// resource counts as zero reflections.
    pub async fn fetch(&self, client: &reqwest::Client) -> Vec<Reflection> {
        match self.try_fetch(client).await {
            Ok(reflections) => reflections,
            Err(err) => {
                warn!(error = %err, source = %self, "error fetching json reflections");
                Vec::new()
            }
        }
    }
}

impl fmt::Display for RemoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteSource::File(path) => write!(f, "{}", path.display()),
            RemoteSource::Http(url) => f.write_str(url),
        }
    }
}

/// Writes the fetched collection as pretty JSON into `dir`.
pub fn export_snapshot(reflections: &[Reflection], dir: &Path) -> Result<PathBuf, RemoteError> {
    let path = dir.join(EXPORT_FILE_NAME);
    let text = serde_json::to_string_pretty(reflections)?;
    std::fs::create_dir_all(dir).map_err(|source| RemoteError::Export {
        path: dir.to_path_buf(),
        source,
    })?;
    std::fs::write(&path, text).map_err(|source| RemoteError::Export {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), count = reflections.len(), "exported reflections");
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Start-up hydration: failures stay silent.
    Initial,
    /// Manual refresh: failures are shown.
    Refresh,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub kind: FetchKind,
    pub result: Result<Vec<Reflection>, RemoteError>,
}

/// Runs fetches on the tokio runtime and hands results back to the UI loop.
///
/// Only the latest fetch counts: starting a new one aborts the previous task,
/// and any outcome carrying an older generation is dropped on receipt.
pub struct FetchCoordinator {
    source: RemoteSource,
    client: reqwest::Client,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    tx: UnboundedSender<FetchOutcome>,
    rx: UnboundedReceiver<FetchOutcome>,
}

impl FetchCoordinator {
    pub fn new(source: RemoteSource) -> Self {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        FetchCoordinator {
            source,
            client: reqwest::Client::new(),
            generation: 0,
            in_flight: None,
            tx,
            rx,
        }
    }

    pub fn source(&self) -> &RemoteSource {
        &self.source
    }

    pub fn start(&mut self, kind: FetchKind) -> u64 {
        if let Some(previous) = self.in_flight.take() {
            if !previous.is_finished() {
                debug!(generation = self.generation, "aborting stale fetch");
            }
            previous.abort();
        }
        self.generation += 1;
        let generation = self.generation;
        let source = self.source.clone();
        let client = self.client.clone();
        let tx = self.tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = source.try_fetch(&client).await;
            // The receiver lives as long as the coordinator.
            let _ = tx.send(FetchOutcome {
                generation,
                kind,
                result,
            });
        }));
        generation
    }

    /// Next outcome of the latest fetch, if one has arrived.
    pub fn poll(&mut self) -> Option<FetchOutcome> {
        while let Ok(outcome) = self.rx.try_recv() {
            if let Some(current) = self.accept(outcome) {
                return Some(current);
            }
        }
        None
    }

    /// Waits for the outcome of the latest fetch.
    pub async fn next(&mut self) -> Option<FetchOutcome> {
        while let Some(outcome) = self.rx.recv().await {
            if let Some(current) = self.accept(outcome) {
                return Some(current);
            }
        }
        None
    }

    fn accept(&mut self, outcome: FetchOutcome) -> Option<FetchOutcome> {
        if outcome.generation != self.generation {
            debug!(
                stale = outcome.generation,
                current = self.generation,
                "discarding stale fetch result"
            );
            return None;
        }
        self.in_flight = None;
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_reflections(dir: &TempDir, text: &str) -> RemoteSource {
        let path = dir.path().join("reflections.json");
        std::fs::write(&path, text).unwrap();
        RemoteSource::File(path)
    }

    #[test]
    fn parse_distinguishes_urls_from_paths() {
        assert_eq!(
            RemoteSource::parse("https://example.org/r.json"),
            RemoteSource::Http("https://example.org/r.json".into())
        );
        assert_eq!(
            RemoteSource::parse(DEFAULT_REMOTE),
            RemoteSource::File(PathBuf::from("backend/reflections.json"))
        );
    }

    #[tokio::test]
    async fn fetch_reads_reflections_from_file() {
        let dir = TempDir::new().unwrap();
        let source = write_reflections(
            &dir,
            r#"[{"name":"A","date":"2024-01-01","reflection":"hi"}]"#,
        );
        let reflections = source.fetch(&reqwest::Client::new()).await;
        assert_eq!(
            reflections,
            vec![Reflection {
                name: "A".into(),
                date: "2024-01-01".into(),
                reflection: "hi".into(),
            }]
        );
    }

    #[tokio::test]
    async fn missing_or_malformed_resource_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let client = reqwest::Client::new();

        let missing = RemoteSource::File(dir.path().join("nope.json"));
        assert!(missing.fetch(&client).await.is_empty());
        assert!(matches!(
            missing.try_fetch(&client).await,
            Err(RemoteError::Read { .. })
        ));

        let malformed = write_reflections(&dir, "[{\"name\": 1}");
        assert!(malformed.fetch(&client).await.is_empty());
        assert!(matches!(
            malformed.try_fetch(&client).await,
            Err(RemoteError::Parse(_))
        ));
    }

    #[test]
    fn export_writes_pretty_json() {
        let dir = TempDir::new().unwrap();
        let reflections = vec![Reflection {
            name: "A".into(),
            date: "d".into(),
            reflection: "r".into(),
        }];
        let path = export_snapshot(&reflections, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), EXPORT_FILE_NAME);
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("\n  {"));
        let back: Vec<Reflection> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, reflections);
    }

    #[tokio::test]
    async fn only_the_latest_fetch_is_delivered() {
        let dir = TempDir::new().unwrap();
        let source = write_reflections(&dir, r#"[{"name":"A","date":"d","reflection":"r"}]"#);
        let mut coordinator = FetchCoordinator::new(source);

        coordinator.start(FetchKind::Initial);
        let latest = coordinator.start(FetchKind::Refresh);

        let outcome = coordinator.next().await.unwrap();
        assert_eq!(outcome.generation, latest);
        assert_eq!(outcome.kind, FetchKind::Refresh);
        assert_eq!(outcome.result.unwrap().len(), 1);
        assert!(coordinator.poll().is_none());
    }

    #[tokio::test]
    async fn stale_outcomes_are_dropped() {
        let dir = TempDir::new().unwrap();
        let source = write_reflections(&dir, "[]");
        let mut coordinator = FetchCoordinator::new(source);
        coordinator.generation = 5;
        coordinator
            .tx
            .send(FetchOutcome {
                generation: 4,
                kind: FetchKind::Refresh,
                result: Ok(Vec::new()),
            })
            .unwrap();
        assert!(coordinator.poll().is_none());
    }
}
