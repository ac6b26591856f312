//! File watcher module
//!
//! Watches a project directory for changes to dependency manifests:
//! - requirements files
//! - pyproject.toml / setup.py / setup.cfg
//! - Pipfile.lock / poetry.lock

pub mod handler;

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

/// Watcher errors
#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A manifest file appeared
    ManifestCreated { path: PathBuf },
    /// A manifest file was written
    ManifestChanged { path: PathBuf },
    /// A manifest file was deleted
    ManifestRemoved { path: PathBuf },
}

impl WatchEvent {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::ManifestCreated { path }
            | Self::ManifestChanged { path }
            | Self::ManifestRemoved { path } => path,
        }
    }
}

/// Project directory watcher
pub struct ManifestWatcher {
    watcher: RecommendedWatcher,
    project_path: PathBuf,
    rx: Receiver<Result<Event, notify::Error>>,
}

impl ManifestWatcher {
    /// Create a new manifest watcher
    pub fn new(project_path: PathBuf) -> Result<Self, WatcherError> {
        let (tx, rx) = channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )?;

        Ok(Self {
            watcher,
            project_path,
            rx,
        })
    }

    /// Start watching the project directory
    pub fn start(&mut self) -> Result<(), WatcherError> {
        if !self.project_path.exists() {
            return Err(WatcherError::PathNotFound(self.project_path.clone()));
        }

        self.watcher.watch(&self.project_path, RecursiveMode::Recursive)?;

        tracing::info!("Started watching: {:?}", self.project_path);

        Ok(())
    }

    /// Stop watching
    pub fn stop(&mut self) -> Result<(), WatcherError> {
        self.watcher.unwatch(&self.project_path)?;
        Ok(())
    }

    /// Block until a batch of relevant events arrives
    ///
    /// After the first relevant event, keeps collecting until the channel
    /// has been quiet for `debounce`. Returns an error once the channel is
    /// closed.
    pub fn next_batch(&self, debounce: Duration) -> Result<Vec<WatchEvent>, WatcherError> {
        let mut events = Vec::new();

        while events.is_empty() {
            let result = self
                .rx
                .recv()
                .map_err(|e| WatcherError::Channel(e.to_string()))?;
            collect(result, &mut events);
        }

        loop {
            match self.rx.recv_timeout(debounce) {
                Ok(result) => collect(result, &mut events),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(dedup(events))
    }
}

fn collect(result: Result<Event, notify::Error>, events: &mut Vec<WatchEvent>) {
    match result {
        Ok(event) => {
            if let Some(watch_event) = handler::handle_event(event) {
                events.push(watch_event);
            }
        }
        Err(e) => {
            tracing::error!("Watch error: {:?}", e);
        }
    }
}

/// Keep the last event per path, in first-seen order
fn dedup(events: Vec<WatchEvent>) -> Vec<WatchEvent> {
    let mut out: Vec<WatchEvent> = Vec::new();
    for event in events {
        match out.iter_mut().find(|e| e.path() == event.path()) {
            Some(existing) => *existing = event,
            None => out.push(event),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_dedup_keeps_last_event_per_path() {
        let a = PathBuf::from("/p/requirements.txt");
        let b = PathBuf::from("/p/poetry.lock");
        let events = vec![
            WatchEvent::ManifestCreated { path: a.clone() },
            WatchEvent::ManifestChanged { path: b.clone() },
            WatchEvent::ManifestChanged { path: a.clone() },
        ];

        assert_eq!(
            dedup(events),
            vec![
                WatchEvent::ManifestChanged { path: a },
                WatchEvent::ManifestChanged { path: b },
            ]
        );
    }

    #[test]
    fn test_start_missing_directory() {
        let mut watcher = ManifestWatcher::new(PathBuf::from("/nonexistent/pydguard/project")).unwrap();
        assert!(matches!(watcher.start(), Err(WatcherError::PathNotFound(_))));
    }

    #[test]
    fn test_next_batch_debounces_repeated_writes() {
        let dir = TempDir::new().unwrap();
        let mut watcher = ManifestWatcher::new(dir.path().to_path_buf()).unwrap();
        watcher.start().unwrap();

        let reqs = dir.path().join("requirements.txt");
        fs::write(&reqs, "requests==2.31.0\n").unwrap();
        fs::write(dir.path().join("notes.md"), "scratch\n").unwrap();
        fs::write(&reqs, "requests==2.31.0\nrich==13.7.0\n").unwrap();

        let batch = watcher.next_batch(Duration::from_millis(500)).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(matches!(
            batch[0],
            WatchEvent::ManifestCreated { .. } | WatchEvent::ManifestChanged { .. }
        ));
        assert_eq!(
            batch[0].path().file_name().and_then(|n| n.to_str()),
            Some("requirements.txt")
        );

        watcher.stop().unwrap();
    }
}
