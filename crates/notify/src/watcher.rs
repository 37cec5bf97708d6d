//! Hot reload of the alarms file via a `notify` watcher.
//!
//! The current registry is published through a `tokio::sync::watch`
//! channel. A reload that fails validation is logged and the previous
//! registry stays in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::registry::{LoadPolicy, Registry, ValidationError};
use crate::vocabulary::Vocabulary;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Only used by the polling backend.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shared state needed to rebuild the registry.
struct Source {
    path: PathBuf,
    vocabulary: Arc<Vocabulary>,
    policy: LoadPolicy,
    sender: watch::Sender<Arc<Registry>>,
}

impl Source {
    fn reload(&self) -> Result<Arc<Registry>, ValidationError> {
        match Registry::from_path(&self.path, &self.vocabulary, self.policy) {
            Ok(registry) => {
                let registry = Arc::new(registry);
                self.sender.send_replace(Arc::clone(&registry));
                info!(
                    path = %self.path.display(),
                    alarms = registry.alarms().len(),
                    "reloaded alarms configuration"
                );
                Ok(registry)
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to reload alarms, keeping previous configuration"
                );
                Err(e)
            }
        }
    }
}

/// Owns the current [`Registry`] and optionally watches its file.
pub struct RegistryWatcher {
    source: Arc<Source>,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<RecommendedWatcher>,
}

impl RegistryWatcher {
    /// Load the alarms file. Fails if the initial load fails.
    pub fn new(path: PathBuf, vocabulary: Arc<Vocabulary>, policy: LoadPolicy) -> Result<Self, WatchError> {
        let registry = Registry::from_path(&path, &vocabulary, policy)?;
        let (sender, _) = watch::channel(Arc::new(registry));
        Ok(Self {
            source: Arc::new(Source {
                path,
                vocabulary,
                policy,
                sender,
            }),
            _watcher: None,
        })
    }

    pub fn current(&self) -> Arc<Registry> {
        Arc::clone(&self.source.sender.borrow())
    }

    /// Receiver notified whenever a new registry is installed.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Registry>> {
        self.source.sender.subscribe()
    }

    /// Re-read the file now. On error the current registry is kept.
    pub fn reload(&self) -> Result<Arc<Registry>, ValidationError> {
        self.source.reload()
    }

    /// Start watching the alarms file for changes.
    ///
    /// The parent directory is watched so that editors which replace the
    /// file by rename are picked up too.
    pub fn watch(&mut self) -> Result<(), WatchError> {
        let source = Arc::clone(&self.source);
        let dir = match self.source.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(&event, &source),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
            notify::Config::default().with_poll_interval(POLL_INTERVAL),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        info!(path = %self.source.path.display(), "watching alarms file for changes");
        self._watcher = Some(watcher);
        Ok(())
    }
}

fn handle_fs_event(event: &Event, source: &Source) {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return;
    }
    if event.paths.iter().any(|p| same_file_name(p, &source.path)) {
        let _ = source.reload();
    }
}

fn same_file_name(a: &Path, b: &Path) -> bool {
    a.file_name().is_some() && a.file_name() == b.file_name()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ONE_ALARM: &str = r#"[{"active": "True", "type": "discord", "webhook_url": "https://d.example/1"}]"#;
    const TWO_ALARMS: &str = r#"[
        {"active": "True", "type": "discord", "webhook_url": "https://d.example/1"},
        {"active": "False", "type": "slack", "api_key": "xoxb"}
    ]"#;

    fn setup(contents: &str) -> (TempDir, RegistryWatcher) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alarms.json");
        std::fs::write(&path, contents).unwrap();
        let watcher = RegistryWatcher::new(path, Arc::new(Vocabulary::builtin()), LoadPolicy::Strict).unwrap();
        (dir, watcher)
    }

    #[test]
    fn initial_load() {
        let (_dir, watcher) = setup(ONE_ALARM);
        assert_eq!(watcher.current().alarms().len(), 1);
    }

    #[test]
    fn initial_load_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alarms.json");
        std::fs::write(&path, r#"[{"active": "True", "type": "pager"}]"#).unwrap();
        let result = RegistryWatcher::new(path, Arc::new(Vocabulary::builtin()), LoadPolicy::Strict);
        assert!(matches!(result, Err(WatchError::Validation(_))));
    }

    #[tokio::test]
    async fn reload_swaps_registry_and_notifies() {
        let (dir, watcher) = setup(ONE_ALARM);
        let mut rx = watcher.subscribe();

        std::fs::write(dir.path().join("alarms.json"), TWO_ALARMS).unwrap();
        watcher.reload().unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().alarms().len(), 2);
        assert_eq!(watcher.current().alarms().len(), 2);
    }

    #[test]
    fn failed_reload_keeps_previous_registry() {
        let (dir, watcher) = setup(ONE_ALARM);
        let before = watcher.current();

        std::fs::write(dir.path().join("alarms.json"), "[{\"active\": \"True\"").unwrap();
        assert!(watcher.reload().is_err());
        assert!(Arc::ptr_eq(&before, &watcher.current()));
    }

    #[test]
    fn reload_without_subscribers_still_installs() {
        let (dir, watcher) = setup(ONE_ALARM);
        std::fs::write(dir.path().join("alarms.json"), TWO_ALARMS).unwrap();
        watcher.reload().unwrap();
        assert_eq!(watcher.current().alarms().len(), 2);
    }

    #[test]
    fn watch_starts_on_existing_directory() {
        let (_dir, mut watcher) = setup(ONE_ALARM);
        watcher.watch().unwrap();
    }

    #[test]
    fn watch_fails_when_directory_is_gone() {
        let (dir, mut watcher) = setup(ONE_ALARM);
        dir.close().unwrap();
        assert!(matches!(watcher.watch(), Err(WatchError::Notify(_))));
    }

    #[tokio::test]
    async fn file_change_triggers_reload() {
        let (dir, mut watcher) = setup(ONE_ALARM);
        watcher.watch().unwrap();
        let mut rx = watcher.subscribe();

        std::fs::write(dir.path().join("alarms.json"), TWO_ALARMS).unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while rx.borrow_and_update().alarms().len() != 2 {
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("registry was not reloaded after the file changed");
    }

    #[test]
    fn file_name_matching() {
        assert!(same_file_name(Path::new("/tmp/x/alarms.json"), Path::new("alarms.json")));
        assert!(!same_file_name(Path::new("/tmp/x/other.json"), Path::new("alarms.json")));
    }
}
