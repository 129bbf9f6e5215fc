//! File watching for live reload.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use folio_static::SiteConfig;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Quiet period a path needs before its latest event is sent.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// How often the forwarding thread checks for settled paths.
const TICK: Duration = Duration::from_millis(25);

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Stylesheet or other file under a watch target was modified
    StyleModified(PathBuf),

    /// File under a passthrough source was modified
    PassthroughModified(PathBuf),

    /// Template under the input directory was modified
    TemplateModified(PathBuf),

    /// File was created
    Created(PathBuf),

    /// File was deleted
    Deleted(PathBuf),

    /// Generic modification
    Modified(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::StyleModified(path)
            | Self::PassthroughModified(path)
            | Self::TemplateModified(path)
            | Self::Created(path)
            | Self::Deleted(path)
            | Self::Modified(path) => path,
        }
    }
}

/// How changed paths map to watch events.
#[derive(Debug, Clone, Default)]
pub struct WatchRules {
    styles: Vec<PathBuf>,
    passthroughs: Vec<PathBuf>,
    input: PathBuf,
    config: SiteConfig,
}

impl WatchRules {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            styles: config.watch_targets(),
            passthroughs: config
                .passthrough_sources()
                .into_iter()
                .map(|(_, source)| source)
                .collect(),
            input: config.input_dir(),
            config: config.clone(),
        }
    }

    /// Classify a notify event kind for `path`.
    pub fn classify(&self, path: &Path, kind: &notify::EventKind) -> Option<WatchEvent> {
        use notify::EventKind;

        let path_buf = path.to_path_buf();
        match kind {
            EventKind::Create(_) => Some(WatchEvent::Created(path_buf)),
            EventKind::Remove(_) => Some(WatchEvent::Deleted(path_buf)),
            EventKind::Modify(_) => Some(self.classify_modification(path)),
            _ => None,
        }
    }

    fn classify_modification(&self, path: &Path) -> WatchEvent {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let path_buf = path.to_path_buf();

        if ext == "css" || self.styles.iter().any(|dir| path.starts_with(dir)) {
            WatchEvent::StyleModified(path_buf)
        } else if self.passthroughs.iter().any(|source| path.starts_with(source)) {
            WatchEvent::PassthroughModified(path_buf)
        } else if path.starts_with(&self.input) && self.config.accepts_extension(ext) {
            WatchEvent::TemplateModified(path_buf)
        } else {
            WatchEvent::Modified(path_buf)
        }
    }
}

struct PendingEvent {
    event: WatchEvent,
    deadline: Instant,
}

/// Coalesces bursts of events into one event per path.
///
/// A path is sent once it has been quiet for the debounce window, carrying
/// its latest classification. A creation absorbs later modifications, and a
/// file created and removed within one window is never reported.
struct EventDebouncer {
    pending: HashMap<PathBuf, PendingEvent>,
    window: Duration,
}

impl EventDebouncer {
    fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    fn record(&mut self, event: WatchEvent, now: Instant) {
        use std::collections::hash_map::Entry;

        let deadline = now + self.window;
        match self.pending.entry(event.path().to_path_buf()) {
            Entry::Vacant(entry) => {
                entry.insert(PendingEvent { event, deadline });
            }
            Entry::Occupied(mut entry) => {
                let created = matches!(entry.get().event, WatchEvent::Created(_));
                match (created, event) {
                    (true, WatchEvent::Deleted(_)) => {
                        entry.remove();
                    }
                    // Content is part of the creation
                    (true, _) => entry.get_mut().deadline = deadline,
                    (false, event) => {
                        entry.insert(PendingEvent { event, deadline });
                    }
                }
            }
        }
    }

    /// Remove and return the events whose path has settled.
    fn drain_ready(&mut self, now: Instant) -> Vec<WatchEvent> {
        let ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        ready
            .into_iter()
            .filter_map(|path| self.pending.remove(&path))
            .map(|pending| pending.event)
            .collect()
    }
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `paths` that exist, classifying changes with `rules`.
    ///
    /// Returns the watcher and a channel to receive events.
    pub fn new(
        paths: &[PathBuf],
        rules: WatchRules,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::debug!("Not watching missing path {}", path.display());
            }
        }

        std::thread::spawn(move || {
            let mut debouncer = EventDebouncer::new(DEBOUNCE);

            loop {
                match sync_rx.recv_timeout(TICK) {
                    Ok(event) => {
                        let now = Instant::now();
                        for path in &event.paths {
                            if let Some(e) = rules.classify(path, &event.kind) {
                                debouncer.record(e, now);
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                    Err(mpsc::RecvTimeoutError::Disconnected) => return,
                }

                for e in debouncer.drain_ready(Instant::now()) {
                    if async_tx.blocking_send(e).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
    use notify::EventKind;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn rules() -> WatchRules {
        WatchRules::from_config(&SiteConfig::default().with_root("/site"))
    }

    fn modify() -> EventKind {
        EventKind::Modify(ModifyKind::Data(DataChange::Content))
    }

    #[test]
    fn classifies_modifications_by_location() {
        let rules = rules();
        let cases: [(&str, fn(PathBuf) -> WatchEvent); 8] = [
            ("/site/assets/css/main.css", WatchEvent::StyleModified),
            ("/site/assets/css/vendor/reset", WatchEvent::StyleModified),
            ("/site/images/me.jpg", WatchEvent::PassthroughModified),
            ("/site/CNAME", WatchEvent::PassthroughModified),
            ("/site/src/index.njk", WatchEvent::TemplateModified),
            ("/site/src/_includes/header.njk", WatchEvent::TemplateModified),
            ("/site/src/_data/site.json", WatchEvent::Modified),
            ("/site/README", WatchEvent::Modified),
        ];

        for (path, expected) in cases {
            let path = PathBuf::from(path);
            assert_eq!(
                rules.classify(&path, &modify()),
                Some(expected(path.clone())),
                "{}",
                path.display()
            );
        }
    }

    #[test]
    fn creation_and_removal_take_precedence() {
        let rules = rules();
        let css = PathBuf::from("/site/assets/css/new.css");

        assert_eq!(
            rules.classify(&css, &EventKind::Create(CreateKind::File)),
            Some(WatchEvent::Created(css.clone()))
        );
        assert_eq!(
            rules.classify(&css, &EventKind::Remove(RemoveKind::File)),
            Some(WatchEvent::Deleted(css.clone()))
        );
        assert_eq!(rules.classify(&css, &EventKind::Any), None);
    }

    #[test]
    fn bursts_coalesce_into_one_event_per_path() {
        let mut debouncer = EventDebouncer::new(DEBOUNCE);
        let start = Instant::now();
        let css = PathBuf::from("/site/assets/css/main.css");
        let image = PathBuf::from("/site/images/me.jpg");

        // An editor save: several writes to the same file 30 ms apart
        for step in 0..4 {
            let at = start + Duration::from_millis(30 * step);
            debouncer.record(WatchEvent::Modified(css.clone()), at);
            debouncer.record(WatchEvent::StyleModified(css.clone()), at);
        }
        debouncer.record(WatchEvent::PassthroughModified(image.clone()), start);

        // The window restarts with every event for the stylesheet
        let settled_image = start + DEBOUNCE;
        assert_eq!(
            debouncer.drain_ready(settled_image),
            vec![WatchEvent::PassthroughModified(image)]
        );

        let last = start + Duration::from_millis(90);
        assert!(debouncer.drain_ready(last + DEBOUNCE / 2).is_empty());
        assert_eq!(
            debouncer.drain_ready(last + DEBOUNCE),
            vec![WatchEvent::StyleModified(css)]
        );

        // Sent entries are forgotten
        assert!(debouncer.pending.is_empty());
        assert!(debouncer.drain_ready(last + DEBOUNCE * 10).is_empty());
    }

    #[test]
    fn creation_absorbs_modifications_and_cancels_with_removal() {
        let mut debouncer = EventDebouncer::new(DEBOUNCE);
        let now = Instant::now();
        let kept = PathBuf::from("/site/images/new.jpg");
        let scratch = PathBuf::from("/site/images/.new.jpg.swp");

        debouncer.record(WatchEvent::Created(kept.clone()), now);
        debouncer.record(WatchEvent::PassthroughModified(kept.clone()), now);
        debouncer.record(WatchEvent::Created(scratch.clone()), now);
        debouncer.record(WatchEvent::Deleted(scratch), now);

        assert_eq!(
            debouncer.drain_ready(now + DEBOUNCE),
            vec![WatchEvent::Created(kept)]
        );
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let config = SiteConfig::default().with_root(temp.path());
        fs::create_dir_all(temp.path().join("images")).unwrap();

        let (watcher, mut rx) =
            FileWatcher::new(&config.watch_paths(), WatchRules::from_config(&config)).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(temp.path().join("images/me.jpg"), "jpeg").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;
        drop(watcher);

        assert!(event.is_ok(), "timeout waiting for file watch event");
        let event = event.unwrap().expect("channel should not be closed");
        assert!(event.path().ends_with("me.jpg"));
    }
}
