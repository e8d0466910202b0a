use anyhow::Result;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use tracing::{error, info, warn};

/// Watches the templates directory and calls back when a template file changes
pub struct TemplateWatcher {
    _watcher: RecommendedWatcher,
    dir: PathBuf,
}

impl TemplateWatcher {
    pub fn new<F>(dir: &Path, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;

        if dir.exists() {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            info!("Watching templates directory: {}", dir.display());
        } else {
            warn!("Templates directory does not exist, not watching: {}", dir.display());
        }

        std::thread::spawn(move || loop {
            match rx.recv() {
                Ok(Ok(event)) => {
                    if !is_template_event(&event) {
                        continue;
                    }
                    // Editors often write in several steps
                    std::thread::sleep(Duration::from_millis(100));
                    while rx.try_recv().is_ok() {}
                    info!("Template change detected, reloading...");
                    on_change();
                }
                Ok(Err(e)) => error!("Watch error: {:?}", e),
                Err(_) => break,
            }
        });

        Ok(Self {
            _watcher: watcher,
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_template_event(event: &notify::Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, Event, ModifyKind};

    #[test]
    fn test_only_json_changes_count() {
        let json = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("t/scene.json"));
        let other = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("t/notes.txt"));
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any)).add_path(PathBuf::from("t/a.json"));
        assert!(is_template_event(&json));
        assert!(!is_template_event(&other));
        assert!(!is_template_event(&access));
    }

    #[test]
    fn test_watch_missing_dir_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let watcher = TemplateWatcher::new(&missing, || {}).unwrap();
        assert_eq!(watcher.dir(), missing.as_path());
    }
}
