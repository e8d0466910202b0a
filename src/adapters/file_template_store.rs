//! Template store backed by the templates directory
//!
//! Every template lives in `<dir>/<id>.json`. Reads are served from an
//! in-memory cache; writes go to disk first, so a reload of the directory
//! sees templates created over the API.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::template_store::InMemoryTemplateStore;
use crate::config::load_templates_from_dir;
use crate::config::validator::TemplateValidator;
use crate::domain::{StoredTemplate, Template, TemplateStore};

pub struct FileTemplateStore {
    dir: PathBuf,
    validator: TemplateValidator,
    cache: InMemoryTemplateStore,
}

impl FileTemplateStore {
    /// Load every valid template in `dir`
    pub fn open(dir: impl Into<PathBuf>, validator: TemplateValidator) -> anyhow::Result<Self> {
        let dir = dir.into();
        let templates = load_templates_from_dir(&dir, &validator)?;
        Ok(Self {
            dir,
            validator,
            cache: InMemoryTemplateStore::with_templates(templates),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Re-read the directory, replacing the cached templates
    pub async fn reload(&self) -> anyhow::Result<usize> {
        let templates = load_templates_from_dir(&self.dir, &self.validator)?;
        let count = templates.len();
        self.cache.replace_all(templates).await;
        Ok(count)
    }

    fn template_path(&self, id: &str) -> anyhow::Result<PathBuf> {
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            anyhow::bail!("Invalid template id '{}'", id);
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn get(&self, id: &str) -> anyhow::Result<Option<StoredTemplate>> {
        self.cache.get(id).await
    }

    async fn get_by_trigger(&self, trigger: &str) -> anyhow::Result<Option<Template>> {
        self.cache.get_by_trigger(trigger).await
    }

    async fn get_all(&self) -> anyhow::Result<Vec<StoredTemplate>> {
        self.cache.get_all().await
    }

    async fn get_all_triggers(&self) -> anyhow::Result<Vec<String>> {
        self.cache.get_all_triggers().await
    }

    async fn put(&self, id: Option<String>, template: Template) -> anyhow::Result<StoredTemplate> {
        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let path = self.template_path(&id)?;
        let content = serde_json::to_string_pretty(&template)?;

        // Written aside then renamed so the watcher never reads a partial file
        fs::create_dir_all(&self.dir).await?;
        let staging = self.dir.join(format!(".{}.json.tmp", id));
        fs::write(&staging, content).await?;
        fs::rename(&staging, &path).await?;
        debug!("Wrote template {}", path.display());

        self.cache.put(Some(id), template).await
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let path = self.template_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => debug!("Removed template {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.cache.delete(id).await
    }
}
