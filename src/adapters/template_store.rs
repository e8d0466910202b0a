use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{StoredTemplate, Template, TemplateStore};

/// Template store kept in memory, in insertion order
#[derive(Clone, Default)]
pub struct InMemoryTemplateStore {
    templates: Arc<RwLock<IndexMap<String, StoredTemplate>>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `(id, template)` pairs, in order
    pub fn with_templates(templates: Vec<(String, Template)>) -> Self {
        Self {
            templates: Arc::new(RwLock::new(index_templates(templates))),
        }
    }

    /// Swap the whole content, e.g. after the templates directory changed
    pub async fn replace_all(&self, templates: Vec<(String, Template)>) {
        let mut current = self.templates.write().await;
        *current = index_templates(templates);
        debug!("Template store now holds {} templates", current.len());
    }

    pub async fn len(&self) -> usize {
        self.templates.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.templates.read().await.is_empty()
    }
}

fn index_templates(templates: Vec<(String, Template)>) -> IndexMap<String, StoredTemplate> {
    let now = Utc::now();
    templates
        .into_iter()
        .map(|(id, template)| {
            let stored = StoredTemplate {
                id: id.clone(),
                template,
                updated_at: now,
            };
            (id, stored)
        })
        .collect()
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn get(&self, id: &str) -> anyhow::Result<Option<StoredTemplate>> {
        Ok(self.templates.read().await.get(id).cloned())
    }

    async fn get_by_trigger(&self, trigger: &str) -> anyhow::Result<Option<Template>> {
        let templates = self.templates.read().await;
        Ok(templates
            .values()
            .find(|stored| stored.template.trigger().as_deref() == Some(trigger))
            .map(|stored| stored.template.clone()))
    }

    async fn get_all(&self) -> anyhow::Result<Vec<StoredTemplate>> {
        Ok(self.templates.read().await.values().cloned().collect())
    }

    async fn get_all_triggers(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .templates
            .read()
            .await
            .values()
            .filter_map(|stored| stored.template.trigger())
            .collect())
    }

    async fn put(&self, id: Option<String>, template: Template) -> anyhow::Result<StoredTemplate> {
        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let stored = StoredTemplate {
            id: id.clone(),
            template,
            updated_at: Utc::now(),
        };
        self.templates.write().await.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.templates.write().await.shift_remove(id).is_some())
    }
}
