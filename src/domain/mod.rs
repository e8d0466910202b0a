use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::watch;

use crate::engine::output::OutputFormat;
use crate::engine::schema::META_KEY;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// Parse failure, message kept verbatim for the author
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("Template must be a JSON object")]
    NotAnObject,
}

/// Metadata stored under the reserved `_meta` key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

/// A template document: an ordered JSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template {
    document: Map<String, Value>,
}

impl Template {
    pub fn from_document(document: Map<String, Value>) -> Self {
        Self { document }
    }

    /// Parse template text. The top level must be an object.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(document) => Ok(Self { document }),
            _ => Err(TemplateError::NotAnObject),
        }
    }

    pub fn from_value(value: Value) -> Result<Self, TemplateError> {
        match value {
            Value::Object(document) => Ok(Self { document }),
            _ => Err(TemplateError::NotAnObject),
        }
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn into_document(self) -> Map<String, Value> {
        self.document
    }

    /// Parsed `_meta`; missing or malformed metadata reads as empty
    pub fn meta(&self) -> TemplateMeta {
        self.document
            .get(META_KEY)
            .and_then(|meta| serde_json::from_value(meta.clone()).ok())
            .unwrap_or_default()
    }

    pub fn trigger(&self) -> Option<String> {
        self.meta().trigger
    }

    pub fn name(&self) -> Option<String> {
        self.meta().name
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_tag(self.meta().output_format.as_deref())
    }
}

/// A template as kept by a [`TemplateStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTemplate {
    /// Opaque storage key
    pub id: String,
    pub template: Template,
    pub updated_at: DateTime<Utc>,
}

/// Persistent template storage.
///
/// Lookups return `None`/empty rather than failing when nothing is stored;
/// `Err` is reserved for the backend itself failing.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get(&self, id: &str) -> anyhow::Result<Option<StoredTemplate>>;
    async fn get_by_trigger(&self, trigger: &str) -> anyhow::Result<Option<Template>>;
    async fn get_all(&self) -> anyhow::Result<Vec<StoredTemplate>>;
    /// Triggers of all stored templates, in storage order
    async fn get_all_triggers(&self) -> anyhow::Result<Vec<String>>;
    /// Insert or replace. A `None` id allocates a new one.
    async fn put(&self, id: Option<String>, template: Template) -> anyhow::Result<StoredTemplate>;
    async fn delete(&self, id: &str) -> anyhow::Result<bool>;
}

/// A text field in which triggers are typed and output is inserted
pub trait TextTarget: Send {
    fn read_value(&self) -> String;
    /// Cursor position in characters
    fn read_cursor_offset(&self) -> usize;
    /// Replace the last occurrence of `matched_trigger` with `replacement`,
    /// appending when it is absent, then notify observers of the change.
    fn splice_text(&mut self, matched_trigger: &str, replacement: &str);
}

/// One-way push of the full trigger list whenever templates change
#[derive(Debug, Clone)]
pub struct TriggerNotifier {
    tx: watch::Sender<Vec<String>>,
}

impl TriggerNotifier {
    pub fn new(initial: Vec<String>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the published list wholesale
    pub fn publish(&self, triggers: Vec<String>) {
        self.tx.send_replace(triggers);
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Vec<String> {
        self.tx.borrow().clone()
    }
}
