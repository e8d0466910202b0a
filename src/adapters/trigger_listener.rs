//! Keystroke-driven trigger detection wired to the template store

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::adapters::session::{FormSession, SessionManager};
use crate::domain::{TemplateStore, TextTarget};
use crate::engine::trigger::{match_trigger, text_before_cursor, TriggerKey};
use crate::engine::DeletePolicy;

/// Watches typed keys for triggers and opens the matching form
pub struct TriggerListener {
    store: Arc<dyn TemplateStore>,
    triggers: Vec<String>,
    updates: Option<watch::Receiver<Vec<String>>>,
    sessions: SessionManager,
}

impl TriggerListener {
    pub fn new(store: Arc<dyn TemplateStore>, policy: DeletePolicy) -> Self {
        Self {
            store,
            triggers: Vec::new(),
            updates: None,
            sessions: SessionManager::new(policy),
        }
    }

    /// Follow a notifier channel; each published list replaces the current one
    pub fn with_updates(mut self, updates: watch::Receiver<Vec<String>>) -> Self {
        self.triggers = updates.borrow().clone();
        self.updates = Some(updates);
        self
    }

    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn set_triggers(&mut self, triggers: Vec<String>) {
        self.triggers = triggers;
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionManager {
        &mut self.sessions
    }

    /// Reload the trigger list from the store. A failing store leaves the
    /// listener with no triggers.
    pub async fn refresh(&mut self) {
        self.triggers = match self.store.get_all_triggers().await {
            Ok(triggers) => triggers,
            Err(e) => {
                warn!("Failed to load triggers, disabling detection: {}", e);
                Vec::new()
            }
        };
    }

    fn apply_updates(&mut self) {
        if let Some(updates) = self.updates.as_mut() {
            if updates.has_changed().unwrap_or(false) {
                self.triggers = updates.borrow_and_update().clone();
                debug!("Trigger list updated ({} triggers)", self.triggers.len());
            }
        }
    }

    /// Handle `key` about to be inserted into `target`.
    ///
    /// Only space and tab are considered; the match runs against the text
    /// before the cursor as it is before the key is inserted. Returns the
    /// opened session when a trigger matched and its template was found.
    pub async fn on_key(&mut self, key: char, target: &dyn TextTarget) -> Option<&mut FormSession> {
        TriggerKey::from_char(key)?;
        self.apply_updates();

        let value = target.read_value();
        let before = text_before_cursor(&value, target.read_cursor_offset());
        let trigger = match_trigger(&self.triggers, before)?.to_string();

        let template = match self.store.get_by_trigger(&trigger).await {
            Ok(Some(template)) => template,
            Ok(None) => {
                debug!("No template stored for trigger '{}'", trigger);
                return None;
            }
            Err(e) => {
                warn!("Template lookup for '{}' failed: {}", trigger, e);
                return None;
            }
        };

        Some(self.sessions.open(&trigger, template))
    }
}
