//! Form sessions: the single open form and its lifecycle
//!
//! `open -> (edit)* -> submit | cancel`. Submitting and cancelling both end
//! the session; opening a new form while one is open cancels the old one.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Template, TextTarget};
use crate::engine::{DeletePolicy, FieldTree, FormError, FormState, OutputError, PathError, ValuePath};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No form is open")]
    NoSession,

    #[error("Invalid path: {0}")]
    Path(#[from] PathError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// An open form bound to the trigger that opened it
#[derive(Debug, Clone)]
pub struct FormSession {
    trigger: String,
    template: Template,
    form: FormState,
}

impl FormSession {
    pub fn new(trigger: impl Into<String>, template: Template, policy: DeletePolicy) -> Self {
        let form = FormState::new(template.document().clone(), policy);
        Self {
            trigger: trigger.into(),
            template,
            form,
        }
    }

    /// Text that opened this form; replaced by the output on submit
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn fields(&self) -> &FieldTree {
        self.form.tree()
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn set_value(&mut self, path: &str, text: impl Into<String>) -> Result<(), SessionError> {
        let path = ValuePath::parse(path)?;
        Ok(self.form.set_value(&path, text)?)
    }

    pub fn add_item(&mut self, array_path: &str) -> Result<usize, SessionError> {
        let path = ValuePath::parse(array_path)?;
        Ok(self.form.add_item(&path)?)
    }

    pub fn remove_item(&mut self, array_path: &str, index: usize) -> Result<(), SessionError> {
        let path = ValuePath::parse(array_path)?;
        Ok(self.form.remove_item(&path, index)?)
    }

    /// Output document for the current values
    pub fn preview(&self) -> Value {
        self.form.preview()
    }

    /// Output text exactly as it would be inserted
    pub fn preview_text(&self) -> Result<String, SessionError> {
        Ok(self.template.output_format().render(&self.preview())?)
    }
}

/// Owner of the one live form session
#[derive(Debug, Default)]
pub struct SessionManager {
    current: Option<FormSession>,
    policy: DeletePolicy,
}

impl SessionManager {
    pub fn new(policy: DeletePolicy) -> Self {
        Self {
            current: None,
            policy,
        }
    }

    /// Open a form for `template`, cancelling any form already open
    pub fn open(&mut self, trigger: &str, template: Template) -> &mut FormSession {
        if let Some(previous) = self.current.take() {
            info!("Discarding open form for '{}'", previous.trigger());
        }
        debug!("Opening form for '{}'", trigger);
        self.current.insert(FormSession::new(trigger, template, self.policy))
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&FormSession> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Result<&mut FormSession, SessionError> {
        self.current.as_mut().ok_or(SessionError::NoSession)
    }

    /// Close the open form without inserting anything
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(session) => {
                debug!("Cancelled form for '{}'", session.trigger());
                true
            }
            None => false,
        }
    }

    /// Render the open form's output, splice it over the trigger in `target`
    /// and close the form. Returns the inserted text.
    ///
    /// If rendering fails the form stays open.
    pub fn submit(&mut self, target: &mut dyn TextTarget) -> Result<String, SessionError> {
        let session = self.current.as_ref().ok_or(SessionError::NoSession)?;
        let text = session.preview_text()?;
        target.splice_text(session.trigger(), &text);
        info!("Inserted output for '{}' ({} bytes)", session.trigger(), text.len());
        self.current = None;
        Ok(text)
    }
}
