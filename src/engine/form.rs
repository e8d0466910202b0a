//! State of one open form: field tree plus the template it was built from

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::field_tree::{self, FieldTree};
use super::output;
use super::path::ValuePath;
use super::schema::{resolve_schemas, SchemaSet};
use super::value_tree::ValueTree;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("No editable field at '{0}'")]
    UnknownField(String),

    #[error("No array at '{0}'")]
    UnknownArray(String),

    #[error("Array '{path}' has no item {index}")]
    ItemOutOfRange { path: String, index: usize },

    #[error("Refusing to remove the last item of '{0}'")]
    LastItem(String),
}

/// Whether an array may be emptied through item deletion
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Items can be removed down to zero
    #[default]
    AllowEmpty,
    /// The final remaining item cannot be removed
    KeepOne,
}

/// One form instance being edited
#[derive(Clone, Debug)]
pub struct FormState {
    template: Map<String, Value>,
    schemas: SchemaSet,
    tree: FieldTree,
    policy: DeletePolicy,
}

impl FormState {
    /// Build a fresh form for `template` with nothing filled in
    pub fn new(template: Map<String, Value>, policy: DeletePolicy) -> Self {
        Self::with_values(template, &ValueTree::new(), policy)
    }

    /// Build a form pre-filled from previously collected values
    pub fn with_values(template: Map<String, Value>, existing: &ValueTree, policy: DeletePolicy) -> Self {
        let schemas = resolve_schemas(&template);
        let tree = field_tree::build(&template, &schemas, existing);
        Self {
            template,
            schemas,
            tree,
            policy,
        }
    }

    pub fn tree(&self) -> &FieldTree {
        &self.tree
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    pub fn template(&self) -> &Map<String, Value> {
        &self.template
    }

    pub fn policy(&self) -> DeletePolicy {
        self.policy
    }

    /// Replace the text of an input or select field
    pub fn set_value(&mut self, path: &ValuePath, text: impl Into<String>) -> Result<(), FormError> {
        let leaf = self
            .tree
            .leaf_mut(path)
            .filter(|leaf| leaf.is_editable())
            .ok_or_else(|| FormError::UnknownField(path.to_string()))?;
        leaf.value = Value::String(text.into());
        Ok(())
    }

    /// Append an item to the array at `path`, returning its index
    pub fn add_item(&mut self, path: &ValuePath) -> Result<usize, FormError> {
        let array = self
            .tree
            .array_mut(path)
            .ok_or_else(|| FormError::UnknownArray(path.to_string()))?;
        let index = array.push_item();
        debug!("Added item {} to '{}'", index, path);
        Ok(index)
    }

    /// Remove item `index` of the array at `path`; later items shift down
    pub fn remove_item(&mut self, path: &ValuePath, index: usize) -> Result<(), FormError> {
        let policy = self.policy;
        let array = self
            .tree
            .array_mut(path)
            .ok_or_else(|| FormError::UnknownArray(path.to_string()))?;
        if index >= array.len() {
            return Err(FormError::ItemOutOfRange {
                path: path.to_string(),
                index,
            });
        }
        if policy == DeletePolicy::KeepOne && array.len() == 1 {
            return Err(FormError::LastItem(path.to_string()));
        }
        array.remove_item(index);
        debug!("Removed item {} from '{}'", index, path);
        Ok(())
    }

    /// Current values as a value tree
    pub fn values(&self) -> ValueTree {
        field_tree::collect(&self.tree)
    }

    /// Output document for the current values
    pub fn preview(&self) -> Value {
        output::generate(&self.template, &self.schemas, &self.values())
    }
}
