use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{Template, TemplateError};
use crate::engine::schema::{META_KEY, SCHEMAS_KEY, SCHEMA_KEY_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Parser message, reported verbatim
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate trigger: '{trigger}' is already used by template '{owner}'")]
    DuplicateTrigger { trigger: String, owner: String },

    #[error("Invalid field key '{key}' in '{location}': keys must be non-empty and must not contain '.', '[' or ']'")]
    InvalidKey { key: String, location: String },
}

/// Checks applied when a template is saved
#[derive(Debug, Clone)]
pub struct TemplateValidator {
    trigger_prefix: String,
}

impl Default for TemplateValidator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl TemplateValidator {
    pub fn new(trigger_prefix: &str) -> Self {
        Self {
            trigger_prefix: trigger_prefix.to_string(),
        }
    }

    /// Parse and validate template text against the other stored templates
    pub fn validate_text(&self, text: &str, others: &[&Template]) -> Result<Template, Vec<ValidationError>> {
        let template = Template::parse(text).map_err(|e| match e {
            TemplateError::Json(e) => vec![ValidationError::InvalidJson(e.to_string())],
            TemplateError::NotAnObject => vec![ValidationError::InvalidValue {
                field: "template".to_string(),
                reason: "Template must be a JSON object".to_string(),
            }],
        })?;
        self.validate(&template, others)?;
        Ok(template)
    }

    /// Validate a parsed template. `others` must not include the template
    /// being replaced when this is an update.
    pub fn validate(&self, template: &Template, others: &[&Template]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        match template.document().get(META_KEY) {
            None => errors.push(ValidationError::MissingField(META_KEY.to_string())),
            Some(meta) if !meta.is_object() => errors.push(ValidationError::InvalidValue {
                field: META_KEY.to_string(),
                reason: "Must be an object".to_string(),
            }),
            Some(_) => {}
        }

        // Checked as stored: a padded trigger would never match typed text
        let meta = template.meta();
        match meta.trigger.as_deref() {
            None => errors.push(ValidationError::MissingField(format!("{}.trigger", META_KEY))),
            Some(trigger) if trigger.trim().is_empty() => {
                errors.push(ValidationError::MissingField(format!("{}.trigger", META_KEY)))
            }
            Some(trigger) => {
                if let Err(e) = self.validate_trigger(trigger) {
                    errors.push(e);
                }
                if let Some(owner) = Self::find_owner(trigger, others) {
                    errors.push(ValidationError::DuplicateTrigger {
                        trigger: trigger.to_string(),
                        owner,
                    });
                }
            }
        }

        errors.extend(Self::field_key_errors(template));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_trigger(&self, trigger: &str) -> Result<(), ValidationError> {
        if !trigger.starts_with(&self.trigger_prefix) {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.trigger", META_KEY),
                reason: format!("Trigger must start with '{}'", self.trigger_prefix),
            });
        }
        if trigger.len() == self.trigger_prefix.len() {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.trigger", META_KEY),
                reason: "Trigger needs at least one character after the prefix".to_string(),
            });
        }
        if trigger.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.trigger", META_KEY),
                reason: "Trigger must not contain whitespace".to_string(),
            });
        }
        Ok(())
    }

    fn find_owner(trigger: &str, others: &[&Template]) -> Option<String> {
        others
            .iter()
            .find(|t| t.trigger().as_deref() == Some(trigger))
            .map(|t| t.name().unwrap_or_else(|| trigger.to_string()))
    }

    /// Field keys that cannot be addressed by a value path.
    ///
    /// Covers regular fields at any depth and the field keys of object
    /// schemas; schema names and `_meta` are not paths and are skipped.
    pub fn field_key_errors(template: &Template) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (key, value) in template.document() {
            if key == META_KEY {
                continue;
            }
            if key == SCHEMAS_KEY {
                if let Value::Object(schemas) = value {
                    for (name, schema) in schemas {
                        if let Value::Object(fields) = schema {
                            check_keys(fields, &format!("{}.{}", SCHEMAS_KEY, name), false, &mut errors);
                        }
                    }
                }
                continue;
            }
            if key.starts_with(SCHEMA_KEY_PREFIX) {
                if let Value::Object(fields) = value {
                    check_keys(fields, key, false, &mut errors);
                }
                continue;
            }
            push_if_invalid(key, "<root>", &mut errors);
            if let Value::Object(children) = value {
                check_keys(children, key, true, &mut errors);
            }
        }
        errors
    }
}

fn is_addressable(key: &str) -> bool {
    !key.is_empty() && !key.contains(['.', '[', ']'])
}

fn push_if_invalid(key: &str, location: &str, errors: &mut Vec<ValidationError>) {
    if !is_addressable(key) {
        errors.push(ValidationError::InvalidKey {
            key: key.to_string(),
            location: location.to_string(),
        });
    }
}

fn check_keys(map: &Map<String, Value>, location: &str, recurse: bool, errors: &mut Vec<ValidationError>) {
    for (key, value) in map {
        push_if_invalid(key, location, errors);
        if recurse {
            if let Value::Object(children) = value {
                check_keys(children, &format!("{}.{}", location, key), true, errors);
            }
        }
    }
}
