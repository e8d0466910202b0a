//! Output document generation
//!
//! Walks the template a second time and substitutes every marker with its
//! collected value. The result has exactly the template's keys and nesting,
//! minus the reserved metadata and schema keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use super::marker::Marker;
use super::path::ValuePath;
use super::schema::{is_reserved_key, Schema, SchemaSet, SCALAR_FIELD};
use super::value_tree::ValueTree;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Text format the output document is inserted as
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON, 2-space indent
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// Parse an `outputFormat` tag; unknown tags fall back to JSON
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("json") => OutputFormat::Json,
            Some("yaml") | Some("yml") => OutputFormat::Yaml,
            Some(other) => {
                warn!("Unknown output format '{}', using json", other);
                OutputFormat::Json
            }
        }
    }

    /// Serialize an output document in this format
    pub fn render(&self, document: &Value) -> Result<String, OutputError> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(document)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(document)?),
        }
    }
}

/// Produce the output document for `template` from the collected `values`
pub fn generate(template: &Map<String, Value>, schemas: &SchemaSet, values: &ValueTree) -> Value {
    let mut out = Map::new();
    for (key, value) in template.iter().filter(|(key, _)| !is_reserved_key(key)) {
        let path = ValuePath::root().push_key(key);
        out.insert(key.clone(), generate_value(value, &path, schemas, values));
    }
    Value::Object(out)
}

fn generate_value(template_value: &Value, path: &ValuePath, schemas: &SchemaSet, values: &ValueTree) -> Value {
    if let Value::Object(children) = template_value {
        let mut out = Map::new();
        for (key, child) in children {
            let child_path = path.push_key(key);
            out.insert(key.clone(), generate_value(child, &child_path, schemas, values));
        }
        return Value::Object(out);
    }

    match Marker::parse(template_value) {
        Marker::Static { value } => value,
        Marker::Input { .. } | Marker::Select { .. } => collected_or_empty(values.get(path)),
        Marker::Array { schema } => {
            let items = values
                .get(path)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            match schemas.get(&schema) {
                Some(schema) => Value::Array(items.iter().map(|item| generate_item(item, schema)).collect()),
                None => Value::Array(vec![]),
            }
        }
    }
}

fn generate_item(item: &Value, schema: &Schema) -> Value {
    match schema {
        Schema::Scalar { .. } => match item {
            Value::Object(map) => collected_or_empty(map.get(SCALAR_FIELD)),
            scalar => collected_or_empty(Some(scalar)),
        },
        Schema::Object { fields } => {
            let stored = item.as_object();
            let mut out = Map::new();
            for key in fields.keys() {
                let value = collected_or_empty(stored.and_then(|map| map.get(key)));
                out.insert(key.clone(), value);
            }
            Value::Object(out)
        }
    }
}

fn collected_or_empty(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(value) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::resolve_schemas;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn test_static_values_ignore_value_tree() {
        let template = doc(json!({
            "style": { "mood": "noir", "art_style": "ink" }
        }));
        let values = ValueTree::from_value(json!({
            "style": { "mood": "sunny", "art_style": "oil" }
        }));
        let out = generate(&template, &resolve_schemas(&template), &values);
        assert_eq!(out, json!({ "style": { "mood": "noir", "art_style": "ink" } }));
    }

    #[test]
    fn test_non_string_literals_kept() {
        let template = doc(json!({ "count": 3, "enabled": false, "extra": null }));
        let out = generate(&template, &SchemaSet::new(), &ValueTree::new());
        assert_eq!(out, json!({ "count": 3, "enabled": false, "extra": null }));
    }

    #[test]
    fn test_inputs_read_value_tree_or_empty() {
        let template = doc(json!({
            "_meta": { "name": "x", "trigger": "/x" },
            "title": "$input",
            "tone": "$select:calm|tense",
            "missing": "$input:Label"
        }));
        let values = ValueTree::from_value(json!({ "title": "Dusk", "tone": "wry" }));
        let out = generate(&template, &resolve_schemas(&template), &values);
        assert_eq!(out, json!({ "title": "Dusk", "tone": "wry", "missing": "" }));
    }

    #[test]
    fn test_scalar_array_extraction() {
        let template = doc(json!({
            "$schemas": { "tag": "value" },
            "tags": "$array:tag"
        }));
        let values = ValueTree::from_value(json!({ "tags": [ { "value": "x" }, "y", {} ] }));
        let out = generate(&template, &resolve_schemas(&template), &values);
        assert_eq!(out, json!({ "tags": ["x", "y", ""] }));
    }

    #[test]
    fn test_object_array_uses_schema_keys() {
        let template = doc(json!({
            "$schemas.character": { "name": "$input", "role": "$select:lead|extra" },
            "cast": "$array:character"
        }));
        let values = ValueTree::from_value(json!({
            "cast": [ { "name": "Ada", "role": "lead", "stray": 1 }, { "name": "Bo" } ]
        }));
        let out = generate(&template, &resolve_schemas(&template), &values);
        assert_eq!(
            out,
            json!({
                "cast": [
                    { "name": "Ada", "role": "lead" },
                    { "name": "Bo", "role": "" }
                ]
            })
        );
    }

    #[test]
    fn test_empty_and_missing_arrays() {
        let template = doc(json!({
            "$schemas": { "tag": "$input" },
            "tags": "$array:tag",
            "ghosts": "$array:ghost"
        }));
        let values = ValueTree::from_value(json!({ "ghosts": [ { "a": 1 } ] }));
        let out = generate(&template, &resolve_schemas(&template), &values);
        assert_eq!(out, json!({ "tags": [], "ghosts": [] }));
    }

    #[test]
    fn test_json_render_uses_two_space_indent() {
        let text = OutputFormat::Json.render(&json!({ "a": { "b": 1 } })).unwrap();
        assert_eq!(text, "{\n  \"a\": {\n    \"b\": 1\n  }\n}");
    }

    #[test]
    fn test_output_format_tags() {
        assert_eq!(OutputFormat::from_tag(None), OutputFormat::Json);
        assert_eq!(OutputFormat::from_tag(Some("YAML")), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_tag(Some("toml")), OutputFormat::Json);
        let yaml = OutputFormat::Yaml.render(&json!({ "a": "b" })).unwrap();
        assert_eq!(yaml.trim(), "a: b");
    }
}
