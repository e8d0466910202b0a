//! Schema resolution for array markers
//!
//! A template may declare its reusable item schemas in two ways, and both
//! may appear in one document:
//!
//! ```json
//! {
//!   "$schemas": { "character": { "name": "$input", "role": "$select:lead|extra" } },
//!   "$schemas.tag": "$input"
//! }
//! ```
//!
//! Flat `$schemas.<name>` keys always take precedence over the nested
//! collection for the same name.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::marker::Marker;

/// Reserved key holding the nested schema collection
pub const SCHEMAS_KEY: &str = "$schemas";
/// Prefix of flat schema declarations
pub const SCHEMA_KEY_PREFIX: &str = "$schemas.";
/// Reserved metadata key
pub const META_KEY: &str = "_meta";
/// Field name used for the single field of a scalar schema
pub const SCALAR_FIELD: &str = "value";

/// Item shape referenced by an array marker
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schema {
    /// Each item is a single field named `value`
    Scalar { field: Marker },
    /// Each item is an object with these fields, in declaration order
    Object { fields: IndexMap<String, Marker> },
}

impl Schema {
    /// Schema used when an array marker names an undeclared schema
    pub fn empty() -> Self {
        Schema::Object {
            fields: IndexMap::new(),
        }
    }

    /// Build a schema from its template declaration.
    ///
    /// Schemas do not nest: an `$array:` marker inside a schema is kept as a
    /// literal string.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Schema::Object {
                fields: map
                    .iter()
                    .map(|(key, field)| (key.clone(), item_marker(field)))
                    .collect(),
            },
            other => Schema::Scalar {
                field: item_marker(other),
            },
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Schema::Scalar { .. })
    }

    /// Field key/marker pairs of one item
    pub fn fields(&self) -> Vec<(&str, &Marker)> {
        match self {
            Schema::Scalar { field } => vec![(SCALAR_FIELD, field)],
            Schema::Object { fields } => fields.iter().map(|(k, m)| (k.as_str(), m)).collect(),
        }
    }

    /// Default stored value for a newly added item
    pub fn default_item(&self) -> Value {
        let mut item = Map::new();
        for (key, marker) in self.fields() {
            item.insert(key.to_string(), marker.default_value());
        }
        Value::Object(item)
    }
}

fn item_marker(value: &Value) -> Marker {
    match Marker::parse(value) {
        Marker::Array { schema } => {
            debug!("Ignoring nested array of schema '{}' inside a schema", schema);
            Marker::Static {
                value: value.clone(),
            }
        }
        marker => marker,
    }
}

/// Name -> schema mapping resolved from one template
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SchemaSet {
    schemas: IndexMap<String, Schema>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Lookup that substitutes the empty schema for unknown names
    pub fn get_or_empty(&self, name: &str) -> Schema {
        self.schemas.get(name).cloned().unwrap_or_else(Schema::empty)
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: Schema) {
        self.schemas.insert(name.into(), schema);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

/// Whether a top-level template key is reserved (metadata or schema declaration)
pub fn is_reserved_key(key: &str) -> bool {
    key == META_KEY || key == SCHEMAS_KEY || key.starts_with(SCHEMA_KEY_PREFIX)
}

/// Merge both schema declaration styles of `template` into one mapping.
///
/// The template is not modified. Non-object `$schemas` values are ignored.
pub fn resolve_schemas(template: &Map<String, Value>) -> SchemaSet {
    let mut set = SchemaSet::new();

    if let Some(Value::Object(nested)) = template.get(SCHEMAS_KEY) {
        for (name, decl) in nested {
            set.insert(name.clone(), Schema::from_value(decl));
        }
    }

    for (key, decl) in template {
        let Some(name) = key.strip_prefix(SCHEMA_KEY_PREFIX) else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if set.contains(name) {
            debug!("Flat schema declaration '{}' overrides an earlier definition", key);
        }
        set.insert(name.to_string(), Schema::from_value(decl));
    }

    set
}
