//! Renderable field tree built from a template
//!
//! The tree mirrors the template: nested objects become groups, `$array:`
//! markers become repeatable groups and every other value becomes a leaf.
//! Each leaf carries the [`ValuePath`] it is collected under and its current
//! value, so the value tree can be rebuilt from the rendered fields at any
//! time (see [`collect`]).

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::marker::Marker;
use super::path::ValuePath;
use super::schema::{is_reserved_key, Schema, SchemaSet, SCALAR_FIELD};
use super::value_tree::ValueTree;

// ============================================================================
// Nodes
// ============================================================================

/// A single rendered field: static display, free-text input or select
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeafField {
    pub key: String,
    pub label: String,
    pub path: ValuePath,
    pub marker: Marker,
    /// Literal for static fields, current text otherwise
    pub value: Value,
}

impl LeafField {
    fn new(key: &str, marker: Marker, path: ValuePath, stored: Option<&Value>) -> Self {
        let value = match (&marker, stored) {
            (Marker::Static { value }, _) => value.clone(),
            (_, Some(Value::String(s))) => Value::String(s.clone()),
            (_, Some(Value::Null)) | (_, None) => marker.default_value(),
            (_, Some(other)) => Value::String(other.to_string()),
        };
        Self {
            key: key.to_string(),
            label: marker.label_for(key),
            path,
            marker,
            value,
        }
    }

    pub fn is_editable(&self) -> bool {
        !self.marker.is_static()
    }

    /// Suggestions offered by a select field
    pub fn options(&self) -> &[String] {
        match &self.marker {
            Marker::Select { options } => options,
            _ => &[],
        }
    }

    /// First select option, kept for templates that used it as a label
    pub fn legacy_label(&self) -> Option<&str> {
        self.options().first().map(String::as_str)
    }
}

/// Nested object of fields
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupNode {
    pub key: String,
    pub label: String,
    pub path: ValuePath,
    pub children: Vec<FieldNode>,
}

/// One repetition of an array group
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArrayItem {
    /// Zero-based position, also the index used by the delete affordance
    pub index: usize,
    /// Human-readable position ("#1", "#2", ...)
    pub ordinal: String,
    pub path: ValuePath,
    pub fields: Vec<LeafField>,
}

impl ArrayItem {
    fn new(array_path: &ValuePath, index: usize, schema: &Schema, stored: Option<&Value>) -> Self {
        let path = array_path.push_index(index);
        let fields = schema
            .fields()
            .into_iter()
            .map(|(key, marker)| {
                let field_value = match stored {
                    Some(Value::Object(item)) => item.get(key),
                    // Bare scalars stand for the single field of a scalar schema
                    Some(scalar) if schema.is_scalar() && key == SCALAR_FIELD => Some(scalar),
                    _ => None,
                };
                LeafField::new(key, marker.clone(), path.push_key(key), field_value)
            })
            .collect();

        Self {
            index,
            ordinal: ordinal(index),
            path,
            fields,
        }
    }

    /// Move this item to `new_index`, rewriting every descendant path
    fn reindex(&mut self, array_depth: usize, new_index: usize) {
        self.index = new_index;
        self.ordinal = ordinal(new_index);
        self.path = self.path.reindexed(array_depth, new_index);
        for field in &mut self.fields {
            field.path = field.path.reindexed(array_depth, new_index);
        }
    }
}

fn ordinal(index: usize) -> String {
    format!("#{}", index + 1)
}

/// Repeatable group of schema instances
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArrayGroup {
    pub key: String,
    pub label: String,
    pub path: ValuePath,
    pub schema_name: String,
    pub schema: Schema,
    pub items: Vec<ArrayItem>,
}

impl ArrayGroup {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a new item seeded with the schema defaults, returning its index
    pub fn push_item(&mut self) -> usize {
        let index = self.items.len();
        let defaults = self.schema.default_item();
        self.items
            .push(ArrayItem::new(&self.path, index, &self.schema, Some(&defaults)));
        index
    }

    /// Remove the item at `index` and shift every later item down by one.
    ///
    /// Paths, ordinals and delete indices of the shifted items are rewritten
    /// before this returns. Returns the removed item, or `None` when `index`
    /// is out of range.
    pub fn remove_item(&mut self, index: usize) -> Option<ArrayItem> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        let depth = self.path.depth();
        for (new_index, item) in self.items.iter_mut().enumerate().skip(index) {
            item.reindex(depth, new_index);
        }
        Some(removed)
    }
}

/// Node of the rendered field tree
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum FieldNode {
    Leaf(LeafField),
    Group(GroupNode),
    Array(ArrayGroup),
}

impl FieldNode {
    pub fn path(&self) -> &ValuePath {
        match self {
            FieldNode::Leaf(leaf) => &leaf.path,
            FieldNode::Group(group) => &group.path,
            FieldNode::Array(array) => &array.path,
        }
    }
}

// ============================================================================
// Tree
// ============================================================================

/// All fields of one form instance
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FieldTree {
    pub nodes: Vec<FieldNode>,
}

impl FieldTree {
    /// Every leaf in render order, including array item fields
    pub fn leaves(&self) -> Vec<&LeafField> {
        let mut out = Vec::new();
        collect_leaves(&self.nodes, &mut out);
        out
    }

    pub fn leaf(&self, path: &ValuePath) -> Option<&LeafField> {
        self.leaves().into_iter().find(|leaf| &leaf.path == path)
    }

    pub fn leaf_mut(&mut self, path: &ValuePath) -> Option<&mut LeafField> {
        find_leaf_mut(&mut self.nodes, path)
    }

    pub fn array(&self, path: &ValuePath) -> Option<&ArrayGroup> {
        find_array(&self.nodes, path)
    }

    pub fn array_mut(&mut self, path: &ValuePath) -> Option<&mut ArrayGroup> {
        find_array_mut(&mut self.nodes, path)
    }
}

fn collect_leaves<'a>(nodes: &'a [FieldNode], out: &mut Vec<&'a LeafField>) {
    for node in nodes {
        match node {
            FieldNode::Leaf(leaf) => out.push(leaf),
            FieldNode::Group(group) => collect_leaves(&group.children, out),
            FieldNode::Array(array) => {
                for item in &array.items {
                    out.extend(item.fields.iter());
                }
            }
        }
    }
}

fn find_leaf_mut<'a>(nodes: &'a mut [FieldNode], path: &ValuePath) -> Option<&'a mut LeafField> {
    for node in nodes {
        if !path.starts_with(node.path()) {
            continue;
        }
        match node {
            FieldNode::Leaf(leaf) => return (&leaf.path == path).then_some(leaf),
            FieldNode::Group(group) => return find_leaf_mut(&mut group.children, path),
            FieldNode::Array(array) => {
                return array
                    .items
                    .iter_mut()
                    .flat_map(|item| item.fields.iter_mut())
                    .find(|field| &field.path == path);
            }
        }
    }
    None
}

fn find_array<'a>(nodes: &'a [FieldNode], path: &ValuePath) -> Option<&'a ArrayGroup> {
    for node in nodes {
        match node {
            FieldNode::Array(array) if &array.path == path => return Some(array),
            FieldNode::Group(group) if path.starts_with(&group.path) => {
                return find_array(&group.children, path)
            }
            _ => {}
        }
    }
    None
}

fn find_array_mut<'a>(nodes: &'a mut [FieldNode], path: &ValuePath) -> Option<&'a mut ArrayGroup> {
    for node in nodes {
        match node {
            FieldNode::Array(array) if &array.path == path => return Some(array),
            FieldNode::Group(group) if path.starts_with(&group.path) => {
                return find_array_mut(&mut group.children, path)
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Builder
// ============================================================================

/// Build the field tree for `template`, pre-filled from `existing`.
///
/// Reserved top-level keys (`_meta`, `$schemas`, `$schemas.*`) are skipped.
/// Arrays get one item per entry already stored at their path; with nothing
/// stored they render with zero items.
pub fn build(template: &Map<String, Value>, schemas: &SchemaSet, existing: &ValueTree) -> FieldTree {
    let nodes = template
        .iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .map(|(key, value)| build_node(key, value, &ValuePath::root(), schemas, existing))
        .collect();
    FieldTree { nodes }
}

fn build_node(
    key: &str,
    value: &Value,
    prefix: &ValuePath,
    schemas: &SchemaSet,
    existing: &ValueTree,
) -> FieldNode {
    let path = prefix.push_key(key);

    if let Value::Object(children) = value {
        let children = children
            .iter()
            .map(|(child_key, child)| build_node(child_key, child, &path, schemas, existing))
            .collect();
        return FieldNode::Group(GroupNode {
            key: key.to_string(),
            label: key.to_string(),
            path,
            children,
        });
    }

    match Marker::parse(value) {
        Marker::Array { schema: schema_name } => {
            let schema = schemas.get_or_empty(&schema_name);
            let stored = existing
                .get(&path)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let items = stored
                .iter()
                .enumerate()
                .map(|(index, item)| ArrayItem::new(&path, index, &schema, Some(item)))
                .collect();
            FieldNode::Array(ArrayGroup {
                key: key.to_string(),
                label: key.to_string(),
                path,
                schema_name,
                schema,
                items,
            })
        }
        marker => {
            let stored = existing.get(&path);
            FieldNode::Leaf(LeafField::new(key, marker, path, stored))
        }
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Rebuild the value tree from the fields currently rendered
pub fn collect(tree: &FieldTree) -> ValueTree {
    let mut values = ValueTree::new();
    collect_nodes(&tree.nodes, &mut values);
    values
}

fn collect_nodes(nodes: &[FieldNode], values: &mut ValueTree) {
    for node in nodes {
        match node {
            FieldNode::Leaf(leaf) => write(values, &leaf.path, leaf.value.clone()),
            FieldNode::Group(group) => {
                write(values, &group.path, Value::Object(Map::new()));
                collect_nodes(&group.children, values);
            }
            FieldNode::Array(array) => {
                write(values, &array.path, Value::Array(Vec::new()));
                for item in &array.items {
                    write(values, &item.path, Value::Object(Map::new()));
                    for field in &item.fields {
                        write(values, &field.path, field.value.clone());
                    }
                }
            }
        }
    }
}

fn write(values: &mut ValueTree, path: &ValuePath, value: Value) {
    if let Err(e) = values.set(path, value) {
        warn!("Skipping field: {}", e);
    }
}
