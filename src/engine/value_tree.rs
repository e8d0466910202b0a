//! Mutable value tree addressed by [`ValuePath`]s
//!
//! Intermediate containers are created on demand while writing: an array when
//! the next segment is an index, an object otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::path::{PathError, PathSegment, ValuePath};

/// Largest array index a write may address; larger indices would null-fill huge gaps
pub const MAX_INDEX: usize = 65_535;

/// Collected form values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueTree {
    root: Value,
}

impl Default for ValueTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueTree {
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Wrap an existing JSON value. Non-object roots are replaced by an empty object.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => Self { root: value },
            _ => Self::new(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Write `value` at `path`, overwriting any existing leaf.
    ///
    /// The root stays an object: paths starting with an index are rejected,
    /// as are indices above [`MAX_INDEX`].
    pub fn set(&mut self, path: &ValuePath, value: Value) -> Result<(), PathError> {
        if path.is_root() {
            if value.is_object() {
                self.root = value;
            }
            return Ok(());
        }
        check_writable(path)?;

        let segments = path.segments();
        let mut current = &mut self.root;
        for (i, seg) in segments.iter().enumerate() {
            let is_last = i + 1 == segments.len();
            let next_is_index = matches!(segments.get(i + 1), Some(PathSegment::Index(_)));
            let slot = child_slot(current, seg);
            if is_last {
                *slot = value;
                break;
            }
            ensure_container(slot, next_is_index);
            current = slot;
        }
        Ok(())
    }

    /// Parse `path` and write `value` there
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<(), PathError> {
        let path = ValuePath::parse(path)?;
        self.set(&path, value)
    }

    /// Read the value stored at `path`
    pub fn get(&self, path: &ValuePath) -> Option<&Value> {
        let mut current = &self.root;
        for seg in path.segments() {
            current = match (seg, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Index(idx), Value::Array(items)) => items.get(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Read the value at `path` as display text.
    ///
    /// Strings are returned as-is; other scalars use their JSON rendering.
    pub fn get_text(&self, path: &ValuePath) -> Option<String> {
        match self.get(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Number of items stored in the array at `path` (0 when absent)
    pub fn array_len(&self, path: &ValuePath) -> usize {
        self.get(path)
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Remove the value at `path`. Removing an array element shifts later
    /// elements down so indices stay contiguous.
    pub fn remove(&mut self, path: &ValuePath) -> Option<Value> {
        let last = path.last()?.clone();
        let parent = self.get_mut(&path.parent())?;
        match (last, parent) {
            (PathSegment::Key(key), Value::Object(map)) => map.shift_remove(&key),
            (PathSegment::Index(idx), Value::Array(items)) if idx < items.len() => {
                Some(items.remove(idx))
            }
            _ => None,
        }
    }

    fn get_mut(&mut self, path: &ValuePath) -> Option<&mut Value> {
        let mut current = &mut self.root;
        for seg in path.segments() {
            current = match (seg, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key)?,
                (PathSegment::Index(idx), Value::Array(items)) => items.get_mut(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn check_writable(path: &ValuePath) -> Result<(), PathError> {
    if matches!(path.segments().first(), Some(PathSegment::Index(_))) {
        return Err(PathError::RootIndex(path.to_string()));
    }
    for seg in path.segments() {
        if let PathSegment::Index(idx) = seg {
            if *idx > MAX_INDEX {
                return Err(PathError::IndexTooLarge {
                    path: path.to_string(),
                    index: *idx,
                    max: MAX_INDEX,
                });
            }
        }
    }
    Ok(())
}

/// Slot for `seg` inside `container`, coercing the container to the right shape
fn child_slot<'a>(container: &'a mut Value, seg: &PathSegment) -> &'a mut Value {
    match seg {
        PathSegment::Key(key) => {
            if !container.is_object() {
                *container = Value::Object(Map::new());
            }
            match container {
                Value::Object(map) => map.entry(key.clone()).or_insert(Value::Null),
                _ => unreachable!("container coerced to object"),
            }
        }
        PathSegment::Index(idx) => {
            if !container.is_array() {
                *container = Value::Array(Vec::new());
            }
            match container {
                Value::Array(items) => {
                    if items.len() <= *idx {
                        items.resize(*idx + 1, Value::Null);
                    }
                    &mut items[*idx]
                }
                _ => unreachable!("container coerced to array"),
            }
        }
    }
}

fn ensure_container(slot: &mut Value, want_array: bool) {
    if want_array && !slot.is_array() {
        *slot = Value::Array(Vec::new());
    } else if !want_array && !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
}
