//! Value paths addressing fields inside a form's value tree
//!
//! Paths are kept structured (a list of segments) from the moment the field
//! tree is built; the dotted/bracketed text form (`character[0].appearance`)
//! only exists at the boundary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a textual value path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Empty path")]
    Empty,

    #[error("Unclosed '[' in path '{0}'")]
    UnclosedBracket(String),

    #[error("Invalid array index '{index}' in path '{path}'")]
    InvalidIndex { path: String, index: String },

    #[error("Empty key in path '{0}'")]
    EmptyKey(String),

    #[error("Path '{0}' must start with a key")]
    RootIndex(String),

    #[error("Array index {index} in path '{path}' exceeds the limit of {max}")]
    IndexTooLarge { path: String, index: usize, max: usize },
}

// ============================================================================
// Path Segment
// ============================================================================

/// Segment of a value path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Mapping key access: .fieldName
    Key(String),
    /// Array index access: [0], [1], etc.
    Index(usize),
}

// ============================================================================
// Value Path
// ============================================================================

/// Location of one field in the value tree (e.g. "style.mood" or "items[0].name")
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ValuePath {
    segments: Vec<PathSegment>,
}

impl ValuePath {
    /// Create a root path (empty)
    pub fn root() -> Self {
        Self { segments: vec![] }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Extend with a key segment
    pub fn push_key(&self, key: &str) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Key(key.to_string()));
        new
    }

    /// Extend with an array index segment
    pub fn push_index(&self, idx: usize) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Index(idx));
        new
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Parent path (without the last segment)
    pub fn parent(&self) -> Self {
        let mut new = self.clone();
        new.segments.pop();
        new
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Whether `prefix` is a leading run of this path's segments
    pub fn starts_with(&self, prefix: &ValuePath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Copy of this path with the index segment at `position` replaced.
    ///
    /// Used when array items shift down after a deletion: every descendant of
    /// `items[3]` becomes a descendant of `items[2]`. Non-index segments at
    /// `position` are left untouched.
    pub fn reindexed(&self, position: usize, new_index: usize) -> Self {
        let mut new = self.clone();
        if let Some(PathSegment::Index(idx)) = new.segments.get_mut(position) {
            *idx = new_index;
        }
        new
    }

    /// Parse a textual path such as `a.b[2].c`
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.trim().is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars().peekable();
        // A key is expected after a '.' and must not be empty
        let mut after_dot = false;

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if current.is_empty() && (segments.is_empty() || after_dot) {
                        return Err(PathError::EmptyKey(s.to_string()));
                    }
                    if !current.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    }
                    after_dot = true;
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    } else if after_dot {
                        return Err(PathError::EmptyKey(s.to_string()));
                    }
                    after_dot = false;

                    let mut index_str = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        index_str.push(c);
                    }
                    if !closed {
                        return Err(PathError::UnclosedBracket(s.to_string()));
                    }
                    let idx = index_str
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| PathError::InvalidIndex {
                            path: s.to_string(),
                            index: index_str.clone(),
                        })?;
                    segments.push(PathSegment::Index(idx));
                }
                _ => {
                    after_dot = false;
                    current.push(ch);
                }
            }
        }

        if after_dot {
            return Err(PathError::EmptyKey(s.to_string()));
        }
        if !current.is_empty() {
            segments.push(PathSegment::Key(current));
        }

        Ok(Self { segments })
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                PathSegment::Key(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Key(name) => write!(f, ".{}", name)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl FromStr for ValuePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ValuePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ValuePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ValuePath::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================
