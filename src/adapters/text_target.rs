//! In-memory text field implementing [`TextTarget`]

use std::fmt;

use crate::domain::TextTarget;

/// Replace the last occurrence of `needle` in `value` with `replacement`.
/// When `needle` is empty or absent, `replacement` is appended.
pub fn splice_last(value: &str, needle: &str, replacement: &str) -> String {
    match value.rfind(needle).filter(|_| !needle.is_empty()) {
        Some(start) => {
            let mut out = String::with_capacity(value.len() + replacement.len());
            out.push_str(&value[..start]);
            out.push_str(replacement);
            out.push_str(&value[start + needle.len()..]);
            out
        }
        None => format!("{}{}", value, replacement),
    }
}

type ChangeListener = Box<dyn Fn(&str) + Send + Sync>;

/// A text buffer with a cursor, standing in for a page input field
pub struct BufferTarget {
    value: String,
    cursor: usize,
    listeners: Vec<ChangeListener>,
}

impl BufferTarget {
    /// Buffer holding `value` with the cursor at its end
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self {
            value,
            cursor,
            listeners: Vec::new(),
        }
    }

    pub fn with_cursor(mut self, cursor: usize) -> Self {
        self.cursor = cursor.min(self.value.chars().count());
        self
    }

    /// Register an observer called with the new value after every splice
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Type `text` at the cursor
    pub fn insert(&mut self, text: &str) {
        let byte_idx = self
            .value
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len());
        self.value.insert_str(byte_idx, text);
        self.cursor += text.chars().count();
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for BufferTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferTarget")
            .field("value", &self.value)
            .field("cursor", &self.cursor)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TextTarget for BufferTarget {
    fn read_value(&self) -> String {
        self.value.clone()
    }

    fn read_cursor_offset(&self) -> usize {
        self.cursor
    }

    fn splice_text(&mut self, matched_trigger: &str, replacement: &str) {
        self.value = splice_last(&self.value, matched_trigger, replacement);
        self.cursor = self.value.chars().count();
        for listener in &self.listeners {
            listener(&self.value);
        }
    }
}
