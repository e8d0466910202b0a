//! Trigger detection in text typed before the cursor

/// Keys that cause the text before the cursor to be checked for a trigger
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerKey {
    Space,
    Tab,
}

impl TriggerKey {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            ' ' => Some(TriggerKey::Space),
            '\t' => Some(TriggerKey::Tab),
            _ => None,
        }
    }
}

/// First trigger in `triggers` that `text_before_cursor` ends with.
///
/// Order matters: the first suffix match wins, not the longest one.
pub fn match_trigger<'a, S: AsRef<str>>(triggers: &'a [S], text_before_cursor: &str) -> Option<&'a str> {
    if text_before_cursor.is_empty() {
        return None;
    }
    triggers
        .iter()
        .map(AsRef::as_ref)
        .find(|trigger| !trigger.is_empty() && text_before_cursor.ends_with(trigger))
}

/// Text in `value` before char offset `cursor` (clamped to the value's length)
pub fn text_before_cursor(value: &str, cursor: usize) -> &str {
    match value.char_indices().nth(cursor) {
        Some((byte_idx, _)) => &value[..byte_idx],
        None => value,
    }
}
