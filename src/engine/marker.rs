//! Marker classification for template values
//!
//! Every leaf of a template is either a literal or a `$`-prefixed marker
//! string describing how the field is collected. Classification happens once
//! per value; the rest of the engine works on [`Marker`] instead of probing
//! string shapes again.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Prefix shared by every marker token
pub const MARKER_PREFIX: char = '$';

const INPUT_TOKEN: &str = "$input";
const SELECT_TOKEN: &str = "$select:";
const ARRAY_TOKEN: &str = "$array:";

/// Semantic kind of a template value
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Marker {
    /// Literal carried verbatim into output; read-only in the form
    Static { value: Value },
    /// Free-text field. `label` is only present for `$input:<label>`
    Input { label: Option<String> },
    /// Text field with an ordered suggestion list; free text is accepted
    Select { options: Vec<String> },
    /// Repeatable group, each item an instance of the named schema
    Array { schema: String },
}

impl Marker {
    /// Classify a raw template value. Never fails: anything that is not a
    /// well-formed marker is static.
    pub fn parse(value: &Value) -> Marker {
        match value {
            Value::String(s) => Self::parse_str(s),
            other => Marker::Static {
                value: other.clone(),
            },
        }
    }

    /// Classify a raw template string
    pub fn parse_str(s: &str) -> Marker {
        if s == INPUT_TOKEN {
            return Marker::Input { label: None };
        }

        if let Some(label) = s
            .strip_prefix(INPUT_TOKEN)
            .and_then(|rest| rest.strip_prefix(':'))
        {
            let label = label.trim();
            return Marker::Input {
                label: (!label.is_empty()).then(|| label.to_string()),
            };
        }

        if let Some(rest) = s.strip_prefix(SELECT_TOKEN) {
            let options: Vec<String> = rest
                .split('|')
                .map(str::trim)
                .filter(|opt| !opt.is_empty())
                .map(String::from)
                .collect();
            if !options.is_empty() {
                return Marker::Select { options };
            }
        }

        if let Some(rest) = s.strip_prefix(ARRAY_TOKEN) {
            let schema = rest.trim();
            if !schema.is_empty() {
                return Marker::Array {
                    schema: schema.to_string(),
                };
            }
        }

        Marker::Static {
            value: Value::String(s.to_string()),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Marker::Static { .. })
    }

    /// Visible label for a field keyed `key`.
    ///
    /// Selects are labelled by their key, not by their first option.
    pub fn label_for(&self, key: &str) -> String {
        match self {
            Marker::Input { label: Some(label) } => label.clone(),
            _ => key.to_string(),
        }
    }

    /// Value a freshly created field starts with
    pub fn default_value(&self) -> Value {
        match self {
            Marker::Static { value } => value.clone(),
            Marker::Array { .. } => Value::Array(vec![]),
            Marker::Input { .. } | Marker::Select { .. } => Value::String(String::new()),
        }
    }

    /// Template representation: the literal for statics, the marker string otherwise
    pub fn to_template_value(&self) -> Value {
        match self {
            Marker::Static { value } => value.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Static { value: Value::String(s) } => write!(f, "{}", s),
            Marker::Static { value } => write!(f, "{}", value),
            Marker::Input { label: None } => write!(f, "{}", INPUT_TOKEN),
            Marker::Input { label: Some(label) } => write!(f, "{}:{}", INPUT_TOKEN, label),
            Marker::Select { options } => write!(f, "{}{}", SELECT_TOKEN, options.join("|")),
            Marker::Array { schema } => write!(f, "{}{}", ARRAY_TOKEN, schema),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_string_is_static() {
        for value in [json!(42), json!(true), json!(null), json!([1, 2]), json!(1.5)] {
            assert_eq!(Marker::parse(&value), Marker::Static { value: value.clone() });
        }
    }

    #[test]
    fn test_bare_input() {
        assert_eq!(Marker::parse(&json!("$input")), Marker::Input { label: None });
    }

    #[test]
    fn test_labeled_input() {
        assert_eq!(
            Marker::parse(&json!("$input: Hero name ")),
            Marker::Input {
                label: Some("Hero name".to_string())
            }
        );
        // Empty label behaves like the bare token
        assert_eq!(Marker::parse(&json!("$input:")), Marker::Input { label: None });
    }

    #[test]
    fn test_select_trims_options() {
        assert_eq!(
            Marker::parse(&json!("$select: calm | tense |eerie")),
            Marker::Select {
                options: vec!["calm".into(), "tense".into(), "eerie".into()]
            }
        );
        assert_eq!(
            Marker::parse(&json!("$select:only")),
            Marker::Select {
                options: vec!["only".into()]
            }
        );
    }

    #[test]
    fn test_array_trims_schema_name() {
        assert_eq!(
            Marker::parse(&json!("$array: character ")),
            Marker::Array {
                schema: "character".into()
            }
        );
    }

    #[test]
    fn test_unrecognised_prefixes_fall_through() {
        for s in ["$inputs", "$select:", "$select: | ", "$array:", "$arr:x", "input", "hello"] {
            assert_eq!(
                Marker::parse_str(s),
                Marker::Static {
                    value: Value::String(s.to_string())
                },
                "{s} should be static"
            );
        }
    }

    #[test]
    fn test_marker_round_trip() {
        let markers = vec![
            Marker::Input { label: None },
            Marker::Input {
                label: Some("Name".into()),
            },
            Marker::Select {
                options: vec!["a".into(), "b".into()],
            },
            Marker::Array {
                schema: "scene".into(),
            },
        ];
        for marker in markers {
            assert_eq!(Marker::parse_str(&marker.to_string()), marker);
            assert_eq!(Marker::parse(&marker.to_template_value()), marker);
        }
    }

    #[test]
    fn test_label_for() {
        let select = Marker::parse_str("$select:first|second");
        assert_eq!(select.label_for("mood"), "mood");
        assert_eq!(Marker::parse_str("$input").label_for("title"), "title");
        assert_eq!(Marker::parse_str("$input:Title").label_for("title"), "Title");
    }
}
