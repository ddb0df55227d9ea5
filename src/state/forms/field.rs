//! Form field value objects

use serde::{Deserialize, Serialize};

/// Type-safe field values
///
/// Serialized untagged so a saved session stores plain JSON values
/// (`null`, `true`, `12`, `"text"`, `["a", "b"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
    #[default]
    Empty,
}

impl FieldValue {
    /// Shorthand for a text value
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Shorthand for a list value
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Get the text value (returns empty string for non-text values)
    pub fn as_text(&self) -> &str {
        match self {
            FieldValue::Text(s) => s,
            _ => "",
        }
    }

    /// Get the boolean value (non-boolean values read as false)
    pub fn as_bool(&self) -> bool {
        matches!(self, FieldValue::Bool(true))
    }

    /// Get the list items (empty for non-list values)
    pub fn as_list(&self) -> &[String] {
        match self {
            FieldValue::List(items) => items,
            _ => &[],
        }
    }

    /// True when the value carries no user input. Booleans are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Bool(_) | FieldValue::Number(_) => false,
        }
    }

    /// Get the display value for rendering
    pub fn display_value(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Bool(true) => "[x]".to_string(),
            FieldValue::Bool(false) => "[ ]".to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// The input type of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Checkbox
    Boolean,
    /// Single selection from fixed options
    Choice(&'static [&'static str]),
    /// Any subset of fixed options
    ChoiceSet(&'static [&'static str]),
    /// Path to an uploaded document
    File,
    Number,
}

impl FieldKind {
    /// Whether a value has the right shape for this kind
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (FieldKind::Boolean, FieldValue::Bool(_)) => true,
            (FieldKind::Boolean, _) => false,
            (_, FieldValue::Empty) => true,
            (FieldKind::Text | FieldKind::File, FieldValue::Text(_)) => true,
            (FieldKind::Number, FieldValue::Number(n)) => n.is_finite(),
            (FieldKind::Choice(options), FieldValue::Text(s)) => options.contains(&s.as_str()),
            (FieldKind::ChoiceSet(options), FieldValue::List(items)) => {
                items.iter().all(|item| options.contains(&item.as_str()))
            }
            _ => false,
        }
    }

    /// Value a field of this kind starts with
    pub fn default_value(&self) -> FieldValue {
        match self {
            FieldKind::Boolean => FieldValue::Bool(false),
            FieldKind::ChoiceSet(_) => FieldValue::List(Vec::new()),
            _ => FieldValue::Empty,
        }
    }

    /// Options for choice kinds
    pub fn options(&self) -> &'static [&'static str] {
        match self {
            FieldKind::Choice(options) | FieldKind::ChoiceSet(options) => options,
            _ => &[],
        }
    }

    /// Whether typed characters edit this field directly
    pub fn is_typed(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::File | FieldKind::Number)
    }
}
