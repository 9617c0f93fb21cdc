use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// SelectionValue
// ---------------------------------------------------------------------------

/// One answer in the selections map: a single choice, a multi-select, or
/// anything else a caller stored (numbers, booleans, objects).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionValue {
    One(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

impl SelectionValue {
    /// The value as a set of choices; a scalar becomes a set of one.
    pub fn choices(&self) -> Vec<&str> {
        match self {
            SelectionValue::One(s) => vec![s.as_str()],
            SelectionValue::Many(items) => items.iter().map(String::as_str).collect(),
            SelectionValue::Other(_) => Vec::new(),
        }
    }

    /// Whether the section counts as answered. Any array counts, even an
    /// empty one; an empty string, `false`, `0` or `null` does not.
    pub fn is_present(&self) -> bool {
        match self {
            SelectionValue::One(s) => !s.is_empty(),
            SelectionValue::Many(_) => true,
            SelectionValue::Other(v) => match v {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                _ => true,
            },
        }
    }
}

impl From<&str> for SelectionValue {
    fn from(s: &str) -> Self {
        SelectionValue::One(s.to_string())
    }
}

impl From<Vec<&str>> for SelectionValue {
    fn from(items: Vec<&str>) -> Self {
        SelectionValue::Many(items.into_iter().map(str::to_string).collect())
    }
}

// ---------------------------------------------------------------------------
// Selections
// ---------------------------------------------------------------------------

/// Section name → answer, e.g. `"Cloud Provider" → "AWS"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selections(BTreeMap<String, SelectionValue>);

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, section: &str) -> Option<&SelectionValue> {
        self.0.get(section)
    }

    pub fn insert(&mut self, section: impl Into<String>, value: impl Into<SelectionValue>) {
        self.0.insert(section.into(), value.into());
    }

    pub fn with(mut self, section: impl Into<String>, value: impl Into<SelectionValue>) -> Self {
        self.insert(section, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SelectionValue)> {
        self.0.iter()
    }

    /// Scalar equality. A multi-select never equals a single value.
    pub fn equals(&self, section: &str, value: &str) -> bool {
        matches!(self.get(section), Some(SelectionValue::One(s)) if s == value)
    }

    /// Set membership, with scalars normalised to a set of one.
    pub fn includes(&self, section: &str, value: &str) -> bool {
        self.get(section)
            .is_some_and(|v| v.choices().contains(&value))
    }

    pub fn is_present(&self, section: &str) -> bool {
        self.get(section).is_some_and(SelectionValue::is_present)
    }
}
