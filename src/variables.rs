//! Key/value variable store the module publishes into.
//!
//! The store is the only place the selected-event reference lives; the
//! cursor reads and writes it through [`VariableStore`].

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Variable holding the selected event's schedule id as text.
pub const SELECTED_EVENT_ID: &str = "selected_event_id";

pub type VariableValues = BTreeMap<String, VariableValue>;

/// A single variable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VariableValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Unset,
}

impl VariableValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Unset => Ok(()),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for VariableValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Declares a variable the host should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDefinition {
    pub variable_id: String,
    pub name: String,
}

impl VariableDefinition {
    pub fn new(variable_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            variable_id: variable_id.into(),
            name: name.into(),
        }
    }
}

/// Host variable store.
pub trait VariableStore: Send + Sync {
    /// Current value of a variable, if it was ever set.
    fn value(&self, variable_id: &str) -> Option<VariableValue>;

    /// Merge values into the store. Variables not named keep their value.
    fn set_values(&self, values: VariableValues);

    /// Replace the set of declared variables.
    fn set_definitions(&self, definitions: Vec<VariableDefinition>);

    /// The selected event reference, when it holds text.
    fn selected_event(&self) -> Option<String> {
        self.value(SELECTED_EVENT_ID)
            .and_then(|v| v.as_text().map(str::to_string))
    }
}

/// In-process variable store.
#[derive(Debug, Default)]
pub struct MemoryVariables {
    values: RwLock<VariableValues>,
    definitions: RwLock<Vec<VariableDefinition>>,
}

impl MemoryVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every value currently set.
    pub fn values(&self) -> VariableValues {
        self.values.read().clone()
    }

    pub fn definitions(&self) -> Vec<VariableDefinition> {
        self.definitions.read().clone()
    }
}

impl VariableStore for MemoryVariables {
    fn value(&self, variable_id: &str) -> Option<VariableValue> {
        self.values.read().get(variable_id).cloned()
    }

    fn set_values(&self, values: VariableValues) {
        let mut current = self.values.write();
        for (id, value) in values {
            current.insert(id, value);
        }
    }

    fn set_definitions(&self, definitions: Vec<VariableDefinition>) {
        *self.definitions.write() = definitions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_values_merges() {
        let vars = MemoryVariables::new();
        vars.set_values(VariableValues::from([
            ("a".to_string(), VariableValue::from("1")),
            ("b".to_string(), VariableValue::from(true)),
        ]));
        vars.set_values(VariableValues::from([(
            "a".to_string(),
            VariableValue::from("2"),
        )]));

        assert_eq!(vars.value("a"), Some(VariableValue::from("2")));
        assert_eq!(vars.value("b"), Some(VariableValue::Bool(true)));
        assert_eq!(vars.value("c"), None);
    }

    #[test]
    fn selected_event_reads_text_only() {
        let vars = MemoryVariables::new();
        assert_eq!(vars.selected_event(), None);

        vars.set_values(VariableValues::from([(
            SELECTED_EVENT_ID.to_string(),
            VariableValue::from("42"),
        )]));
        assert_eq!(vars.selected_event().as_deref(), Some("42"));

        vars.set_values(VariableValues::from([(
            SELECTED_EVENT_ID.to_string(),
            VariableValue::Unset,
        )]));
        assert_eq!(vars.selected_event(), None);
    }

    #[test]
    fn numbers_display_without_fraction() {
        assert_eq!(VariableValue::Number(5425.0).to_string(), "5425");
        assert_eq!(VariableValue::Number(12.5).to_string(), "12.5");
        assert_eq!(VariableValue::Unset.to_string(), "");
    }
}
