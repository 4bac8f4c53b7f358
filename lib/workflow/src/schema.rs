//! Config schemas declared by catalog entries.
//!
//! A schema is a flat list of named fields with a type and a required flag.
//! Unknown fields are rejected so typos surface in the editor instead of
//! silently doing nothing at run time.

use crate::node::Config;
use postflow_core::Platform;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The type a config field must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// A platform wire name (`"x"`, `"instagram"`, ...).
    Platform,
    /// A string restricted to the listed values.
    OneOf(Vec<String>),
    /// A list of strings.
    StringList,
}

impl FieldType {
    /// Builds a `OneOf` from string slices.
    #[must_use]
    pub fn one_of(values: &[&str]) -> Self {
        Self::OneOf(values.iter().map(|v| (*v).to_string()).collect())
    }

    fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Platform => value
                .as_str()
                .is_some_and(|name| name.parse::<Platform>().is_ok()),
            Self::OneOf(values) => value
                .as_str()
                .is_some_and(|v| values.iter().any(|allowed| allowed == v)),
            Self::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(JsonValue::is_string)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::String => "a string".to_string(),
            Self::Integer => "an integer".to_string(),
            Self::Number => "a number".to_string(),
            Self::Boolean => "a boolean".to_string(),
            Self::Platform => "a platform name".to_string(),
            Self::OneOf(values) => format!("one of [{}]", values.join(", ")),
            Self::StringList => "a list of strings".to_string(),
        }
    }
}

/// A single field in a config schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigField {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
}

impl ConfigField {
    #[must_use]
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    #[must_use]
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }
}

/// The declared input shape of a node type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub fields: Vec<ConfigField>,
}

impl ConfigSchema {
    #[must_use]
    pub fn new(fields: Vec<ConfigField>) -> Self {
        Self { fields }
    }

    /// Returns the field with the given name, if declared.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ConfigField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks a config against this schema.
    ///
    /// `null` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns a description of the first mismatch found.
    pub fn validate(&self, config: &Config) -> Result<(), String> {
        for (name, value) in config {
            let Some(field) = self.field(name) else {
                return Err(format!("unknown field '{name}'"));
            };
            if !value.is_null() && !field.field_type.accepts(value) {
                return Err(format!(
                    "field '{name}' must be {}",
                    field.field_type.describe()
                ));
            }
        }

        for field in self.fields.iter().filter(|f| f.required) {
            if config.get(&field.name).is_none_or(JsonValue::is_null) {
                return Err(format!("missing required field '{}'", field.name));
            }
        }

        Ok(())
    }
}
