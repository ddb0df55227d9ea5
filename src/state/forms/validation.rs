//! Step validation engine

use super::schema::{FormValues, Schema};
use crate::state::FieldValue;
use std::collections::BTreeMap;

/// Field-level errors from one validation pass (absent key = valid)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error message for a field, if it failed
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
    }

    /// Drop a field's error (after the user corrected it)
    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.errors.remove(field)
    }

    /// The first failing field in schema declaration order
    pub fn first_invalid_field(&self, schema: &Schema) -> Option<&'static str> {
        schema
            .fields()
            .iter()
            .map(|f| f.name)
            .find(|name| self.errors.contains_key(*name))
    }
}

/// Validate every required, visible field of `step`, collecting all failures
pub fn validate_step(schema: &Schema, step: usize, values: &FormValues) -> ValidationResult {
    let mut result = ValidationResult::default();
    let empty = FieldValue::Empty;

    for field in schema.visible_fields(step, values) {
        if !field.required {
            continue;
        }
        let value = values.get(field.name).unwrap_or(&empty);
        if let Err(message) = field.rule.check(value) {
            result.insert(field.name, message);
        }
    }

    result
}

/// Validate all steps at once
pub fn validate_all(schema: &Schema, values: &FormValues) -> ValidationResult {
    let mut result = ValidationResult::default();
    for step in 1..=schema.step_count() {
        for (field, message) in validate_step(schema, step, values).iter() {
            result.insert(field, message);
        }
    }
    result
}
