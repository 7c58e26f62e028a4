//! Field-level validation errors
//!
//! A `ValidationError` collects one or more `(field, message)` pairs so a
//! caller can report every broken constraint of a DTO at once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single violated field constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// One or more field constraint violations
#[derive(Error, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[error("Validation failed: {}", summarize(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error for a single field
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = Self::new();
        error.push(field, message);
        error
    }

    /// Record another violation
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Absorb the violations of another error
    pub fn merge(&mut self, other: ValidationError) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// True if any violation was recorded against `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was collected, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Check that a trimmed string is present and no longer than `max_len` characters
pub(crate) fn check_text(
    errors: &mut ValidationError,
    field: &str,
    value: &str,
    max_len: Option<usize>,
) {
    if value.trim().is_empty() {
        errors.push(field, "must not be blank");
        return;
    }
    if let Some(max) = max_len {
        let len = value.chars().count();
        if len > max {
            errors.push(field, format!("must be at most {} characters (got {})", max, len));
        }
    }
}
