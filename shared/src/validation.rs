//! Validation utilities for the Weather Insights platform
//!
//! Observations are checked once at the write boundary; everything
//! downstream assumes the ranges below hold.

use thiserror::Error;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::models::CreateObservationInput;

/// First failing field of a rejected payload
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path to the field, e.g. `current.humidity`
    pub field: String,
    pub message: String,
}

/// Validate an incoming observation
pub fn validate_observation(input: &CreateObservationInput) -> Result<(), ValidationError> {
    input.validate().map_err(|errors| {
        first_error(&errors, "").unwrap_or_else(|| ValidationError {
            field: "observation".to_string(),
            message: "invalid observation".to_string(),
        })
    })
}

/// Pick the first error in field-name order so messages are stable
fn first_error(errors: &ValidationErrors, prefix: &str) -> Option<ValidationError> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by_key(|(name, _)| **name);

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        };

        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|e| ValidationError {
                field: path.clone(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            }),
            ValidationErrorsKind::Struct(inner) => first_error(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(index, inner)| first_error(inner, &format!("{}[{}]", path, index))),
        };

        if found.is_some() {
            return found;
        }
    }

    None
}
