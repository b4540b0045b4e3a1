//! Request payloads accepted by the REST endpoints.

use std::fmt::Display;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use validator::ValidationErrors;

use crate::domain::types::CleanText;
use crate::services::errors::ErrorDetail;

pub mod activities;
pub mod auth;
pub mod contacts;
pub mod deals;
pub mod tasks;
pub mod users;

#[derive(Debug, Error)]
/// Errors that can occur when processing request payloads.
pub enum FormError {
    #[error("validation errors: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{field}: {message}")]
    Field {
        field: &'static str,
        message: String,
    },
}

impl FormError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        FormError::Field {
            field,
            message: message.into(),
        }
    }

    /// Flattens the error into per-field details, sorted by field name.
    pub fn details(&self) -> Vec<ErrorDetail> {
        match self {
            FormError::Validation(errors) => {
                let mut details: Vec<ErrorDetail> = errors
                    .field_errors()
                    .into_iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |err| ErrorDetail {
                            field: Some(field.to_string()),
                            message: err
                                .message
                                .as_ref()
                                .map(ToString::to_string)
                                .unwrap_or_else(|| "Invalid value.".to_string()),
                            code: Some(err.code.to_string()),
                        })
                    })
                    .collect();
                details.sort_by(|a, b| a.field.cmp(&b.field));
                details
            }
            FormError::Field { field, message } => vec![ErrorDetail::field(*field, message)],
        }
    }
}

/// Attaches the field name to a value-object construction failure.
pub(crate) fn parse_field<T, E: Display>(
    field: &'static str,
    result: Result<T, E>,
) -> Result<T, FormError> {
    result.map_err(|e| FormError::field(field, e.to_string()))
}

/// Sanitized text; blank input becomes `None`.
pub(crate) fn clean_text(value: Option<String>) -> Option<String> {
    CleanText::optional(value).map(CleanText::into_inner)
}

/// Keeps "absent" and "explicit null" apart for PATCH payloads.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Maps an optional raw value through a fallible parser, keeping `Some(None)`.
pub(crate) fn parse_nullable<T, E: Display>(
    field: &'static str,
    value: Option<Option<String>>,
    parse: impl Fn(String) -> Result<T, E>,
) -> Result<Option<Option<T>>, FormError> {
    match value {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(raw)) if raw.trim().is_empty() => Ok(Some(None)),
        Some(Some(raw)) => parse_field(field, parse(raw)).map(|v| Some(Some(v))),
    }
}

/// Optional value that is parsed only when present and non-blank.
pub(crate) fn parse_optional<T, E: Display>(
    field: &'static str,
    value: Option<String>,
    parse: impl Fn(String) -> Result<T, E>,
) -> Result<Option<T>, FormError> {
    match value {
        Some(raw) if !raw.trim().is_empty() => parse_field(field, parse(raw)).map(Some),
        _ => Ok(None),
    }
}
