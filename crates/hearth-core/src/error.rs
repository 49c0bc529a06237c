//! Error types for the Hearth platform.
//!
//! This module defines the platform-wide error hierarchy. Subsystem crates
//! define their own error enums and convert into [`HearthError`] at the API
//! boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using `HearthError`.
pub type HearthResult<T> = Result<T, HearthError>;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Formats a list of field errors for display.
#[must_use]
pub fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main error type for the Hearth platform.
#[derive(Debug, Error)]
pub enum HearthError {
    /// Malformed input; every offending field is listed.
    #[error("validation failed: {}", join_field_errors(.errors))]
    Validation {
        /// The field-level failures.
        errors: Vec<FieldError>,
    },

    /// The caller is not allowed to do this.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The operation conflicts with current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored configuration is corrupt and needs administrator attention.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HearthError {
    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::Configuration(_) => "CONFIG_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::NotFound(_) => 404,
            Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }
}
