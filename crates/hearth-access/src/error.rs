//! Access control error types.

use hearth_core::error::join_field_errors;
use hearth_core::{FamilyId, FieldError, HearthError, RoleId};
use thiserror::Error;

/// Access control result type.
pub type AccessResult<T> = Result<T, AccessError>;

/// Access control errors.
///
/// Denied authorization decisions are *values* (`false`,
/// [`ScopeFilter::Forbidden`](crate::ScopeFilter::Forbidden)), not errors;
/// the `Forbidden` variant below is raised only by lifecycle operations.
#[derive(Error, Debug)]
pub enum AccessError {
    /// Malformed role specification; every offending field is listed.
    #[error("validation failed: {}", join_field_errors(.errors))]
    Validation {
        /// The field-level failures.
        errors: Vec<FieldError>,
    },

    /// The operation conflicts with current state (role in use, duplicate
    /// default, system role deletion).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Role data is corrupt (inheritance cycle) and needs administrator
    /// intervention.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The acting caller may not perform this administrative action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Role not found.
    #[error("role not found: {0}")]
    RoleNotFound(RoleId),

    /// Family not found.
    #[error("family not found: {0}")]
    FamilyNotFound(FamilyId),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AccessError {
    /// Creates a validation error for a single field.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Configuration(_) => "CONFIG_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::RoleNotFound(_) => "ROLE_NOT_FOUND",
            Self::FamilyNotFound(_) => "FAMILY_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Conflict(_) => 409,
            Self::Forbidden(_) => 403,
            Self::RoleNotFound(_) | Self::FamilyNotFound(_) => 404,
            Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<AccessError> for HearthError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Validation { errors } => Self::Validation { errors },
            AccessError::Conflict(msg) => Self::Conflict(msg),
            AccessError::Configuration(msg) => Self::Configuration(msg),
            AccessError::Forbidden(msg) => Self::Forbidden(msg),
            AccessError::RoleNotFound(id) => Self::NotFound(format!("role {id}")),
            AccessError::FamilyNotFound(id) => Self::NotFound(format!("family {id}")),
            AccessError::Internal(msg) => Self::Internal(msg),
        }
    }
}
