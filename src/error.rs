//! Error handling module
//!
//! Provides the unified error type for planning and applying data file replacements.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Reasons a replacement request is refused without touching any state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorCode {
    /// Either file is not a data file
    FileTypeMustBeData,
    /// The two files are not linked to a common release version
    FilesNotInSameRelease,
    /// The original file is not recorded as replaced by the replacement file (or vice versa)
    ReplacementFileNotLinkedToOriginal,
    /// At least one reference could not be matched
    ReplacementPlanNotValid,
}

impl ValidationErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileTypeMustBeData => "FILE_TYPE_MUST_BE_DATA",
            Self::FilesNotInSameRelease => "FILES_NOT_IN_SAME_RELEASE",
            Self::ReplacementFileNotLinkedToOriginal => "REPLACEMENT_FILE_NOT_LINKED_TO_ORIGINAL",
            Self::ReplacementPlanNotValid => "REPLACEMENT_PLAN_NOT_VALID",
        }
    }
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replacement error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplacementError {
    #[error("Validation error: {0}")]
    Validation(ValidationErrorCode),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The validity gate was bypassed or stored state is corrupt
    #[error("Invariant violation: {0}")]
    Invariant(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
    pub fatal: bool,
}

impl ReplacementError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            ReplacementError::Validation(code) => code.as_str(),
            ReplacementError::NotFound(_) => "NOT_FOUND",
            ReplacementError::Invariant(_) => "INVARIANT_VIOLATION",
            ReplacementError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Fatal errors are never retried or repaired
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReplacementError::Invariant(_))
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            message: self.to_string(),
            code: self.code().to_string(),
            fatal: self.is_fatal(),
        }
    }
}

/// Result type alias for replacement operations
pub type ReplacementResult<T> = Result<T, ReplacementError>;

/// Helper function to create a validation error
pub fn validation_error(code: ValidationErrorCode) -> ReplacementError {
    ReplacementError::Validation(code)
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> ReplacementError {
    ReplacementError::NotFound(msg.into())
}

/// Helper function to create an invariant violation
pub fn invariant_error(msg: impl Into<String>) -> ReplacementError {
    let msg = msg.into();
    tracing::error!("Invariant violation: {}", msg);
    ReplacementError::Invariant(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_code() {
        let err = validation_error(ValidationErrorCode::ReplacementPlanNotValid);
        assert_eq!(err.code(), "REPLACEMENT_PLAN_NOT_VALID");
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Validation error: REPLACEMENT_PLAN_NOT_VALID"
        );
    }

    #[test]
    fn test_invariant_is_fatal() {
        let response = invariant_error("link mismatch").to_response();
        assert!(response.fatal);
        assert_eq!(response.code, "INVARIANT_VIOLATION");
        assert!(!response.success);
    }
}
