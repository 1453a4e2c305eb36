//! # Error Types
//!
//! Structured error types for estimate_core. Every fallible operation on the
//! write path (structure edits, line-item edits, file I/O) returns one of
//! these. The read path (summaries, export rendering) does not fail.
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::errors::{EstimateError, EstimateResult};
//!
//! fn validate_quantity(qty: i64) -> EstimateResult<()> {
//!     if qty <= 0 {
//!         return Err(EstimateError::invalid_input(
//!             "quantity",
//!             qty.to_string(),
//!             "Quantity must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for estimate_core operations
pub type EstimateResult<T> = Result<T, EstimateError>;

/// Structured error type for project mutations and persistence.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum EstimateError {
    /// An input value is invalid (empty name, out-of-range dimension, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A sibling with the same (case-insensitive) name already exists
    #[error("'{name}' already exists in {parent}")]
    DuplicateName { name: String, parent: String },

    /// A node addressed by path does not exist
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Node still has children and cannot be removed
    #[error("Cannot remove '{path}': it still contains {children} node(s)")]
    NotEmpty { path: String, children: usize },

    /// A structural limit (children per node, nesting depth) would be exceeded
    #[error("Limit exceeded: {limit} (maximum {max})")]
    LimitExceeded { limit: String, max: usize },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl EstimateError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        EstimateError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a DuplicateName error
    pub fn duplicate_name(name: impl Into<String>, parent: impl Into<String>) -> Self {
        EstimateError::DuplicateName {
            name: name.into(),
            parent: parent.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(path: impl Into<String>) -> Self {
        EstimateError::NotFound { path: path.into() }
    }

    /// Create a NotEmpty error
    pub fn not_empty(path: impl Into<String>, children: usize) -> Self {
        EstimateError::NotEmpty {
            path: path.into(),
            children,
        }
    }

    /// Create a LimitExceeded error
    pub fn limit_exceeded(limit: impl Into<String>, max: usize) -> Self {
        EstimateError::LimitExceeded {
            limit: limit.into(),
            max,
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        EstimateError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        EstimateError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        EstimateError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EstimateError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            EstimateError::InvalidInput { .. } => "INVALID_INPUT",
            EstimateError::DuplicateName { .. } => "DUPLICATE_NAME",
            EstimateError::NotFound { .. } => "NOT_FOUND",
            EstimateError::NotEmpty { .. } => "NOT_EMPTY",
            EstimateError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            EstimateError::FileError { .. } => "FILE_ERROR",
            EstimateError::FileLocked { .. } => "FILE_LOCKED",
            EstimateError::SerializationError { .. } => "SERIALIZATION_ERROR",
            EstimateError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}
