//! Error types for QUIRE operations

use crate::RecordKind;
use std::fmt;
use thiserror::Error;

/// A single validation failure, reported as a key and message pair.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{key}: {message}")]
pub struct ValidationError {
    pub key: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// All validation failures collected for one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// True when any collected error was reported against `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.0.iter().any(|e| e.key == key)
    }

    /// `Ok(())` when nothing was collected, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found: {entity:?} with id {id}")]
    NotFound { entity: RecordKind, id: String },

    #[error("Batch of {requested} keys exceeds the backend limit of {max}")]
    BatchTooLarge { requested: usize, max: usize },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Precondition failed: {reason}")]
    Precondition { reason: String },
}

/// Composite key errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key {key} does not carry the soft-delete marker")]
    MissingSoftDeleteMarker { key: String },

    #[error("Invalid tenant {tenant:?}: {reason}")]
    InvalidTenant { tenant: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all QUIRE errors.
#[derive(Debug, Clone, Error)]
pub enum QuireError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ValidationError> for QuireError {
    fn from(error: ValidationError) -> Self {
        QuireError::Validation(error.into())
    }
}

impl QuireError {
    /// True for `StorageError::NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, QuireError::Storage(StorageError::NotFound { .. }))
    }
}

/// Result type alias for QUIRE operations.
pub type QuireResult<T> = Result<T, QuireError>;

// =============================================================================
// TESTS
// =============================================================================
