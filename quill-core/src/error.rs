//! Error types for Quill operations

use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Note not found: {id}")]
    NoteNotFound { id: Uuid },

    #[error("Insert failed: {reason}")]
    InsertFailed { reason: String },

    #[error("Update failed for note {id}: {reason}")]
    UpdateFailed { id: Uuid, reason: String },

    #[error("Note {id} was updated by another writer (expected version {expected})")]
    VersionConflict { id: Uuid, expected: i32 },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Cache layer errors.
///
/// Every cache failure is recoverable by falling through to the
/// authoritative store; these exist so callers can log what happened.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    #[error("Failed to read key {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Failed to write key {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Failed to invalidate key {key}: {reason}")]
    InvalidateFailed { key: String, reason: String },

    #[error("Corrupt cache payload for key {key}: {reason}")]
    CorruptPayload { key: String, reason: String },
}

/// Master error type for all Quill errors.
#[derive(Debug, Clone, Error)]
pub enum QuillError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result type alias for Quill operations.
pub type QuillResult<T> = Result<T, QuillError>;

// =============================================================================
// TESTS
// =============================================================================
