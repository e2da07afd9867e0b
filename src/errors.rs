// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for function handling

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur while handling an inbound event
#[derive(Debug, Error)]
pub enum FunctionError {
    /// The inbound event is malformed or lacks a required value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The event conflicts with the persisted state of the asset
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Storage collaborator error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Messaging collaborator error
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Processing was cancelled before any side effect was committed
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for function handling
pub type FunctionResult<T> = Result<T, FunctionError>;

impl From<async_nats::Error> for FunctionError {
    fn from(err: async_nats::Error) -> Self {
        FunctionError::Messaging(err.to_string())
    }
}

impl FunctionError {
    /// Whether redelivering the same message could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FunctionError::Storage(StorageError::Backend(_))
                | FunctionError::Messaging(_)
                | FunctionError::Cancelled
        )
    }
}
