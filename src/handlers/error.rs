//! Handler error types.

use thiserror::Error;

use crate::chain::ChainError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler '{handler_name}' failed: {message}")]
    HandlerError {
        handler_name: String,
        message: String,
    },

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Chain read error: {0}")]
    ChainError(#[from] ChainError),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl HandlerError {
    /// Create a handler error with context.
    pub fn handler(name: &str, message: impl Into<String>) -> Self {
        Self::HandlerError {
            handler_name: name.to_string(),
            message: message.into(),
        }
    }
}
