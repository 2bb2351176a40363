//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised before a guide run starts.
///
/// A started run never fails: provider failures and the run timeout are
/// absorbed per channel by the resolution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EngineError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
