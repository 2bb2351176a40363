//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end the process with a non-zero status.
///
/// Provider trouble is not among them: a guide with missing channels is
/// still a successful run.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be read, parsed or resolved.
    #[error("configuration error: {0}")]
    Config(String),

    /// The channel catalog could not be loaded.
    #[error("catalog error ({}): {message}", path.display())]
    Catalog { path: PathBuf, message: String },

    /// Logging could not be set up.
    #[error("logging setup failed: {0}")]
    Tracing(#[from] proxyepg_core::TracingError),

    /// The guide run itself failed.
    #[error(transparent)]
    Engine(#[from] proxyepg_engine::EngineError),

    /// The guide could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn catalog(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Catalog {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }
}
