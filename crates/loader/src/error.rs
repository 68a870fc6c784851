//! Loader error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Loader error
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Cache file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache file is not valid JSON of the expected shape
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Requested module has no cached activations
    #[error("no cached activations for module '{module}' (expected {path})")]
    MissingModule { module: String, path: PathBuf },

    /// Cache contents contradict each other
    #[error("inconsistent cache: {message}")]
    InconsistentCache { message: String },

    /// Window could not be turned into an example
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl LoaderError {
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::InconsistentCache {
            message: message.into(),
        }
    }
}

/// Loader Result alias
pub type Result<T> = std::result::Result<T, LoaderError>;
