use std::path::PathBuf;

/// Core error type for the governance layer.
///
/// Load-time failures (`Parse`, `ConfigLoad`) are recovered inside
/// `ConfigStore::load`; everything else is surfaced to the caller of a mutation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("config load error: {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid key path: {0}")]
    InvalidKeyPath(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Wrap any load-pipeline failure with the path being loaded.
    pub fn config_load(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
