use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ReceiverError>;

/// Failures surfaced by the receiver and dataset tooling.
///
/// None of these are fatal to a batch run: the walker and the evaluator log
/// them per trial and move on.
#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Malformed or unsupported `.npy` artifact
    #[error("NPY format error: {0}")]
    Npy(String),

    /// meta.json is present but not an object of key/value pairs
    #[error("Invalid metadata in {path}: {reason}")]
    InvalidMetadata { path: PathBuf, reason: String },

    /// Metadata parsed but holds values the receiver cannot run with
    #[error("Invalid trial configuration: {0}")]
    InvalidConfig(String),

    #[error("FEC decode failed: {0}")]
    Fec(String),
}

impl ReceiverError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
