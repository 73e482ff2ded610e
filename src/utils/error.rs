//! Error Handling Module
//!
//! Defines the error type shared by the dataset, model and training modules.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for CIFAR-10 training operations
#[derive(Error, Debug)]
pub enum CifarError {
    /// A corpus file is missing from the data directory
    #[error("Dataset file not found: '{0}' (download the CIFAR-10 binary version first)")]
    MissingFile(PathBuf),

    /// Malformed corpus contents
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Invalid configuration or hyperparameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input batch does not match the model's expected layout
    #[error("Shape mismatch: expected [_, {expected_channels}, {expected_size}, {expected_size}], got {actual:?}")]
    ShapeMismatch {
        expected_channels: usize,
        expected_size: usize,
        actual: [usize; 4],
    },

    /// Evaluation over a partition that yields no batches
    #[error("Partition '{0}' is empty")]
    EmptyPartition(String),

    /// Model checkpoint could not be saved or loaded
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CifarError {
    fn from(err: serde_json::Error) -> Self {
        CifarError::Serialization(err.to_string())
    }
}

/// Convenience Result type for this crate
pub type Result<T> = std::result::Result<T, CifarError>;
