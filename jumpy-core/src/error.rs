//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum JumpyError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// Invalid configuration value, reported once at construction.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A sample batch carries fewer time offsets than the configured
    /// rollout depth and n-step horizon require.
    #[error("Sample batch carries {actual} time offsets, at least {required} required")]
    BatchHorizon {
        /// Number of offsets the loss computation needs.
        required: usize,
        /// Number of offsets the batch actually carries.
        actual: usize,
    },

    /// Batch fields disagree on their leading dimensions.
    #[error("Batch field shape mismatch: {0}")]
    BatchShape(String),
}
