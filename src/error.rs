//! Error taxonomy for the acquisition and reconstruction pipeline.

use thiserror::Error;

/// Failure classes surfaced at component boundaries.
///
/// Per-tile failures are recovered inside the fetch loop and never reach
/// the caller as this type; whole-batch failures are reported as an empty
/// result instead of an error. Only precondition violations and
/// structural failures propagate.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unsafe or malformed URL, path, or coordinate input, rejected
    /// before any I/O happens.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Timeout, connection failure, or non-2xx status.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// Corrupt or undecodable image bytes.
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// Structural failure such as zero usable tiles or zero assemblable
    /// rows.
    #[error("processing failed: {0}")]
    Processing(String),
}
