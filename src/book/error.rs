//! Order book error types.

use thiserror::Error;

/// Errors surfaced by the genuinely fallible book APIs.
///
/// Book mutations themselves are defensive: an unknown id or an empty side
/// logs and degrades to a sentinel instead of failing, so the simulation is
/// never terminated by a single bad input. `BookError` covers the snapshot
/// encode/decode/validate surface where a caller must observe failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BookError {
    /// Error while serializing snapshot data.
    #[error("serialization error: {message}")]
    Serialization {
        /// Underlying error message.
        message: String,
    },

    /// Error while deserializing snapshot data.
    #[error("deserialization error: {message}")]
    Deserialization {
        /// Underlying error message.
        message: String,
    },

    /// Snapshot integrity check failed.
    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        /// Checksum stored in the package.
        expected: String,
        /// Checksum computed from the payload.
        actual: String,
    },

    /// Snapshot package carries an unsupported format version.
    #[error("unsupported snapshot version: {version} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the package.
        version: u32,
        /// Version this build understands.
        expected: u32,
    },
}
