//! Error types for the TrellisDB codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding values.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value graph contains something that cannot be cloned into a
    /// stored record (for example a host-object handle).
    #[error("value is not cloneable: {message}")]
    NotCloneable {
        /// Description of the offending value.
        message: String,
    },

    /// Encoding to bytes failed.
    #[error("encode error: {message}")]
    Encode {
        /// Description of the failure.
        message: String,
    },

    /// Decoding from bytes failed.
    #[error("decode error: {message}")]
    Decode {
        /// Description of the failure.
        message: String,
    },
}

impl CodecError {
    /// Creates a not-cloneable error.
    pub fn not_cloneable(message: impl Into<String>) -> Self {
        Self::NotCloneable {
            message: message.into(),
        }
    }

    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}
