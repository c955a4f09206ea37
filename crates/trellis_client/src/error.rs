//! Error types for the TrellisDB client.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by client operations.
///
/// Every precondition violation is detected synchronously at the call site
/// and never creates a request. Server-reported failures are delivered
/// asynchronously through the request's error channel instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Store or transaction lifecycle violation.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the violation.
        message: String,
    },

    /// The transaction is not accepting new operations.
    #[error("transaction inactive: {message}")]
    TransactionInactive {
        /// Description of the violation.
        message: String,
    },

    /// A mutating operation was issued against a read-only transaction.
    #[error("read-only transaction: {message}")]
    ReadOnly {
        /// Description of the violation.
        message: String,
    },

    /// Invalid key, invalid range, or invalid key-path interaction.
    #[error("data error: {message}")]
    Data {
        /// Description of the violation.
        message: String,
    },

    /// Value serialization failure or disallowed blob reference.
    #[error("data clone error: {message}")]
    DataClone {
        /// Description of the failure.
        message: String,
    },

    /// A uniqueness constraint was violated.
    #[error("constraint error: {message}")]
    Constraint {
        /// Description of the violation.
        message: String,
    },

    /// Incompatible options were supplied.
    #[error("invalid access: {message}")]
    InvalidAccess {
        /// Description of the violation.
        message: String,
    },

    /// A malformed key path was supplied.
    #[error("syntax error: {message}")]
    Syntax {
        /// Description of the violation.
        message: String,
    },

    /// A named index or store does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },

    /// A required argument had the wrong shape.
    #[error("type error: {message}")]
    Type {
        /// Description of the violation.
        message: String,
    },

    /// No live execution context, or a server-side protocol failure.
    #[error("unknown error: {message}")]
    Unknown {
        /// Description of the failure.
        message: String,
    },
}

impl ClientError {
    /// Creates an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a transaction-inactive error.
    pub fn transaction_inactive(message: impl Into<String>) -> Self {
        Self::TransactionInactive {
            message: message.into(),
        }
    }

    /// Creates a read-only error.
    pub fn read_only(message: impl Into<String>) -> Self {
        Self::ReadOnly {
            message: message.into(),
        }
    }

    /// Creates a data error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Creates a data-clone error.
    pub fn data_clone(message: impl Into<String>) -> Self {
        Self::DataClone {
            message: message.into(),
        }
    }

    /// Creates a constraint error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Creates an invalid-access error.
    pub fn invalid_access(message: impl Into<String>) -> Self {
        Self::InvalidAccess {
            message: message.into(),
        }
    }

    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    /// Creates an unknown error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }
}
