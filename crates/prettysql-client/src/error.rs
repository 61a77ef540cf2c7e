//! Error types for the client library.

use std::fmt;
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed named-parameter syntax.
    #[error("{message} at position {position} in statement: {query}")]
    Parse {
        /// What went wrong.
        message: String,
        /// Character position of the offending parameter.
        position: usize,
        /// The statement as written by the caller.
        query: String,
    },

    /// The underlying driver failed.
    #[error("{operation} failed: {message}")]
    Driver {
        /// Driver operation that failed (`prepare`, `commit`, ...).
        operation: &'static str,
        /// Driver-provided message.
        message: String,
    },

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The query handle was closed or evicted.
    #[error("query closed")]
    QueryClosed,

    /// Named parameter not declared by the statement.
    #[error("named parameter '{0}' not found")]
    UnknownParameter(String),

    /// Named binding on a query created without named-parameter processing.
    #[error("query has no named parameters")]
    NoNamedParameters,

    /// Positional parameter index outside the statement's placeholders.
    #[error("parameter index {index} out of bounds (statement has {count})")]
    ParameterIndexOutOfBounds {
        /// Requested 1-based index.
        index: usize,
        /// Number of placeholders.
        count: usize,
    },

    /// Typed result retrieval without a result mapper.
    #[error("result mapper for type '{0}' not found")]
    MissingResultMapper(&'static str),

    /// Operation not permitted in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Typed read of a cell holding a different type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Requested type.
        expected: &'static str,
        /// Stored type.
        found: &'static str,
    },

    /// Stored value cannot be represented by the requested type.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Column index outside the result's columns.
    #[error("column index {index} out of bounds (result has {count} columns)")]
    ColumnIndexOutOfBounds {
        /// Requested 1-based index.
        index: usize,
        /// Number of columns.
        count: usize,
    },

    /// Cell access while the cursor is before the first or after the last row.
    #[error("no current row (cursor at {0})")]
    NoCurrentRow(isize),

    /// Isolation level code or name outside the supported set.
    #[error("unknown transaction isolation level: {0}")]
    UnknownIsolationLevel(String),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Broad error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Named-parameter syntax errors.
    Parse,
    /// Failures of the underlying connection or statement.
    Resource,
    /// Precondition violations by the caller.
    Contract,
}

impl ClientError {
    /// Creates a driver error.
    pub fn driver(operation: &'static str, err: impl fmt::Display) -> Self {
        ClientError::Driver {
            operation,
            message: err.to_string(),
        }
    }

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Parse { .. } => ErrorKind::Parse,
            ClientError::Driver { .. } | ClientError::ConnectionClosed | ClientError::QueryClosed => {
                ErrorKind::Resource
            }
            _ => ErrorKind::Contract,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::Resource => write!(f, "resource"),
            ErrorKind::Contract => write!(f, "contract"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let parse = ClientError::Parse {
            message: "Non-terminated named parameter declaration".into(),
            position: 3,
            query: "x :{a".into(),
        };
        assert_eq!(parse.kind(), ErrorKind::Parse);
        assert_eq!(ClientError::driver("commit", "disk I/O").kind(), ErrorKind::Resource);
        assert_eq!(ClientError::QueryClosed.kind(), ErrorKind::Resource);
        assert_eq!(ClientError::UnknownParameter("id".into()).kind(), ErrorKind::Contract);
        assert_eq!(ClientError::InvalidState("active".into()).kind(), ErrorKind::Contract);
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::Parse {
            message: "Non-terminated named parameter declaration".into(),
            position: 26,
            query: "SELECT * FROM films WHERE :{year".into(),
        };
        assert_eq!(
            err.to_string(),
            "Non-terminated named parameter declaration at position 26 in statement: SELECT * FROM films WHERE :{year"
        );
        assert_eq!(
            ClientError::driver("prepare", "syntax error").to_string(),
            "prepare failed: syntax error"
        );
        assert_eq!(ErrorKind::Contract.to_string(), "contract");
    }
}
