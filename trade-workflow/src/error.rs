//! Error types for the trade workflow

use thiserror::Error;

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Workflow errors
///
/// Rejections carry the exact message returned to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger collaborator failure, surfaced verbatim
    #[error(transparent)]
    Ledger(#[from] ledger_core::Error),

    /// Caller does not hold a role permitted for the operation
    #[error("{0}")]
    Unauthorized(String),

    /// Wrong argument count or unparsable argument
    #[error("{0}")]
    InvalidArguments(String),

    /// Unknown function name
    #[error("Invalid invoke function name")]
    UnknownFunction(String),

    /// A document the operation depends on is absent
    #[error("{0}")]
    NotFound(String),

    /// Document exists but is in the wrong lifecycle state
    #[error("{0}")]
    PreconditionFailed(String),

    /// Identity collaborator could not extract the caller identity
    #[error("Identity error: {0}")]
    Identity(String),

    /// Stored value that cannot be interpreted
    #[error("Invalid ledger state: {0}")]
    InvalidState(String),

    /// Document (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error classes reported to callers and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller's role does not match
    Authorization,
    /// Wrong count or unparsable argument
    Argument,
    /// Dependent document absent
    NotFound,
    /// Wrong lifecycle state
    PreconditionFailed,
    /// Ledger or identity failure
    Collaborator,
    /// Corrupt state, configuration, or local fault
    Internal,
}

impl ErrorKind {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authorization => "authorization",
            ErrorKind::Argument => "argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Internal => "internal",
        }
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthorized(_) => ErrorKind::Authorization,
            Error::InvalidArguments(_) | Error::UnknownFunction(_) => ErrorKind::Argument,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Error::Ledger(_) | Error::Identity(_) => ErrorKind::Collaborator,
            Error::InvalidState(_)
            | Error::Serialization(_)
            | Error::Config(_)
            | Error::Metrics(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages_are_verbatim() {
        let err = Error::PreconditionFailed("L/C not issued yet".into());
        assert_eq!(err.to_string(), "L/C not issued yet");
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);

        let err = Error::UnknownFunction("shipGoods".into());
        assert_eq!(err.to_string(), "Invalid invoke function name");
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_ledger_errors_are_collaborator_failures() {
        let err: Error = ledger_core::Error::InvalidArgument("empty".into()).into();
        assert_eq!(err.kind(), ErrorKind::Collaborator);
        assert_eq!(err.to_string(), "Invalid argument: empty");
    }
}
