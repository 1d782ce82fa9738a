//! Common error types and handling for Volha

use crate::db::RepositoryError;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level classification of a failure.
///
/// Transports map these to their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    UnknownType,
    InvalidType,
    AlreadyExists,
    ForeignKeyViolation,
    FailedPrecondition,
    Internal,
}

impl ErrorKind {
    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::UnknownType => "UNKNOWN_TYPE",
            ErrorKind::InvalidType => "INVALID_TYPE",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::ForeignKeyViolation => "FOREIGN_KEY_VIOLATION",
            ErrorKind::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Common error type for the Volha catalog
///
/// Every variant carries the name of the operation it escaped from,
/// e.g. `catalog.products.create`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{op}: {source}")]
    Repository {
        op: &'static str,
        #[source]
        source: RepositoryError,
    },

    #[error("{op}: failed precondition: {reason}")]
    FailedPrecondition { op: &'static str, reason: String },

    #[error("{op}: {source}; rollback failed: {rollback}")]
    RollbackFailed {
        op: &'static str,
        #[source]
        source: Box<Error>,
        rollback: sqlx::Error,
    },
}

impl Error {
    pub fn failed_precondition(op: &'static str, reason: impl Into<String>) -> Self {
        Error::FailedPrecondition {
            op,
            reason: reason.into(),
        }
    }

    /// Classification of this error
    ///
    /// A failed rollback keeps the classification of the error that caused it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Repository { source, .. } => source.kind(),
            Error::FailedPrecondition { .. } => ErrorKind::FailedPrecondition,
            Error::RollbackFailed { source, .. } => source.kind(),
        }
    }

    /// Name of the operation the error escaped from
    pub fn op(&self) -> &'static str {
        match self {
            Error::Repository { op, .. }
            | Error::FailedPrecondition { op, .. }
            | Error::RollbackFailed { op, .. } => op,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        self.kind().error_code()
    }

    /// The storage-level error, if this came out of a repository
    pub fn repository_error(&self) -> Option<&RepositoryError> {
        match self {
            Error::Repository { source, .. } => Some(source),
            Error::FailedPrecondition { .. } => None,
            Error::RollbackFailed { source, .. } => source.repository_error(),
        }
    }
}

impl RepositoryError {
    /// Tag this error with the operation it escaped from
    pub fn at(self, op: &'static str) -> Error {
        Error::Repository { op, source: self }
    }
}

/// Attach an operation name to a storage-level result.
pub trait OpContext<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T, E> OpContext<T> for std::result::Result<T, E>
where
    E: Into<RepositoryError>,
{
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|err| err.into().at(op))
    }
}
