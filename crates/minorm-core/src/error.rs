//! Error types for the minorm workspace.
//!
//! One error type spans the whole pipeline so callers match on a single enum.
//! The taxonomy separates caller-correctable contract violations (bad
//! arguments, closed sessions, unset identifiers) from mapping faults (raised
//! once when a type's metadata is resolved) and execution failures (anything
//! the underlying connection reports while a command runs).

use std::fmt;

use crate::types::SqlType;

/// Convenient result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all minorm operations.
#[derive(Debug)]
pub enum Error {
    /// An argument violated its contract. Identifies the parameter by name.
    InvalidArgument {
        /// The name of the offending parameter.
        parameter: &'static str,
        /// Why the argument was rejected.
        message: String,
    },
    /// An operation was invoked on a session that has been closed.
    SessionClosed,
    /// A type's mapping metadata is invalid and the type cannot be used.
    Mapping(String),
    /// The instance has no identifier value set, so the named operation
    /// cannot locate its row.
    IdentifierNotSet {
        /// The operation that required an identifier ("updated", "deleted").
        operation: &'static str,
    },
    /// The instance already has an identifier value, so it cannot be inserted
    /// under a database-generated strategy.
    IdentifierAlreadySet,
    /// An `ObjectDelta` carried no changes.
    NoChangesInDelta,
    /// `PagingOptions::None` was passed to a paged query.
    PagingOptionsNone,
    /// A query expected to return a single record returned more than one.
    SingleRecordExpected,
    /// A scalar query returned a row with more than one column.
    ScalarColumnMismatch,
    /// An include handle was read before the pending queries were executed.
    IncludeNotExecuted,
    /// No column is mapped as the identifier for the table.
    NoIdentifierColumn {
        /// The schema-qualified table name.
        table: String,
    },
    /// The number of distinct parameter placeholders in the command text does
    /// not match the number of supplied arguments.
    ArgumentsCountMismatch {
        /// Distinct placeholders found in the command text.
        expected: usize,
        /// Arguments supplied with the query.
        actual: usize,
    },
    /// A value could not be converted to the requested storage type.
    TypeConversion {
        /// Debug rendering of the source value.
        from: String,
        /// The storage type the value was being converted to.
        to: SqlType,
    },
    /// A failure reported by the underlying connection while executing a
    /// command. Never wraps another [`Error`]; see [`Error::execution`].
    Execution {
        /// The failure message.
        message: String,
        /// The underlying cause, when one was supplied.
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl Error {
    /// Create an [`Error::InvalidArgument`] for the named parameter.
    pub fn invalid_argument(parameter: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            parameter,
            message: message.into(),
        }
    }

    /// Create an [`Error::Mapping`] with the given message.
    pub fn mapping(message: impl Into<String>) -> Self {
        Error::Mapping(message.into())
    }

    /// Wrap a failure from the underlying connection.
    ///
    /// If the boxed error is already an [`Error`], it is returned unchanged
    /// rather than wrapped a second time. Cancellation never reaches this
    /// constructor; it travels as `Outcome::Cancelled`.
    #[must_use]
    pub fn execution(source: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        match source.downcast::<Error>() {
            Ok(already_domain) => *already_domain,
            Err(other) => Error::Execution {
                message: other.to_string(),
                source: Some(other),
            },
        }
    }

    /// Create an [`Error::Execution`] from a bare message.
    pub fn execution_message(message: impl Into<String>) -> Self {
        Error::Execution {
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument { parameter, message } => {
                write!(f, "invalid argument '{parameter}': {message}")
            }
            Error::SessionClosed => {
                write!(f, "the session has been closed and can no longer be used")
            }
            Error::Mapping(message) => write!(f, "{message}"),
            Error::IdentifierNotSet { operation } => write!(
                f,
                "the instance does not have an identifier value set so it cannot be {operation}"
            ),
            Error::IdentifierAlreadySet => write!(
                f,
                "the instance already has an identifier value so it cannot be inserted"
            ),
            Error::NoChangesInDelta => write!(
                f,
                "an ObjectDelta must contain at least one change; call add_change with the \
                 column name and new value for each column to update"
            ),
            Error::PagingOptionsNone => write!(
                f,
                "the paging options must contain a count and offset; use PagingOptions::for_page \
                 or PagingOptions::skip_take to specify the values"
            ),
            Error::SingleRecordExpected => write!(
                f,
                "multiple records have been returned by the query; the query should return a \
                 single row only"
            ),
            Error::ScalarColumnMismatch => write!(
                f,
                "the scalar query should return a single row with a single column"
            ),
            Error::IncludeNotExecuted => write!(
                f,
                "the include has no value yet; execute the session's pending queries before \
                 reading it"
            ),
            Error::NoIdentifierColumn { table } => write!(
                f,
                "no column has been mapped as the identifier for the table '{table}', so it \
                 cannot be used for select by identifier, insert, update or delete calls"
            ),
            Error::ArgumentsCountMismatch { expected, actual } => write!(
                f,
                "the number of parameters in the SQL statement and the number of supplied \
                 argument values should match, however {expected} parameters are used in the \
                 SQL statement and {actual} argument values were supplied"
            ),
            Error::TypeConversion { from, to } => {
                write!(f, "the value {from} cannot be converted to {}", to.sql_name())
            }
            Error::Execution { message, .. } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Execution {
                source: Some(cause),
                ..
            } => Some(cause.as_ref()),
            _ => None,
        }
    }
}
