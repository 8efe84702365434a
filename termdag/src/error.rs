use crate::term::{Op, Sort};

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure category, for callers that branch on the kind of failure
/// rather than on the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or disallowed request. Never worth retrying.
    Usage,
    /// The engine (or this crate) does not provide the capability.
    Unsupported,
    /// An invariant of the session broke. The session should not be reused.
    Internal,
    /// A portfolio race finished without any SAT/UNSAT answer.
    Undecided,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Sort {0} was expected, but {1} was found.")]
    UnexpectedSort(String, Sort),

    #[error("Sort {0} and {1} should be identical.")]
    SortIntegrity(Sort, Sort),

    #[error("{0} expects {1} argument(s), but got {2}.")]
    Arity(Op, String, usize),

    #[error("{0} '{1}' was already added.")]
    Duplicate(&'static str, String),

    #[error("Incorrect usage: {0}")]
    Usage(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Internal invariant violated: {0}")]
    Internal(String),

    #[error("Engine {0} failed: {1}")]
    Engine(String, String),

    #[error("No engine produced a definitive answer.")]
    Undecided,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnexpectedSort(..)
            | Error::SortIntegrity(..)
            | Error::Arity(..)
            | Error::Duplicate(..)
            | Error::Usage(_) => ErrorKind::Usage,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Internal(_) | Error::Engine(..) => ErrorKind::Internal,
            Error::Undecided => ErrorKind::Undecided,
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}
