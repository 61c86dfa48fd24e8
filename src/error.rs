//! The crate-wide error type, unifying decode-time, validation-time, and
//! call-time failures behind one `Result` a caller can match on uniformly.

use std::fmt;

use wasmi_mvp_core::DecodeError;
use wasmi_mvp_validation::ValidationError;

/// A call-time failure detected before any fatal, unrecoverable stack
/// operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuntimeError {
    /// No function is allocated at this address.
    NoSuchFunction { funcaddr: u32 },
    /// The number of arguments given doesn't match the function's
    /// parameter count.
    ArityMismatch { expected: usize, found: usize },
    /// An argument's value type doesn't match the function's declared
    /// parameter type at that position.
    ArgumentTypeMismatch { index: usize },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::NoSuchFunction { funcaddr } => {
                write!(f, "no function at address {funcaddr}")
            }
            RuntimeError::ArityMismatch { expected, found } => write!(
                f,
                "expected {expected} argument(s), found {found}"
            ),
            RuntimeError::ArgumentTypeMismatch { index } => {
                write!(f, "argument {index} has the wrong value type")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

/// The crate's top-level error type: a module failed to decode, failed
/// structural validation, or a call into it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    Malformed(DecodeError),
    Invalid(ValidationError),
    Runtime(RuntimeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Malformed(e) => write!(f, "malformed module: {e}"),
            Error::Invalid(e) => write!(f, "invalid module: {e}"),
            Error::Runtime(e) => write!(f, "runtime error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Malformed(e) => Some(e),
            Error::Invalid(e) => Some(e),
            Error::Runtime(e) => Some(e),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Malformed(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Invalid(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Self {
        Error::Runtime(e)
    }
}
