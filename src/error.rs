use std::error::Error;
use std::fmt;

/// Error type for the ping diagnostic.
///
/// Everything here is a synchronous return value; nothing in the library
/// panics on bad input. Host-resolution failure is deliberately not an
/// error: the prober degrades to a placeholder address and records a
/// warning in the result instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingError {
    /// A parameter was present but unusable (empty host, non-positive count, wrong type).
    InvalidArgument(String),
    /// A required parameter was absent from the request object.
    MissingField(String),
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            PingError::MissingField(field) => write!(f, "missing required field: {}", field),
        }
    }
}

impl Error for PingError {}
