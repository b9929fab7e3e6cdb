//! Error types shared by every U-Cutlist crate.

use thiserror::Error;

/// Errors reported by the optimization and code generation engines.
///
/// Partial layouts are not errors: parts that cannot be placed are listed in
/// [`OptimizationResult::unplaced`](crate::result::OptimizationResult::unplaced),
/// and a cancelled search returns its best layout with the `cancelled` flag set.
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected input: non-positive dimension or quantity, empty part or stock list.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A machine profile template is empty or malformed.
    #[error("profile mismatch: {0}")]
    ProfileMismatch(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O failure while writing generated output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Shorthand for an [`Error::ProfileMismatch`].
    pub fn profile(msg: impl Into<String>) -> Self {
        Self::ProfileMismatch(msg.into())
    }

    /// Returns true for input validation failures.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid("part P1 has width 0");
        assert_eq!(err.to_string(), "invalid input: part P1 has width 0");
        assert!(err.is_invalid_input());

        let err = Error::profile("feed move template is empty");
        assert!(err.to_string().starts_with("profile mismatch"));
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
