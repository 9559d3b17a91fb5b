//! Error types for the host ABI

/// Result type for ABI calls
pub type AbiResult<T> = Result<T, HostError>;

/// Errors raised into the host engine.
///
/// These are *raised* errors (the engine unwinds the script call). Recoverable
/// failures are returned as values instead, see [`crate::CallResult::fail`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// Invalid argument at a 1-based position
    #[error("bad argument #{position} ({message})")]
    Argument {
        /// 1-based argument position
        position: usize,
        /// What was wrong with it
        message: String,
    },

    /// The host compiler rejected a chunk
    #[error("{0}")]
    Syntax(String),

    /// Any other runtime error
    #[error("{0}")]
    Runtime(String),
}

impl HostError {
    /// Build an argument error
    pub fn argument(position: usize, message: impl Into<String>) -> Self {
        HostError::Argument {
            position,
            message: message.into(),
        }
    }

    /// Build a type mismatch argument error ("string expected, got nil")
    pub fn type_mismatch(position: usize, expected: &str, got: &str) -> Self {
        HostError::argument(position, format!("{} expected, got {}", expected, got))
    }
}

impl From<String> for HostError {
    fn from(s: String) -> Self {
        HostError::Runtime(s)
    }
}

impl From<&str> for HostError {
    fn from(s: &str) -> Self {
        HostError::Runtime(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_display() {
        let err = HostError::argument(2, "invalid format char 'x'");
        assert_eq!(err.to_string(), "bad argument #2 (invalid format char 'x')");
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = HostError::type_mismatch(1, "string", "nil");
        assert_eq!(err.to_string(), "bad argument #1 (string expected, got nil)");
    }
}
