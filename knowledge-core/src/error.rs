/// Result type alias for knowledge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the knowledge and context core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Database error during {operation}: {context}")]
    Database { operation: String, context: String },

    #[error("Validation failed for field '{field}' (value: {value})")]
    Validation { field: String, value: String },

    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("Circular reference at depth {depth}: {url}")]
    CircularReference { url: String, depth: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Rate limited by AI provider")]
    RateLimit,

    #[error("Operation timed out")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a database error with the failed operation and its context
    pub fn database(operation: impl Into<String>, context: impl std::fmt::Display) -> Self {
        Error::Database {
            operation: operation.into(),
            context: context.to_string(),
        }
    }

    /// Build a validation error carrying the offending field and value
    pub fn validation(field: impl Into<String>, value: impl std::fmt::Display) -> Self {
        Error::Validation {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Check if this error is recoverable (can retry with backoff)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Connection(_) => true,
            Error::Session(_) => true,
            Error::Database { .. } => true,
            Error::Validation { .. } => false,
            Error::ReferenceNotFound(_) => false,
            Error::CircularReference { .. } => false,
            Error::InvalidArgument(_) => false,
            Error::RateLimit => true,
            Error::Timeout => true,
            Error::Serialization(_) => false,
            Error::Io(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_carries_field_and_value() {
        let err = Error::validation("hit_die", 0);
        assert_eq!(
            err.to_string(),
            "Validation failed for field 'hit_die' (value: 0)"
        );
        assert!(!err.is_recoverable());
    }

    #[test]
    fn transient_errors_are_recoverable() {
        assert!(Error::RateLimit.is_recoverable());
        assert!(Error::Timeout.is_recoverable());
        assert!(Error::Connection("refused".into()).is_recoverable());
        assert!(!Error::InvalidArgument("bad table".into()).is_recoverable());
    }
}
