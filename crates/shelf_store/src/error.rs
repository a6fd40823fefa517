// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for stock store operations.

/// An error from a stock store operation.
///
/// This is an opaque error type that can wrap any underlying error from a
/// store implementation. Use [`std::error::Error::source()`] to access the
/// underlying cause if needed.
///
/// # Example
///
/// ```
/// use shelf_store::Error;
///
/// let error = Error::from_message("warehouse unreachable");
/// assert!(error.to_string().contains("unreachable"));
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error carrying only a message.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new error from any underlying error, preserving it as the source.
    pub fn from_source(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        let source = source.into();
        Self {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// A specialized [`Result`] type for stock store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_message() {
        let error = Error::from_message("store timed out");
        assert!(error.to_string().contains("store timed out"));
    }

    #[test]
    fn from_source_preserves_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = Error::from_source(io);
        assert!(std::error::Error::source(&error).is_some());
        assert!(error.to_string().contains("refused"));
    }

    #[test]
    fn result_alias_propagates_errors() {
        fn returns_err() -> Result<i64> {
            Err(Error::from_message("expected failure"))
        }

        let err = returns_err().expect_err("should return an error");
        assert!(err.to_string().contains("expected failure"));
    }
}
