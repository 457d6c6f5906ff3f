use thiserror::Error;

/// Main error type for the sheet parser.
/// Aggregates errors from the grid, transform and pattern modules.
#[derive(Error, Debug)]
pub enum SheetParserError {
    /// The input does not conform to the pattern at this position.
    /// Always recoverable by the nearest enclosing rollback scope.
    #[error("{message}")]
    DoesNotMatch {
        message: String,
        #[source]
        cause: Option<Box<SheetParserError>>,
    },

    /// Inconsistent pattern or pipeline parameters. Never swallowed by backtracking.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Closure failure of a table configured with `FailurePolicy::Fail`.
    #[error("Table '{name}' failed: {source}")]
    TableFailed {
        name: String,
        source: Box<SheetParserError>,
    },

    // Module errors
    #[error("{0}")]
    RangeError(#[from] crate::spreadsheet::RangeError),

    #[error("{0}")]
    TransformError(#[from] crate::transform::TransformError),

    // Third-party library errors
    #[error("{0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    RegexError(#[from] regex::Error),

    #[error("{0}")]
    AnyhowError(#[from] anyhow::Error),
}

impl SheetParserError {
    /// Creates a match failure without a nested cause.
    pub fn no_match(message: impl Into<String>) -> Self {
        Self::DoesNotMatch {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a match failure wrapping the failure that triggered it.
    pub fn no_match_caused_by(message: impl Into<String>, cause: SheetParserError) -> Self {
        Self::DoesNotMatch {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError(message.into())
    }

    /// Returns true if a rollback scope may recover from this error.
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::DoesNotMatch { .. })
    }

    /// Returns true for errors raised by a badly built pattern tree.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError(_)
                | Self::RegexError(_)
                | Self::TransformError(crate::transform::TransformError::HeaderIndex { .. })
        )
    }

    /// Collects this error's message followed by the messages of every nested cause.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(error) = source {
            messages.push(error.to_string());
            source = std::error::Error::source(error);
        }
        messages
    }
}

pub trait ResultMessage {
    /// Wraps a recoverable failure into a new match failure carrying `message`.
    /// Fatal errors pass through untouched.
    fn no_match_context<F>(self, message: F) -> Self
    where
        F: FnOnce() -> String;
}

impl<T> ResultMessage for Result<T, SheetParserError> {
    fn no_match_context<F>(self, message: F) -> Self
    where
        F: FnOnce() -> String,
    {
        match self {
            Err(error) if error.is_no_match() => {
                Err(SheetParserError::no_match_caused_by(message(), error))
            }
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_match_is_recoverable() {
        assert!(SheetParserError::no_match("x").is_no_match());
        assert!(!SheetParserError::configuration("x").is_no_match());
        assert!(SheetParserError::configuration("x").is_configuration());
    }

    #[test]
    fn context_chains_recoverable_failures() {
        let result: Result<(), SheetParserError> = Err(SheetParserError::no_match("inner"));
        let error = result
            .no_match_context(|| "middle".to_string())
            .no_match_context(|| "outer".to_string())
            .unwrap_err();
        assert_eq!(error.messages(), vec!["outer", "middle", "inner"]);
    }

    #[test]
    fn context_leaves_fatal_errors_alone() {
        let result: Result<(), SheetParserError> = Err(SheetParserError::configuration("bad"));
        let error = result.no_match_context(|| "outer".to_string()).unwrap_err();
        assert!(error.is_configuration());
        assert_eq!(error.messages(), vec!["Configuration error: bad"]);
    }
}
