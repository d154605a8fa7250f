use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Error interacting with an external API (bad status, undecodable body).
    ExternalApiError(String),
    /// The remote endpoint could not be reached (connect, timeout, request setup).
    ConnectionFailed(String),
    /// The submission endpoint answered with a non-success status.
    SubmissionRejected {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// User-facing message supplied by the server, if any.
        message: Option<String>,
    },
    /// Internal error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns the innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the failure happened before any response was received.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self.root(), AppError::ConnectionFailed(_))
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            AppError::SubmissionRejected { status, message } => match message {
                Some(m) => write!(f, "Submission rejected ({}): {}", status, m),
                None => write!(f, "Submission rejected ({})", status),
            },
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    ///
    /// Failures that never produced a response map to `ConnectionFailed`;
    /// everything else (status, decode, body) is an `ExternalApiError`.
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() || err.is_builder() {
            AppError::ConnectionFailed(err.to_string())
        } else {
            AppError::ExternalApiError(err.to_string())
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::BadRequest(format!("Invalid URL: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_display() {
        let err: Result<(), AppError> =
            Err(AppError::ConnectionFailed("refused".to_string())).context("CEP lookup");

        let err = err.unwrap_err();
        assert_eq!(err.to_string(), "CEP lookup: Connection failed: refused");
        assert!(err.is_connection_failure());
    }

    #[test]
    fn test_root_skips_nested_context() {
        let err: Result<(), AppError> = Err(AppError::ExternalApiError("502".to_string()))
            .context("inner")
            .with_context(|| "outer".to_string());

        let err = err.unwrap_err();
        assert_eq!(err.root(), &AppError::ExternalApiError("502".to_string()));
        assert!(!err.is_connection_failure());
    }

    #[test]
    fn test_rejected_display_without_message() {
        let err = AppError::SubmissionRejected {
            status: 500,
            message: None,
        };
        assert_eq!(err.to_string(), "Submission rejected (500)");
    }
}
