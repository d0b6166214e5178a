//! Error types for squeeze

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for squeeze
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid HTTP request
    #[error("Invalid HTTP request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Compression backend failure that cannot be recovered from
    #[error("Compression error in '{backend}': {message}")]
    Compression {
        /// Backend tier name
        backend: String,
        /// Error message
        message: String,
    },

    /// Error while reading or producing a body stream
    #[error("Body error: {0}")]
    Body(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a compression error
    pub fn compression(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Compression {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            Error::InvalidRequest("bad header".to_string()).to_status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Config("threshold".to_string()).to_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::compression("library", "stream closed").to_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_compression_error() {
        let err = Error::compression("accelerated", "encoder poisoned");
        assert!(matches!(err, Error::Compression { .. }));
        assert!(err.to_string().contains("accelerated"));
        assert!(err.to_string().contains("encoder poisoned"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: Error = std::io::Error::other("broken pipe").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
