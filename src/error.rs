// Error types shared by the library. Ordinary non-2xx responses are not
// errors: they come back as `Outcome::Failure` (see `api`). Only problems
// that stop a single operation from producing any answer live here.

use std::path::PathBuf;

/// Errors raised by the LangConnect client and the local file helpers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A required setting is missing or malformed. Raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Credentials are absent, or sign-in / refresh was rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network-level failure (connect, timeout, broken body).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A 2xx body did not have the shape the typed operation expected.
    #[error("unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered a call the operation cannot continue without
    /// with a non-2xx status.
    #[error("request failed: {0}")]
    RequestFailed(String),
}

impl ClientError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that would fail every remaining request the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Authentication(_))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_config_and_auth_only() {
        assert!(ClientError::Configuration("x".into()).is_fatal());
        assert!(ClientError::Authentication("x".into()).is_fatal());
        assert!(!ClientError::InvalidArgument("x".into()).is_fatal());
        assert!(!ClientError::RequestFailed("x".into()).is_fatal());
        let io = ClientError::io(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(!io.is_fatal());
        assert!(io.to_string().contains("missing.txt"));
    }
}
