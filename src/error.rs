//! Error types for list synchronization

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// Transport-level failure, no response from the data source.
    #[error("network error: {0}")]
    Network(String),

    /// The data source answered with a 4xx/5xx status.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Client-side validation failure (bad limit, unknown row, duplicate
    /// in-flight mutation, missing confirmation token).
    #[error("validation error: {0}")]
    Validation(String),

    /// The backend does not implement the requested operation; the feature
    /// degrades to read-only instead of failing on every attempt.
    #[error("not supported by backend: {0}")]
    NotSupported(String),
}

impl ListError {
    /// Whether this error should downgrade the mutating feature to
    /// read-only. A 404 from the mutation endpoint means the route does not
    /// exist, which is treated the same as an explicit `NotSupported`.
    pub fn is_not_supported(&self) -> bool {
        matches!(
            self,
            ListError::NotSupported(_) | ListError::Server { status: 404, .. }
        )
    }
}

pub type ListResult<T> = Result<T, ListError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_supported_detection() {
        assert!(ListError::NotSupported("activation".into()).is_not_supported());
        assert!(ListError::Server {
            status: 404,
            message: "no route".into()
        }
        .is_not_supported());
        assert!(!ListError::Server {
            status: 500,
            message: "boom".into()
        }
        .is_not_supported());
        assert!(!ListError::Network("timeout".into()).is_not_supported());
    }

    #[test]
    fn test_display_messages() {
        let err = ListError::Server {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "server error 503: unavailable");
        assert_eq!(
            ListError::Validation("limit 13 not allowed".into()).to_string(),
            "validation error: limit 13 not allowed"
        );
    }
}
