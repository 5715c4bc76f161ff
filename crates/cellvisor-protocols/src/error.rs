//! Errors reported by platform services.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service clone failed: {0}")]
    CloneFailed(String),

    #[error("{0}")]
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_failed_error() {
        let err = ServiceError::CloneFailed("out of handles".to_string());
        let display = err.to_string();
        assert!(display.contains("clone failed"));
        assert!(display.contains("out of handles"));
    }

    #[test]
    fn test_custom_error() {
        let err = ServiceError::Custom("boom".to_string());
        assert_eq!(err.to_string(), "boom");
    }
}
