//! Error types for credential operations.

use thiserror::Error;

/// Credential hashing errors.
///
/// Signature and link verification never return these; they answer `false`.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Stored password hash is not valid PHC text.
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for credential operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

impl From<CryptoError> for notekeeper_core::Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidInput(msg) => notekeeper_core::Error::InvalidInput(msg),
            other => notekeeper_core::Error::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CryptoError::InvalidHash("not phc".to_string());
        assert_eq!(err.to_string(), "Invalid password hash: not phc");
    }

    #[test]
    fn test_into_core_error() {
        let core: notekeeper_core::Error = CryptoError::InvalidInput("x".into()).into();
        assert!(matches!(core, notekeeper_core::Error::InvalidInput(_)));

        let core: notekeeper_core::Error = CryptoError::Hashing("boom".into()).into();
        assert!(matches!(core, notekeeper_core::Error::Internal(_)));
    }
}
