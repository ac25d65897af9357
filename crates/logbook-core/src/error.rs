use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Master key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Unsupported key spec: {0}")]
    UnsupportedKeySpec(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("AEAD encryption failed")]
    AeadEncrypt,

    #[error("AEAD decryption failed (authentication tag mismatch, possible tampering)")]
    AeadDecrypt,

    #[error("Malformed ciphertext header: {0}")]
    MalformedHeader(String),

    #[error("Ciphertext truncated")]
    Truncated,

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

#[derive(Debug, Error)]
pub enum LogbookError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

/// Coarse classification used when reporting a failure upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Storage,
    Crypto,
}

impl LogbookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LogbookError::Validation(_) => ErrorKind::Validation,
            LogbookError::Storage(_) | LogbookError::Serialisation(_) => ErrorKind::Storage,
            LogbookError::Crypto(_) => ErrorKind::Crypto,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LogbookError::Storage(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, LogbookError>;
