use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContextError>;
pub type DecryptResult<T> = std::result::Result<T, DecryptError>;

/// Failures surfaced by the context accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("{accessor} called without an active secret context")]
    NoActiveContext { accessor: &'static str },
    #[error("missing required value `{name}`")]
    MissingRequiredValue { name: String },
}

/// Failures raised by the decryption primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}
