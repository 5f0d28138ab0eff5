//! Error types for the DIS Ledger Core.

use thiserror::Error;

/// Core errors that can occur while encoding, decoding or signing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid key material: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("malformed receipt: {0}")]
    MalformedReceipt(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Why a receipt failed verification.
///
/// Callers branch on the variant: [`VerifyError::InsufficientData`] marks a
/// legacy receipt that cannot be checked, everything else is either a
/// structural defect or tampering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("insufficient data: no embedded signer key")]
    InsufficientData,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("hash mismatch")]
    HashMismatch { expected: String, actual: String },
}

impl From<CoreError> for VerifyError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidPublicKey | CoreError::InvalidKeyLength { .. } => {
                VerifyError::InvalidPublicKey
            }
            _ => VerifyError::SignatureMismatch,
        }
    }
}
