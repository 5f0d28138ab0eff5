//! Receipt verification.
//!
//! Two trust anchors exist:
//! - [`verify_embedded`] trusts the signer key carried in the receipt itself.
//!   It proves internal consistency only and is what the self-audit uses.
//! - [`verify_with_key`] ignores the embedded key and checks against a key the
//!   caller obtained elsewhere (local peer configuration).
//!
//! Check order: required fields, then signature, then hash recomputation.

use crate::crypto::{PublicKey, Signature};
use crate::error::VerifyError;
use crate::receipt::Receipt;

/// Ensure the fields every verification needs are present.
///
/// A receipt with neither signature nor embedded key is an unsigned legacy
/// record and reports [`VerifyError::InsufficientData`] instead of a
/// missing signature.
pub fn check_required(receipt: &Receipt) -> Result<(), VerifyError> {
    if receipt.actor.trim().is_empty() {
        return Err(VerifyError::MissingField("by"));
    }
    if receipt.hash.trim().is_empty() {
        return Err(VerifyError::MissingField("hash"));
    }
    if receipt.signature.trim().is_empty() {
        return Err(match receipt.embedded_key() {
            None => VerifyError::InsufficientData,
            Some(_) => VerifyError::MissingField("signature"),
        });
    }
    Ok(())
}

/// Verify a receipt against the public key embedded in its metadata.
pub fn verify_embedded(receipt: &Receipt) -> Result<(), VerifyError> {
    check_required(receipt)?;
    let encoded = receipt.embedded_key().ok_or(VerifyError::InsufficientData)?;
    let key = PublicKey::from_base64(encoded).map_err(|_| VerifyError::InvalidPublicKey)?;
    check_signature_and_hash(receipt, &key)
}

/// Verify a receipt against a caller-supplied public key.
///
/// The embedded key, if any, plays no part.
pub fn verify_with_key(receipt: &Receipt, key: &PublicKey) -> Result<(), VerifyError> {
    check_required(receipt).map_err(|e| match e {
        // Without a signature there is nothing to check the trusted key against.
        VerifyError::InsufficientData => VerifyError::MissingField("signature"),
        other => other,
    })?;
    check_signature_and_hash(receipt, key)
}

fn check_signature_and_hash(receipt: &Receipt, key: &PublicKey) -> Result<(), VerifyError> {
    let signature =
        Signature::from_base64(&receipt.signature).map_err(|_| VerifyError::SignatureMismatch)?;
    key.verify(receipt.hash.as_bytes(), &signature)
        .map_err(VerifyError::from)?;

    let actual = receipt.compute_hash();
    if actual != receipt.hash {
        return Err(VerifyError::HashMismatch {
            expected: receipt.hash.clone(),
            actual,
        });
    }
    Ok(())
}
