//! Cryptographic primitives: Ed25519 signing with base64 wire encodings.
//!
//! Keys and signatures travel inside receipt JSON as standard-alphabet
//! base64 strings, so every wrapper here has a `to_base64` / `from_base64`
//! pair next to the raw byte accessors.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use std::fmt;

use crate::error::{CoreError, Result};

/// Length of a raw Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of the stored private key (seed followed by public key).
pub const KEYPAIR_LEN: usize = 64;

/// Length of a raw Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    let bytes = STANDARD
        .decode(s.trim())
        .map_err(|e| CoreError::DecodingError(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CoreError::InvalidKeyLength {
            expected: N,
            actual: bytes.len(),
        })
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parse from standard base64.
    pub fn from_base64(s: &str) -> Result<Self> {
        decode_fixed::<PUBLIC_KEY_LEN>(s).map(Self)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &hex::encode(self.0)[..16])
    }
}

impl From<[u8; PUBLIC_KEY_LEN]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parse from standard base64.
    pub fn from_base64(s: &str) -> Result<Self> {
        decode_fixed::<SIGNATURE_LEN>(s).map(Self)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &hex::encode(self.0)[..16])
    }
}

/// A keypair for signing receipts.
///
/// This wraps ed25519-dalek's SigningKey. The persisted form is the 64-byte
/// keypair encoding (32-byte seed then 32-byte public key).
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Restore from the 64-byte keypair encoding.
    ///
    /// Fails if the length is wrong or the public half does not match the seed.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEYPAIR_LEN] =
            bytes
                .try_into()
                .map_err(|_| CoreError::InvalidKeyLength {
                    expected: KEYPAIR_LEN,
                    actual: bytes.len(),
                })?;
        let signing_key =
            SigningKey::from_keypair_bytes(&arr).map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(Self { signing_key })
    }

    /// The 64-byte keypair encoding (secret key material).
    pub fn to_keypair_bytes(&self) -> [u8; KEYPAIR_LEN] {
        self.signing_key.to_keypair_bytes()
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"0f1e2d3c";
        let signature = keypair.sign(message);

        keypair
            .public_key()
            .verify(message, &signature)
            .expect("valid signature should verify");

        assert!(keypair.public_key().verify(b"0f1e2d3d", &signature).is_err());
    }

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let kp1 = Keypair::from_seed(&[0x42u8; 32]);
        let kp2 = Keypair::from_seed(&[0x42u8; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_keypair_bytes_roundtrip() {
        let keypair = Keypair::generate();
        let bytes = keypair.to_keypair_bytes();
        let restored = Keypair::from_keypair_bytes(&bytes).unwrap();
        assert_eq!(keypair.public_key(), restored.public_key());
        assert_eq!(&bytes[32..], keypair.public_key().as_bytes());
    }

    #[test]
    fn test_keypair_bytes_rejects_wrong_length() {
        let err = Keypair::from_keypair_bytes(&[7u8; 32]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidKeyLength {
                expected: 64,
                actual: 32
            }
        ));
    }

    #[test]
    fn test_keypair_bytes_rejects_mismatched_public_half() {
        let mut bytes = Keypair::from_seed(&[1u8; 32]).to_keypair_bytes();
        bytes[32..].copy_from_slice(Keypair::from_seed(&[2u8; 32]).public_key().as_bytes());
        assert!(Keypair::from_keypair_bytes(&bytes).is_err());
    }

    #[test]
    fn test_public_key_base64_roundtrip() {
        let pk = Keypair::generate().public_key();
        let encoded = pk.to_base64();
        assert_eq!(encoded.len(), 44);
        assert_eq!(PublicKey::from_base64(&encoded).unwrap(), pk);
    }

    #[test]
    fn test_signature_from_base64_rejects_short_input() {
        let short = STANDARD.encode([0u8; 10]);
        assert!(matches!(
            Signature::from_base64(&short),
            Err(CoreError::InvalidKeyLength { expected: 64, .. })
        ));
        assert!(matches!(
            Signature::from_base64("not base64!"),
            Err(CoreError::DecodingError(_))
        ));
    }
}
