//! # DIS Ledger Core
//!
//! Pure primitives for the DIS receipt ledger: receipts, canonicalization,
//! and Ed25519 signing.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over signed, content-addressed records.
//!
//! ## Key Types
//!
//! - [`Receipt`] - A signed record of one attested action
//! - [`ReceiptBuilder`] - Builds and signs a receipt from its six hashed fields
//! - [`ReceiptId`] - Random identifier (`r-` + 32 hex chars)
//! - [`Keypair`] / [`PublicKey`] / [`Signature`] - Ed25519 wrappers with base64 encodings
//! - [`VerifyError`] - Typed verification verdict
//!
//! ## Hashing
//!
//! A receipt's `hash` is the SHA-256 hex digest of its pipe-joined payload
//! fields. Structured values (audit reports, registry items) are hashed over
//! their canonical JSON encoding. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod receipt;
pub mod types;
pub mod validation;

pub use canonical::{
    canonical_bytes, canonicalize, digest, freeze_fingerprint, hash_value, receipt_payload,
};
pub use crypto::{Keypair, PublicKey, Signature};
pub use error::{CoreError, Result, VerifyError};
pub use receipt::{
    Provenance, Receipt, ReceiptBuilder, ReceiptMetadata, FREEZE_ACTION, VERIFY_ACTION,
};
pub use types::{format_timestamp, now_timestamp, parse_timestamp, ReceiptId};
pub use validation::{check_required, verify_embedded, verify_with_key};
