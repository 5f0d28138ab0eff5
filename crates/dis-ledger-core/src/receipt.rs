//! Receipt: a signed record of one attested action.
//!
//! A receipt is immutable once persisted. Corrections are new receipts that
//! carry a `superseded` provenance entry pointing at the original.
//!
//! Wire format (JSON, field order as serialized):
//!
//! ```text
//! receipt_id, by, action, created_at, hash, provenance[], signature,
//! frozen_core_hash, metadata{issued_from_console, issuer_seat,
//!                            verified_at?, verification_method?,
//!                            signer_public_key_b64?}
//! ```
//!
//! Every field deserializes with a default so that a file missing a field
//! still loads and is reported as a missing field by validation rather than
//! as a parse failure.

use serde::{Deserialize, Serialize};

use crate::canonical::{digest, receipt_payload};
use crate::crypto::Keypair;
use crate::error::{CoreError, Result};
use crate::types::{now_timestamp, ReceiptId};

/// Action name of the meta-receipt wrapping a verification report.
pub const VERIFY_ACTION: &str = "domain.verify.v1";

/// Action name of a registry freeze.
pub const FREEZE_ACTION: &str = "freeze.v1";

/// Provenance status marking a receipt replaced by a newer one.
pub const STATUS_SUPERSEDED: &str = "superseded";

/// One attestation supporting an action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Provenance {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "ref")]
    pub reference: String,

    pub status: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub redacted_fields: Vec<String>,
}

impl Provenance {
    pub fn new(
        kind: impl Into<String>,
        reference: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            reference: reference.into(),
            status: status.into(),
            redacted_fields: Vec::new(),
        }
    }

    /// Record which fields of the referenced material were withheld.
    pub fn redacted(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.redacted_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Issuance context and verification annotations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptMetadata {
    pub issued_from_console: String,

    pub issuer_seat: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,

    /// Base64 public key of the signer, embedded so the file self-verifies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_public_key_b64: Option<String>,
}

/// A complete receipt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Receipt {
    pub receipt_id: ReceiptId,

    /// Issuing domain or entity.
    #[serde(rename = "by")]
    pub actor: String,

    pub action: String,

    /// Older receipts named this field `timestamp`.
    #[serde(alias = "timestamp")]
    pub created_at: String,

    /// Hex SHA-256 of the pipe-joined payload fields.
    pub hash: String,

    pub provenance: Vec<Provenance>,

    /// Base64 Ed25519 signature over the ASCII bytes of `hash`.
    pub signature: String,

    pub frozen_core_hash: String,

    pub metadata: ReceiptMetadata,
}

impl Receipt {
    /// Parse a receipt from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    /// Pretty JSON, as written to the individual receipt file.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Compact single-line JSON, as appended to the ledger log.
    pub fn to_json_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// The deterministic payload the hash is computed over.
    pub fn payload(&self) -> String {
        receipt_payload(
            &self.actor,
            &self.action,
            &self.created_at,
            &self.frozen_core_hash,
            &self.metadata.issued_from_console,
            &self.metadata.issuer_seat,
        )
    }

    /// Recompute the hash from the payload fields.
    pub fn compute_hash(&self) -> String {
        digest(self.payload().as_bytes())
    }

    /// The embedded signer key, if present and non-empty.
    pub fn embedded_key(&self) -> Option<&str> {
        self.metadata
            .signer_public_key_b64
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    /// Receipts this one supersedes.
    pub fn superseded_ids(&self) -> impl Iterator<Item = &str> {
        self.provenance
            .iter()
            .filter(|p| p.kind == "receipt" && p.status == STATUS_SUPERSEDED)
            .map(|p| p.reference.as_str())
    }
}

/// Builder for creating receipts.
pub struct ReceiptBuilder {
    receipt_id: Option<ReceiptId>,
    actor: String,
    action: String,
    created_at: Option<String>,
    frozen_core_hash: String,
    console_id: String,
    issuer_seat: String,
    provenance: Vec<Provenance>,
}

impl ReceiptBuilder {
    /// Start building a receipt for `actor` performing `action`.
    pub fn new(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            receipt_id: None,
            actor: actor.into(),
            action: action.into(),
            created_at: None,
            frozen_core_hash: String::new(),
            console_id: String::new(),
            issuer_seat: String::new(),
            provenance: Vec::new(),
        }
    }

    /// Set the policy/schema fingerprint this receipt is bound to.
    pub fn frozen_core_hash(mut self, hash: impl Into<String>) -> Self {
        self.frozen_core_hash = hash.into();
        self
    }

    /// Set the issuing console id.
    pub fn console(mut self, console_id: impl Into<String>) -> Self {
        self.console_id = console_id.into();
        self
    }

    /// Set the issuer seat.
    pub fn seat(mut self, seat: impl Into<String>) -> Self {
        self.issuer_seat = seat.into();
        self
    }

    /// Pin the timestamp instead of taking the current time.
    pub fn created_at(mut self, ts: impl Into<String>) -> Self {
        self.created_at = Some(ts.into());
        self
    }

    /// Pin the id instead of generating one.
    pub fn id(mut self, id: ReceiptId) -> Self {
        self.receipt_id = Some(id);
        self
    }

    /// Add a provenance entry.
    pub fn provenance(mut self, p: Provenance) -> Self {
        self.provenance.push(p);
        self
    }

    /// Mark an earlier receipt as superseded by this one.
    pub fn supersedes(self, original: &ReceiptId) -> Self {
        self.provenance(Provenance::new(
            "receipt",
            original.as_str(),
            STATUS_SUPERSEDED,
        ))
    }

    /// Build and sign the receipt.
    pub fn sign(self, keypair: &Keypair) -> Receipt {
        let created_at = self.created_at.unwrap_or_else(now_timestamp);
        let hash = digest(
            receipt_payload(
                &self.actor,
                &self.action,
                &created_at,
                &self.frozen_core_hash,
                &self.console_id,
                &self.issuer_seat,
            )
            .as_bytes(),
        );
        let signature = keypair.sign(hash.as_bytes()).to_base64();

        Receipt {
            receipt_id: self.receipt_id.unwrap_or_else(ReceiptId::generate),
            actor: self.actor,
            action: self.action,
            created_at,
            hash,
            provenance: self.provenance,
            signature,
            frozen_core_hash: self.frozen_core_hash,
            metadata: ReceiptMetadata {
                issued_from_console: self.console_id,
                issuer_seat: self.issuer_seat,
                verified_at: None,
                verification_method: None,
                signer_public_key_b64: Some(keypair.public_key().to_base64()),
            },
        }
    }
}
