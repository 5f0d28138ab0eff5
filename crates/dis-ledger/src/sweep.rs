//! Verification sweep: classify every receipt in `generated/`.
//!
//! Each file ends in exactly one state:
//!
//! | verdict                         | status        | file                |
//! |---------------------------------|---------------|---------------------|
//! | verifies under its embedded key | `valid`       | stays               |
//! | no embedded key                 | `archived`    | moved to `archive/` |
//! | signature or hash mismatch      | `quarantined` | moved to `quarantine/` |
//! | unreadable or missing fields    | `error`       | stays               |
//!
//! The sweep never aborts on a single file. The resulting report is written
//! to `audits/` and wrapped in a signed meta-receipt.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dis_ledger_core::{
    format_timestamp, hash_value, verify_embedded, Provenance, Receipt, VerifyError,
    VERIFY_ACTION,
};
use dis_ledger_store::{Area, KeyStore, ReceiptStore};

use crate::config::LedgerConfig;
use crate::error::Result;
use crate::issuer::{IssueRequest, Issuer};

/// Reason recorded for a receipt that verifies.
pub const REASON_VALID: &str = "signature verified";

/// Reason recorded for a receipt without an embedded key.
pub const REASON_LEGACY: &str = "legacy / unsigned receipt";

/// Sweep outcome for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Valid,
    Archived,
    Quarantined,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub file: String,
    pub status: VerificationStatus,
    pub reason: String,
    pub verified_at: String,
}

/// Aggregate of one sweep. `valid + invalid + archived + errors == total`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verified_at: String,
    pub total: usize,
    pub valid: usize,
    /// Quarantined files.
    pub invalid: usize,
    pub archived: usize,
    pub errors: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationReport {
    fn record(&mut self, result: VerificationResult) {
        self.total += 1;
        match result.status {
            VerificationStatus::Valid => self.valid += 1,
            VerificationStatus::Archived => self.archived += 1,
            VerificationStatus::Quarantined => self.invalid += 1,
            VerificationStatus::Error => self.errors += 1,
        }
        self.results.push(result);
    }

    /// Result for `file`, if it was scanned.
    pub fn result_for(&self, file: &str) -> Option<&VerificationResult> {
        self.results.iter().find(|r| r.file == file)
    }
}

/// Everything a completed sweep produced.
#[derive(Debug, Clone)]
pub struct SweepOutput {
    pub report: VerificationReport,
    /// The signed meta-receipt wrapping the report.
    pub receipt: Receipt,
    /// Name of the report document under `audits/`.
    pub audit_file: String,
    /// Taken just before `generated/` was listed. Anything written later was
    /// not looked at by this sweep.
    pub started_at: DateTime<Utc>,
}

/// Runs verification sweeps and signs their reports.
pub struct Sweeper<S: ReceiptStore, K: KeyStore> {
    store: Arc<S>,
    issuer: Issuer<S, K>,
    config: Arc<LedgerConfig>,
}

impl<S: ReceiptStore, K: KeyStore> Sweeper<S, K> {
    pub fn new(store: Arc<S>, issuer: Issuer<S, K>, config: Arc<LedgerConfig>) -> Self {
        Self {
            store,
            issuer,
            config,
        }
    }

    /// Verify every receipt currently in `generated/`.
    ///
    /// Only storage-level failures (cannot list the area, cannot write the
    /// report, cannot issue the meta-receipt) are errors. Per-file problems
    /// are recorded in the report.
    pub async fn run(&self) -> Result<SweepOutput> {
        let started_at = Utc::now();
        let files = self.store.list(Area::Generated).await?;
        tracing::info!(files = files.len(), "verification sweep started");

        let mut report = VerificationReport::default();
        for file in files {
            let result = self.check_file(&file).await;
            match result.status {
                VerificationStatus::Valid => {
                    tracing::debug!(file = %result.file, "receipt valid")
                }
                VerificationStatus::Archived => {
                    tracing::info!(file = %result.file, "legacy receipt archived")
                }
                VerificationStatus::Quarantined => {
                    tracing::warn!(file = %result.file, reason = %result.reason, "receipt quarantined")
                }
                VerificationStatus::Error => {
                    tracing::error!(file = %result.file, reason = %result.reason, "receipt unverifiable")
                }
            }
            report.record(result);
        }

        let now = Utc::now();
        report.verified_at = format_timestamp(now);

        let audit_file = format!("verify_{}Z.json", now.format("%Y%m%dT%H%M%S%.3f"));
        let document = serde_json::to_vec_pretty(&report)
            .map_err(|e| dis_ledger_core::CoreError::EncodingError(e.to_string()))?;
        self.store.write(Area::Audits, &audit_file, &document).await?;

        let receipt = self
            .issuer
            .issue(
                IssueRequest::new(&self.config.node_id, VERIFY_ACTION)
                    .core(&self.config.core_hash)
                    .console(&self.config.console_id)
                    .seat(self.config.audit_seat())
                    .provenance(Provenance::new("audit", &audit_file, "recorded"))
                    .provenance(Provenance::new("report", hash_value(&report)?, "valid")),
            )
            .await?;

        tracing::info!(
            total = report.total,
            valid = report.valid,
            invalid = report.invalid,
            archived = report.archived,
            errors = report.errors,
            receipt_id = %receipt.receipt_id,
            audit_file = %audit_file,
            "verification sweep complete"
        );

        Ok(SweepOutput {
            report,
            receipt,
            audit_file,
            started_at,
        })
    }

    async fn check_file(&self, file: &str) -> VerificationResult {
        let (status, reason) = match self.store.read(Area::Generated, file).await {
            Err(e) => (VerificationStatus::Error, e.to_string()),
            Ok(bytes) => match Receipt::from_json(&bytes) {
                Err(e) => (VerificationStatus::Error, e.to_string()),
                Ok(receipt) => self.classify(file, &receipt).await,
            },
        };

        VerificationResult {
            file: file.to_owned(),
            status,
            reason,
            verified_at: format_timestamp(Utc::now()),
        }
    }

    async fn classify(&self, file: &str, receipt: &Receipt) -> (VerificationStatus, String) {
        let (target, status, reason) = match verify_embedded(receipt) {
            Ok(()) => return (VerificationStatus::Valid, REASON_VALID.to_owned()),
            Err(e @ VerifyError::MissingField(_)) => {
                return (VerificationStatus::Error, e.to_string())
            }
            Err(VerifyError::InsufficientData) => (
                Area::Archive,
                VerificationStatus::Archived,
                REASON_LEGACY.to_owned(),
            ),
            Err(e) => (Area::Quarantine, VerificationStatus::Quarantined, e.to_string()),
        };

        match self.store.relocate(file, Area::Generated, target).await {
            Ok(moved) => {
                if !moved {
                    tracing::debug!(file, "already relocated");
                }
                (status, reason)
            }
            Err(e) => (
                VerificationStatus::Error,
                format!("{reason}; move to {} failed: {e}", target.dir_name()),
            ),
        }
    }
}
