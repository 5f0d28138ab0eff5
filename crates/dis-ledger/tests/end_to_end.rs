//! Filesystem end-to-end tests: issue, tamper, sweep, inspect.

use dis_ledger::core::{digest, receipt_payload, verify_embedded, Receipt, FREEZE_ACTION};
use dis_ledger::store::{Area, ReceiptStore};
use dis_ledger::{IssueRequest, LedgerError, VerificationReport, VerificationStatus};
use dis_ledger_testkit::TestLedger;

#[tokio::test]
async fn test_tampered_signature_is_quarantined() {
    let fixture = TestLedger::new().await;
    let ledger = &fixture.ledger;

    let receipt = ledger
        .issue(
            IssueRequest::new("domain.terra", FREEZE_ACTION)
                .core("DIS-CORE v1.0")
                .console("ac-7f3e")
                .seat("uid-terracouncil-001"),
        )
        .await
        .unwrap();

    // Independent recomputation from the six payload fields.
    let persisted = fixture.read_receipt(Area::Generated, &receipt.receipt_id);
    let recomputed = digest(
        receipt_payload(
            "domain.terra",
            FREEZE_ACTION,
            &persisted.created_at,
            "DIS-CORE v1.0",
            "ac-7f3e",
            "uid-terracouncil-001",
        )
        .as_bytes(),
    );
    assert_eq!(persisted.hash, recomputed);

    let baseline = ledger.verify_all().await.unwrap().report;
    assert_eq!(baseline.invalid, 0);

    fixture.tamper_signature(&receipt.receipt_id);
    let report = ledger.verify_all().await.unwrap().report;

    assert_eq!(report.invalid, baseline.invalid + 1);
    let file = receipt.receipt_id.file_name();
    let result = report.result_for(&file).unwrap();
    assert_eq!(result.status, VerificationStatus::Quarantined);
    assert_eq!(result.reason, "signature mismatch");

    assert!(!fixture.generated_path(&receipt.receipt_id).exists());
    assert!(fixture.path(Area::Quarantine, &file).exists());
}

#[tokio::test]
async fn test_report_counts_cover_every_file() {
    let fixture = TestLedger::new().await;
    let ledger = &fixture.ledger;

    for _ in 0..3 {
        ledger
            .record_action("console.approve.v1", "uid-terracouncil-001", Vec::new())
            .await
            .unwrap();
    }
    let tampered = ledger
        .freeze("uid-terracouncil-002", ["aa", "bb"])
        .await
        .unwrap();
    fixture.tamper_signature(&tampered.receipt_id);
    fixture.write_legacy_receipt("domain.legacy");
    fixture.write_legacy_receipt("domain.legacy");
    fixture.write_raw("broken.json", b"{\"by\": ");

    let out = ledger.verify_all().await.unwrap();
    let r = &out.report;

    assert_eq!(r.total, 7);
    assert_eq!(r.valid + r.invalid + r.archived + r.errors, r.total);
    assert_eq!((r.valid, r.invalid, r.archived, r.errors), (3, 1, 2, 1));
    assert_eq!(fixture.files(Area::Archive).len(), 2);
    assert_eq!(fixture.files(Area::Quarantine).len(), 1);

    // The audit document on disk matches the returned report.
    let bytes = std::fs::read(fixture.path(Area::Audits, &out.audit_file)).unwrap();
    let on_disk: VerificationReport = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(&on_disk, r);

    // The meta-receipt is persisted and self-verifies.
    let meta = fixture.read_receipt(Area::Generated, &out.receipt.receipt_id);
    assert_eq!(verify_embedded(&meta), Ok(()));
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let fixture = TestLedger::new().await;
    let ledger = &fixture.ledger;

    let r = ledger
        .record_action("console.approve.v1", "uid-terracouncil-001", Vec::new())
        .await
        .unwrap();
    fixture.tamper_signature(&r.receipt_id);
    fixture.write_legacy_receipt("domain.legacy");

    let first = ledger.verify_all().await.unwrap().report;
    assert_eq!((first.invalid, first.archived), (1, 1));

    let second = ledger.verify_all().await.unwrap().report;
    assert_eq!((second.invalid, second.archived, second.errors), (0, 0, 0));
    assert_eq!(fixture.files(Area::Archive).len(), 1);
    assert_eq!(fixture.files(Area::Quarantine).len(), 1);

    // A file already relocated is a no-op, not an error.
    let name = r.receipt_id.file_name();
    let moved = ledger
        .store()
        .relocate(&name, Area::Generated, Area::Quarantine)
        .await
        .unwrap();
    assert!(!moved);
}

#[tokio::test]
async fn test_log_and_files_agree() {
    let fixture = TestLedger::new().await;
    let ledger = &fixture.ledger;

    let mut issued = Vec::new();
    for i in 0..5 {
        issued.push(
            ledger
                .issue(IssueRequest::new("domain.terra", format!("action.{i}.v1")))
                .await
                .unwrap(),
        );
    }

    let lines = ledger.store().log_lines().await.unwrap();
    let logged: Vec<Receipt> = lines
        .iter()
        .map(|l| Receipt::from_json(l.as_bytes()).unwrap())
        .collect();
    assert_eq!(logged, issued);

    let mut ids: Vec<_> = issued.iter().map(|r| r.receipt_id.clone()).collect();
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(ledger.list().await.unwrap(), ids);
}

#[tokio::test]
async fn test_keys_persist_across_reopen() {
    let fixture = TestLedger::new().await;
    let first = fixture
        .ledger
        .issue(IssueRequest::new("domain.terra", "x.v1"))
        .await
        .unwrap();

    let config = fixture.ledger.config().clone();
    let reopened = dis_ledger::Ledger::open(config).await.unwrap();
    let second = reopened
        .issue(IssueRequest::new("domain.terra", "y.v1"))
        .await
        .unwrap();
    assert_eq!(first.embedded_key(), second.embedded_key());

    let key_file = fixture.data_dir().join("keys").join("domain.terra.priv");
    assert!(key_file.exists());
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&key_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[tokio::test]
async fn test_invalid_actor_name_fails_signing() {
    let fixture = TestLedger::new().await;
    let err = fixture
        .ledger
        .issue(IssueRequest::new("../escape", "x.v1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Signing { .. }));
    assert!(fixture.ledger.store().log_lines().await.unwrap().is_empty());
}
