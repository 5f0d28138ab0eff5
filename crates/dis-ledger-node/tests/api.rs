use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot

use dis_ledger::core::{Keypair, ReceiptBuilder, VERIFY_ACTION};
use dis_ledger::sync::{NetworkConfig, TrustLevel};
use dis_ledger::Receipt;
use dis_ledger_node::api::{ReceiptList, VerifyAllResponse};
use dis_ledger_node::build_router;
use dis_ledger_testkit::{flip_first_char, node_keypair, peer, TestLedger};

async fn fixture() -> (TestLedger, Router) {
    let aqua = node_keypair(1);
    let ignis = node_keypair(2);
    let fixture = TestLedger::with_config(|c| {
        c.network = NetworkConfig {
            peers: vec![
                peer("domain.aqua", &aqua, TrustLevel::Trusted),
                peer("domain.ignis", &ignis, TrustLevel::Blocked),
            ],
        };
    })
    .await;
    let app = build_router(fixture.ledger.clone());
    (fixture, app)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn peer_receipt(actor: &str, keypair: &Keypair) -> Value {
    let receipt = ReceiptBuilder::new(actor, VERIFY_ACTION)
        .frozen_core_hash("DIS-CORE v1.0")
        .console("ac-peer")
        .seat("uid-peer-001")
        .sign(keypair);
    serde_json::to_value(receipt).unwrap()
}

#[tokio::test]
async fn test_console_action_then_fetch() {
    let (_fixture, app) = fixture().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/console/action",
        Some(json!({"action": "console.approve.v1", "initiator": "uid-terracouncil-001"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let issued: Receipt = serde_json::from_value(body).unwrap();
    assert_eq!(issued.actor, "domain.terra");
    assert_eq!(issued.metadata.issuer_seat, "uid-terracouncil-001");

    let (status, body) = send(&app, "GET", "/api/receipts", None).await;
    assert_eq!(status, StatusCode::OK);
    let list: ReceiptList = serde_json::from_value(body).unwrap();
    assert_eq!(list.receipts, vec![issued.receipt_id.clone()]);

    let uri = format!("/api/receipts/{}", issued.receipt_id);
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_value::<Receipt>(body).unwrap(), issued);
}

#[tokio::test]
async fn test_unknown_receipt_is_404() {
    let (_fixture, app) = fixture().await;
    let (status, body) = send(&app, "GET", "/api/receipts/r-00000000000000000000000000000000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_unknown_seat_is_401() {
    let (fixture, app) = fixture().await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/console/action",
        Some(json!({"action": "console.approve.v1", "initiator": "uid-intruder"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(fixture.ledger.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_verify_all_returns_report_and_receipt() {
    let (fixture, app) = fixture().await;
    let r = fixture
        .ledger
        .record_action("console.approve.v1", "uid-terracouncil-001", Vec::new())
        .await
        .unwrap();
    fixture.tamper_signature(&r.receipt_id);

    let (status, body) = send(&app, "GET", "/api/verify/all", None).await;
    assert_eq!(status, StatusCode::OK);
    let resp: VerifyAllResponse = serde_json::from_value(body).unwrap();
    assert_eq!(resp.report.total, 1);
    assert_eq!(resp.report.invalid, 1);
    assert_eq!(resp.receipt.action, VERIFY_ACTION);
}

#[tokio::test]
async fn test_verify_external_uses_configured_key() {
    let (fixture, app) = fixture().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/verify/external",
        Some(peer_receipt("domain.aqua", &node_keypair(1))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "valid");
    assert_eq!(body["peer"], "domain.aqua");

    // Self-consistent, but not signed with the configured key.
    let (status, body) = send(
        &app,
        "POST",
        "/api/verify/external",
        Some(peer_receipt("domain.aqua", &Keypair::generate())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "invalid");
    assert_eq!(body["reason"], "signature mismatch");

    // Tampered signature from the right key.
    let mut tampered = peer_receipt("domain.aqua", &node_keypair(1));
    let sig = tampered["signature"].as_str().unwrap().to_owned();
    tampered["signature"] = Value::String(flip_first_char(&sig));
    let (_, body) = send(&app, "POST", "/api/verify/external", Some(tampered)).await;
    assert_eq!(body["status"], "invalid");

    let (status, body) = send(&app, "GET", "/api/trust", None).await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["ok", "invalid", "invalid"]);
    assert!(fixture
        .path(dis_ledger::store::Area::Peers, "domain.aqua.json")
        .exists());
}

#[tokio::test]
async fn test_verify_external_refuses_unknown_and_blocked_peers() {
    let (fixture, app) = fixture().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/verify/external",
        Some(peer_receipt("domain.umbra", &Keypair::generate())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "unknown peer domain.umbra");

    let (status, body) = send(
        &app,
        "POST",
        "/api/verify/external",
        Some(peer_receipt("domain.ignis", &node_keypair(2))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "peer is blocked");

    assert!(fixture.ledger.trust_entries().await.is_empty());
}
