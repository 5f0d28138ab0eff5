//! HTTP routes over a [`Ledger`].
//!
//! | route                          | handler                        |
//! |--------------------------------|--------------------------------|
//! | `GET  /api/receipts`           | ids in `generated/`            |
//! | `GET  /api/receipts/:id`       | one receipt                    |
//! | `POST /api/console/action`     | issue a console receipt        |
//! | `GET  /api/verify/all`         | on-demand sweep                |
//! | `POST /api/verify/external`    | accept a peer receipt          |
//! | `GET  /api/trust`              | trust ledger entries           |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use dis_ledger::store::{KeyStore, ReceiptStore};
use dis_ledger::sync::{PeerReply, TrustEntry, VERIFY_EXTERNAL_PATH};
use dis_ledger::{Ledger, Provenance, Receipt, ReceiptId, VerificationReport};

use crate::error::ApiError;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptList {
    pub receipts: Vec<ReceiptId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsoleActionRequest {
    pub action: String,
    pub initiator: String,
    #[serde(default)]
    pub provenance: Vec<Provenance>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyAllResponse {
    pub report: VerificationReport,
    pub receipt: Receipt,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrustList {
    pub entries: Vec<TrustEntry>,
}

pub fn build_router<S, K>(ledger: Arc<Ledger<S, K>>) -> Router
where
    S: ReceiptStore + 'static,
    K: KeyStore + 'static,
{
    Router::new()
        .route("/api/receipts", get(list_receipts::<S, K>))
        .route("/api/receipts/:id", get(get_receipt::<S, K>))
        .route("/api/console/action", post(console_action::<S, K>))
        .route("/api/verify/all", get(verify_all::<S, K>))
        .route(VERIFY_EXTERNAL_PATH, post(verify_external::<S, K>))
        .route("/api/trust", get(trust::<S, K>))
        .with_state(ledger)
}

async fn list_receipts<S: ReceiptStore, K: KeyStore>(
    State(ledger): State<Arc<Ledger<S, K>>>,
) -> ApiResult<ReceiptList> {
    Ok(Json(ReceiptList {
        receipts: ledger.list().await?,
    }))
}

async fn get_receipt<S: ReceiptStore, K: KeyStore>(
    State(ledger): State<Arc<Ledger<S, K>>>,
    Path(id): Path<String>,
) -> ApiResult<Receipt> {
    let id = ReceiptId::new(id);
    match ledger.get(&id).await? {
        Some(receipt) => Ok(Json(receipt)),
        None => Err(ApiError::NotFound(id.to_string())),
    }
}

async fn console_action<S: ReceiptStore, K: KeyStore>(
    State(ledger): State<Arc<Ledger<S, K>>>,
    Json(req): Json<ConsoleActionRequest>,
) -> ApiResult<Receipt> {
    let receipt = ledger
        .record_action(&req.action, &req.initiator, req.provenance)
        .await?;
    Ok(Json(receipt))
}

async fn verify_all<S: ReceiptStore, K: KeyStore>(
    State(ledger): State<Arc<Ledger<S, K>>>,
) -> ApiResult<VerifyAllResponse> {
    let output = ledger.verify_all().await?;
    Ok(Json(VerifyAllResponse {
        report: output.report,
        receipt: output.receipt,
    }))
}

async fn verify_external<S: ReceiptStore, K: KeyStore>(
    State(ledger): State<Arc<Ledger<S, K>>>,
    Json(receipt): Json<Receipt>,
) -> ApiResult<PeerReply> {
    let outcome = ledger.accept_peer_receipt(receipt).await?;
    Ok(Json(outcome.into()))
}

async fn trust<S: ReceiptStore, K: KeyStore>(
    State(ledger): State<Arc<Ledger<S, K>>>,
) -> ApiResult<TrustList> {
    Ok(Json(TrustList {
        entries: ledger.trust_entries().await,
    }))
}
