//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use dis_ledger::store::StoreError;
use dis_ledger::sync::SyncError;
use dis_ledger::LedgerError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("receipt not found: {0}")]
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Ledger(e) => match e {
                LedgerError::UnauthorizedSeat(_) => StatusCode::UNAUTHORIZED,
                LedgerError::ReceiptNotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::Store(StoreError::InvalidName(_)) => StatusCode::BAD_REQUEST,
                LedgerError::Sync(SyncError::UnknownPeer(_))
                | LedgerError::Sync(SyncError::PeerRejected { .. }) => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request refused");
        }

        let message = match &self {
            ApiError::Ledger(LedgerError::Sync(SyncError::UnknownPeer(peer))) => {
                format!("unknown peer {peer}")
            }
            ApiError::Ledger(LedgerError::Sync(SyncError::PeerRejected { reason, .. })) => {
                reason.clone()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
