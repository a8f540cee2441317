/// Axum HTTP handlers for the wallet metadata API

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::store::MemoryStore;
use crate::types::*;

/// Shared application state
pub type AppState = Arc<MemoryStore>;

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, message).into_response()
    }
}

/// GET /wallet-metadata?walletAddress=...
/// Returns every key record stored under the exact address
pub async fn get_wallet_metadata(
    State(store): State<AppState>,
    Query(query): Query<WalletMetadataQuery>,
) -> Result<Json<Vec<WalletKeyRecord>>, ApiError> {
    let read = store.count_read();

    if store.take_failure() {
        log::warn!("Injected failure for read #{} ({})", read, query.wallet_address);
        return Err(ApiError::Unavailable("Metadata store temporarily unavailable".into()));
    }

    store
        .records(&query.wallet_address)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No metadata for {}", query.wallet_address)))
}

/// PUT /wallet-metadata
/// Inserts or replaces one key record
pub async fn upsert_wallet_metadata(
    State(store): State<AppState>,
    Json(request): Json<UpsertRecordRequest>,
) -> Result<StatusCode, ApiError> {
    if request.record.wallet_id.is_empty() {
        return Err(ApiError::BadRequest("walletId must not be empty".into()));
    }

    log::info!("Upserting record {} for {}", request.record.wallet_id, request.wallet_address);
    store.upsert(&request.wallet_address, request.record);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /wallet-metadata/mark-scanned
/// Records a completed scan of one chain
pub async fn mark_scanned(
    State(store): State<AppState>,
    Json(request): Json<MarkScannedRequest>,
) -> Result<Json<WalletKeyRecord>, ApiError> {
    if !(request.chain_id.is_number() || request.chain_id.is_string()) {
        return Err(ApiError::BadRequest(format!("Invalid chainId: {}", request.chain_id)));
    }

    log::info!(
        "Marking chain {} scanned for {} ({})",
        request.chain_id,
        request.wallet_address,
        request.wallet_id
    );
    let record = store.mark_scanned(&request.wallet_address, &request.wallet_id, request.chain_id);
    Ok(Json(record))
}

/// POST /faults
/// Makes the next `count` metadata reads fail with 503
pub async fn inject_faults(
    State(store): State<AppState>,
    Json(request): Json<FaultRequest>,
) -> Json<FaultResponse> {
    let pending_failures = store.inject_failures(request.count);
    log::info!("💥 {} metadata read failure(s) pending", pending_failures);
    Json(FaultResponse { pending_failures })
}

/// GET /health
pub async fn health_check(State(store): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "reads": store.read_count(),
        "pendingFailures": store.pending_failures(),
    }))
}
