/// Wallet metadata API types
///
/// Chain ids are kept as raw JSON values so seeds can reproduce the mixed
/// number / decimal string / hex string encodings seen in production.

use serde::{Deserialize, Serialize};

/// One vault key record stored under a wallet address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletKeyRecord {
    pub wallet_id: String,
    #[serde(default)]
    pub hydrated_chains: Vec<serde_json::Value>,
    #[serde(default)]
    pub scanned_chains: Vec<serde_json::Value>,
}

impl WalletKeyRecord {
    pub fn new(wallet_id: impl Into<String>) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            hydrated_chains: Vec::new(),
            scanned_chains: Vec::new(),
        }
    }
}

/// Query string of `GET /wallet-metadata`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMetadataQuery {
    pub wallet_address: String,
}

/// Body of `PUT /wallet-metadata`
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRecordRequest {
    pub wallet_address: String,
    #[serde(flatten)]
    pub record: WalletKeyRecord,
}

/// Body of `POST /wallet-metadata/mark-scanned`
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkScannedRequest {
    pub wallet_address: String,
    pub wallet_id: String,
    pub chain_id: serde_json::Value,
}

/// Body of `POST /faults`
#[derive(Debug, Deserialize, Serialize)]
pub struct FaultRequest {
    /// Number of upcoming metadata reads answered with 503
    pub count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultResponse {
    pub pending_failures: u32,
}
