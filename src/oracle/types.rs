// Wallet metadata store response types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::chain::ChainId;

/// Chain id as written by the store: number, decimal string or hex string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainIdValue {
    Number(u64),
    Text(String),
    Other(serde_json::Value),
}

impl ChainIdValue {
    pub fn normalize(&self) -> Option<ChainId> {
        match self {
            ChainIdValue::Number(n) => Some(ChainId(*n)),
            ChainIdValue::Text(s) => ChainId::parse(s),
            ChainIdValue::Other(_) => None,
        }
    }
}

impl From<ChainId> for ChainIdValue {
    fn from(chain: ChainId) -> Self {
        ChainIdValue::Number(chain.0)
    }
}

/// One vault key record stored under a wallet address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletKeyRecord {
    pub wallet_id: String,
    #[serde(default)]
    pub hydrated_chains: Vec<ChainIdValue>,
    #[serde(default)]
    pub scanned_chains: Vec<ChainIdValue>,
}

impl WalletKeyRecord {
    /// Networks that reached readiness by either hydration or full scan
    pub fn ready_chains(&self) -> BTreeSet<ChainId> {
        self.hydrated_chains
            .iter()
            .chain(self.scanned_chains.iter())
            .filter_map(|value| {
                let normalized = value.normalize();
                if normalized.is_none() {
                    log::warn!(
                        "Skipping unparsable chain id {:?} in record {}",
                        value,
                        self.wallet_id
                    );
                }
                normalized
            })
            .collect()
    }

    pub fn is_ready_on(&self, chain: ChainId) -> bool {
        self.ready_chains().contains(&chain)
    }
}

/// `GET /wallet-metadata` body: a bare record list or `{ "keys": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MetadataResponse {
    Records(Vec<WalletKeyRecord>),
    Keyed { keys: Vec<WalletKeyRecord> },
}

impl MetadataResponse {
    pub fn into_records(self) -> Vec<WalletKeyRecord> {
        match self {
            MetadataResponse::Records(records) => records,
            MetadataResponse::Keyed { keys } => keys,
        }
    }
}
