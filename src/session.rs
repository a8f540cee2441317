/// Active wallet connection

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::chain::ChainId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WalletSession {
    /// Local correlation id for logs, not sent anywhere
    pub id: Uuid,
    /// Wallet address exactly as reported by the connector
    pub address: String,
    /// Network the wallet reports as connected
    pub chain_id: ChainId,
    /// Vault wallet handle, known once the SDK derived the vault keys
    pub vault_wallet_id: Option<String>,
    pub connected_at: DateTime<Utc>,
}

impl WalletSession {
    pub fn new(address: impl Into<String>, chain_id: ChainId, vault_wallet_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: address.into(),
            chain_id,
            vault_wallet_id,
            connected_at: Utc::now(),
        }
    }

    /// Same wallet (exact address match), regardless of network or vault handle
    pub fn same_wallet(&self, other: &WalletSession) -> bool {
        self.address == other.address
    }

    pub fn with_chain(&self, chain_id: ChainId) -> Self {
        Self {
            chain_id,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_wallet_is_case_sensitive() {
        let a = WalletSession::new("0xAbC1", ChainId(1), None);
        let b = WalletSession::new("0xabc1", ChainId(1), None);
        assert!(!a.same_wallet(&b));
        assert!(a.same_wallet(&a.with_chain(ChainId(137))));
    }

    #[test]
    fn test_session_serializes_for_logs() {
        let session = WalletSession::new("0xAbC1", ChainId(137), Some("vault-1".into()));
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["id"], serde_json::json!(session.id.to_string()));
        assert_eq!(json["chain_id"], serde_json::json!(137));
        assert_eq!(json["vault_wallet_id"], serde_json::json!("vault-1"));
    }
}
