/// Wallet metadata store access
///
/// The store is a key-value service reachable over HTTP. A missing key is a
/// definitive answer (`Ok(None)`), every other failure is an error the oracle
/// treats as inconclusive.

use reqwest::StatusCode;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::types::{MetadataResponse, WalletKeyRecord};
use crate::error::StoreError;

pub trait MetadataStore: Send + Sync + 'static {
    /// Records stored under `wallet_address`, matched byte-for-byte
    fn wallet_metadata(
        &self,
        wallet_address: &str,
    ) -> impl Future<Output = Result<Option<Vec<WalletKeyRecord>>, StoreError>> + Send;
}

impl<T: MetadataStore> MetadataStore for Arc<T> {
    fn wallet_metadata(
        &self,
        wallet_address: &str,
    ) -> impl Future<Output = Result<Option<Vec<WalletKeyRecord>>, StoreError>> + Send {
        (**self).wallet_metadata(wallet_address)
    }
}

/// HTTP client for `GET /wallet-metadata?walletAddress=<addr>`
pub struct HttpMetadataStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataStore {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl MetadataStore for HttpMetadataStore {
    async fn wallet_metadata(
        &self,
        wallet_address: &str,
    ) -> Result<Option<Vec<WalletKeyRecord>>, StoreError> {
        let url = format!("{}/wallet-metadata", self.base_url);
        log::debug!("GET {}?walletAddress={}", url, wallet_address);

        let response = self
            .client
            .get(&url)
            .query(&[("walletAddress", wallet_address)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            log::debug!("No wallet metadata for {}", wallet_address);
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: MetadataResponse =
            serde_json::from_str(&body).map_err(|e| StoreError::Malformed(e.to_string()))?;

        Ok(Some(parsed.into_records()))
    }
}
