/// Axum HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::store::MemoryStore;

pub fn create_router(store: Arc<MemoryStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/wallet-metadata",
            get(get_wallet_metadata).put(upsert_wallet_metadata),
        )
        .route("/wallet-metadata/mark-scanned", post(mark_scanned))
        // Test helpers
        .route("/faults", post(inject_faults))
        .with_state(store)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(store: Arc<MemoryStore>, host: String, port: u16) -> anyhow::Result<()> {
    let app = create_router(store);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("🚀 Wallet metadata mock listening on http://{}", addr);
    log::info!("💥 Fault injection endpoint: POST /faults");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve `store` on an ephemeral localhost port in the current runtime
pub async fn spawn_local(store: Arc<MemoryStore>) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(store);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("Metadata mock stopped: {}", e);
        }
    });

    log::debug!("Metadata mock serving on http://{}", addr);
    Ok((addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use reqwest::StatusCode;
    use serde_json::json;

    async fn serve(store: Arc<MemoryStore>) -> (String, JoinHandle<()>) {
        let (addr, handle) = spawn_local(store).await.unwrap();
        (format!("http://{}", addr), handle)
    }

    async fn lookup(client: &reqwest::Client, base: &str, wallet: &str) -> reqwest::Response {
        client
            .get(format!("{}/wallet-metadata", base))
            .query(&[("walletAddress", wallet)])
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_lookup_status_codes() {
        let store = Arc::new(MemoryStore::new());
        store.mark_scanned("0xKnown", "vault-1", json!(1));
        let (base, handle) = serve(store.clone()).await;
        let client = reqwest::Client::new();

        assert_eq!(lookup(&client, &base, "0xKnown").await.status(), StatusCode::OK);
        assert_eq!(lookup(&client, &base, "0xknown").await.status(), StatusCode::NOT_FOUND);

        let faults: FaultResponse = client
            .post(format!("{}/faults", base))
            .json(&FaultRequest { count: 1 })
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(faults.pending_failures, 1);

        assert_eq!(
            lookup(&client, &base, "0xKnown").await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(lookup(&client, &base, "0xKnown").await.status(), StatusCode::OK);
        assert_eq!(store.read_count(), 4);
        assert_eq!(store.pending_failures(), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_upsert_then_mark_scanned() {
        let store = Arc::new(MemoryStore::new());
        let (base, handle) = serve(store.clone()).await;
        let client = reqwest::Client::new();

        let mut record = WalletKeyRecord::new("vault-1");
        record.hydrated_chains.push(json!("0x89"));
        let response = client
            .put(format!("{}/wallet-metadata", base))
            .json(&UpsertRecordRequest {
                wallet_address: "0xAbC".into(),
                record,
            })
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let updated: WalletKeyRecord = client
            .post(format!("{}/wallet-metadata/mark-scanned", base))
            .json(&MarkScannedRequest {
                wallet_address: "0xAbC".into(),
                wallet_id: "vault-1".into(),
                chain_id: json!(1),
            })
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(updated.scanned_chains, vec![json!(1)]);
        assert_eq!(updated.hydrated_chains, vec![json!("0x89")]);

        let records: Vec<WalletKeyRecord> =
            lookup(&client, &base, "0xAbC").await.json().await.unwrap();
        assert_eq!(records, vec![updated]);

        handle.abort();
    }

    #[tokio::test]
    async fn test_invalid_writes_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (base, handle) = serve(store.clone()).await;
        let client = reqwest::Client::new();

        let response = client
            .put(format!("{}/wallet-metadata", base))
            .json(&json!({"walletAddress": "0xAbC", "walletId": ""}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = client
            .post(format!("{}/wallet-metadata/mark-scanned", base))
            .json(&json!({"walletAddress": "0xAbC", "walletId": "vault-1", "chainId": [1]}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.records("0xAbC").is_none());

        handle.abort();
    }

    #[tokio::test]
    async fn test_health_reports_counters() {
        let store = Arc::new(MemoryStore::new());
        store.inject_failures(2);
        let (base, handle) = serve(store).await;

        let health: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["pendingFailures"], 2);

        handle.abort();
    }
}
