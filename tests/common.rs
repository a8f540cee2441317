//! Common test utilities for readiness integration tests
//!
//! Spawns the wallet metadata mock in-process and provides scripted wallet
//! connector and vault engine doubles.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metadata_mock::MemoryStore;
use tokio::task::JoinHandle;
use vault_readiness::{
    start, ChainId, ChainSwitchCoordinator, EventBus, ReadinessConfig, ReadinessSnapshot,
    VaultEngine, WalletConnector,
};

pub const WALLET: &str = "0x9f2B6e1c0A7d4E3b5C8a1F0e2D4c6B8a0E1f3A5c";
pub const VAULT_ID: &str = "vault-7f3c";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Metadata mock plus a wired coordinator
pub struct TestEnvironment {
    pub store: Arc<MemoryStore>,
    pub bus: EventBus,
    pub coordinator: ChainSwitchCoordinator<FakeConnector, FakeVault>,
    pub connector: Arc<FakeConnector>,
    pub vault: Arc<FakeVault>,
    server: JoinHandle<()>,
}

impl TestEnvironment {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut ReadinessConfig)) -> anyhow::Result<Self> {
        init_logging();

        let store = Arc::new(MemoryStore::new());
        let (addr, server) = metadata_mock::spawn_local(store.clone()).await?;
        log::info!("🧪 Metadata mock on {}", addr);

        let mut config = ReadinessConfig {
            metadata_url: format!("http://{}", addr),
            oracle_backoff: Duration::from_millis(20),
            confirm_interval: Duration::from_millis(25),
            confirm_attempts: 80,
            ready_auto_clear: None,
            ..ReadinessConfig::default()
        };
        adjust(&mut config);

        let connector = Arc::new(FakeConnector::default());
        let vault = Arc::new(FakeVault::new(store.clone()));
        let (bus, coordinator) = start(&config, connector.clone(), vault.clone())?;

        Ok(Self {
            store,
            bus,
            coordinator,
            connector,
            vault,
            server,
        })
    }

    /// Record a finished scan of `chain` for the test wallet, as the SDK would
    pub fn mark_synced(&self, chain: u64) {
        self.store
            .mark_scanned(WALLET, VAULT_ID, serde_json::json!(chain));
    }

    /// Wait (bounded) for a snapshot matching `predicate`
    pub async fn wait_for<F>(&self, predicate: F) -> ReadinessSnapshot
    where
        F: FnMut(&ReadinessSnapshot) -> bool,
    {
        tokio::time::timeout(
            Duration::from_secs(10),
            self.coordinator.orchestrator().wait_for(predicate),
        )
        .await
        .expect("timed out waiting for readiness state")
        .expect("orchestrator stopped")
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Wallet connector whose switch outcome is scripted
#[derive(Default)]
pub struct FakeConnector {
    failure: Mutex<Option<String>>,
    switches: Mutex<Vec<ChainId>>,
}

impl FakeConnector {
    pub fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn switches(&self) -> Vec<ChainId> {
        self.switches.lock().unwrap().clone()
    }
}

impl WalletConnector for FakeConnector {
    async fn switch_chain(&self, chain: ChainId) -> Result<(), String> {
        if let Some(message) = self.failure.lock().unwrap().take() {
            return Err(message);
        }
        self.switches.lock().unwrap().push(chain);
        Ok(())
    }
}

/// Vault engine persisting completion into the metadata mock
pub struct FakeVault {
    started: AtomicBool,
    store: Arc<MemoryStore>,
    persisted: Mutex<Vec<(String, ChainId)>>,
}

impl FakeVault {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            started: AtomicBool::new(true),
            store,
            persisted: Mutex::new(Vec::new()),
        }
    }

    pub fn set_started(&self, started: bool) {
        self.started.store(started, Ordering::SeqCst);
    }

    pub fn persisted(&self) -> Vec<(String, ChainId)> {
        self.persisted.lock().unwrap().clone()
    }
}

impl VaultEngine for FakeVault {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    async fn persist_completion(&self, wallet_address: &str, chain: ChainId) -> Result<(), String> {
        self.store
            .mark_scanned(wallet_address, VAULT_ID, serde_json::json!(chain.as_u64()));
        self.persisted
            .lock()
            .unwrap()
            .push((wallet_address.to_string(), chain));
        Ok(())
    }
}
