//! Vault Readiness: per-network initialization orchestration for a privacy vault
//!
//! Decides, for a connected wallet and network, whether the vault already
//! finished its one-time backend synchronization, drives the initialization
//! lifecycle when it has not, and reconciles SDK lifecycle events with an
//! eventually-consistent metadata store.
//!
//! # Architecture
//!
//! - **Readiness Oracle**: queries the wallet metadata store, retries inconclusive answers
//! - **Event Bus**: lifecycle notifications published by the vault SDK
//! - **State Machine**: single owner of initialization and progress state
//! - **Orchestrator**: tokio task driving the state machine and oracle checks
//! - **Modal Controller**: maps state onto the four user-visible modal views
//! - **Chain-Switch Coordinator**: connect / reconnect / switch entry points
//!
//! # Example
//!
//! ```ignore
//! use vault_readiness::{start, ChainId, LifecycleEvent, ReadinessConfig, WalletSession};
//!
//! let config = ReadinessConfig::from_env();
//! let (bus, mut coordinator) = start(&config, connector, vault)?;
//!
//! coordinator
//!     .connect(WalletSession::new(address, ChainId(1), Some(vault_wallet_id)))
//!     .await?;
//!
//! // The vault SDK publishes its progress on the bus
//! bus.publish(LifecycleEvent::InitStarted { chain_id: ChainId(1) });
//! ```

pub mod chain;
pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod machine;
pub mod modal;
pub mod oracle;
pub mod orchestrator;
pub mod session;
pub mod state;

use std::sync::Arc;

pub use chain::{ChainId, SupportedChains};
pub use collaborators::{VaultEngine, WalletConnector};
pub use config::ReadinessConfig;
pub use coordinator::ChainSwitchCoordinator;
pub use error::{CoordinatorError, StoreError};
pub use events::{EventBus, EventListener, LifecycleEvent};
pub use machine::{GateTrigger, InitStateMachine};
pub use modal::{ModalController, ModalRender, ModalView};
pub use oracle::{HttpMetadataStore, MetadataStore, Readiness, ReadinessOracle, RetryPolicy};
pub use orchestrator::{EvaluationOutcome, Orchestrator, OrchestratorHandle};
pub use session::WalletSession;
pub use state::{InitPhase, InitializationState, ProgressState, ReadinessSnapshot};

/// Wire up bus, orchestrator, modal controller and coordinator over `store`
///
/// Spawns the orchestrator task, so it must be called inside a tokio runtime.
pub fn start_with_store<S, C, V>(
    config: &ReadinessConfig,
    store: S,
    connector: Arc<C>,
    vault: Arc<V>,
) -> (EventBus, ChainSwitchCoordinator<C, V>)
where
    S: MetadataStore,
    C: WalletConnector,
    V: VaultEngine,
{
    let bus = EventBus::new(config.event_bus_capacity);
    let oracle = Arc::new(ReadinessOracle::new(store, RetryPolicy::from(config)));
    let orchestrator = Orchestrator::spawn(oracle, &bus, config);
    let modal = ModalController::new(orchestrator.clone(), vault.clone(), config.ready_auto_clear);
    let coordinator = ChainSwitchCoordinator::new(
        connector,
        vault,
        orchestrator,
        modal,
        config.supported_chains.clone(),
    );
    (bus, coordinator)
}

/// [`start_with_store`] against the HTTP metadata store at `config.metadata_url`
pub fn start<C, V>(
    config: &ReadinessConfig,
    connector: Arc<C>,
    vault: Arc<V>,
) -> Result<(EventBus, ChainSwitchCoordinator<C, V>), StoreError>
where
    C: WalletConnector,
    V: VaultEngine,
{
    let store = HttpMetadataStore::new(&config.metadata_url)?;
    Ok(start_with_store(config, store, connector, vault))
}
