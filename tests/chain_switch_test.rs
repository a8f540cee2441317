//! Network switch tests
//!
//! Switching re-runs the readiness gate for the new network and surfaces
//! connector errors verbatim.

mod common;

use common::{TestEnvironment, VAULT_ID, WALLET};
use std::time::Duration;
use vault_readiness::{
    ChainId, CoordinatorError, EvaluationOutcome, InitPhase, LifecycleEvent, ModalView,
    WalletSession,
};

async fn connected_on_ethereum() -> anyhow::Result<TestEnvironment> {
    let mut env = TestEnvironment::new().await?;
    env.mark_synced(1);
    let outcome = env
        .coordinator
        .connect(WalletSession::new(WALLET, ChainId(1), Some(VAULT_ID.into())))
        .await?;
    assert_eq!(outcome, EvaluationOutcome::AlreadyReady);
    Ok(env)
}

#[tokio::test]
async fn test_switch_to_unsynced_chain_arms_initialization() -> anyhow::Result<()> {
    let mut env = connected_on_ethereum().await?;

    let outcome = env.coordinator.switch_to(ChainId(137)).await?;

    assert_eq!(outcome, EvaluationOutcome::Armed);
    assert_eq!(env.connector.switches(), vec![ChainId(137)]);
    assert_eq!(env.coordinator.session().map(|s| s.chain_id), Some(ChainId(137)));

    let snapshot = env.coordinator.orchestrator().snapshot();
    assert_eq!(snapshot.phase(), InitPhase::AwaitingSignature);
    assert_eq!(snapshot.state.initializing_chain_id, Some(ChainId(137)));
    assert_eq!(env.coordinator.modal().view(), Some(ModalView::AwaitingSignature));

    // Progress from the previous network is stale
    env.bus.publish(LifecycleEvent::BootstrapProgress {
        chain_id: ChainId(1),
        percent: 50.0,
    });
    env.bus.publish(LifecycleEvent::InitStarted { chain_id: ChainId(137) });
    env.wait_for(|s| s.phase() == InitPhase::Scanning).await;
    assert_eq!(env.coordinator.orchestrator().snapshot().progress.percent, 0.0);

    env.bus.publish(LifecycleEvent::BootstrapProgress {
        chain_id: ChainId(137),
        percent: 30.0,
    });
    let snapshot = env.wait_for(|s| s.progress.percent == 30.0).await;
    assert_eq!(snapshot.phase(), InitPhase::Bootstrapping);
    Ok(())
}

#[tokio::test]
async fn test_switch_to_synced_chain_stays_silent() -> anyhow::Result<()> {
    let mut env = connected_on_ethereum().await?;
    env.mark_synced(8453);

    let outcome = env.coordinator.switch_to(ChainId(8453)).await?;

    assert_eq!(outcome, EvaluationOutcome::AlreadyReady);
    assert!(!env.coordinator.modal().is_visible());
    assert_eq!(env.coordinator.orchestrator().snapshot().phase(), InitPhase::Idle);
    Ok(())
}

#[tokio::test]
async fn test_hydrated_chain_counts_as_ready() -> anyhow::Result<()> {
    let mut env = connected_on_ethereum().await?;
    let mut record = metadata_mock::WalletKeyRecord::new(VAULT_ID);
    record.scanned_chains.push(serde_json::json!(1));
    record.hydrated_chains.push(serde_json::json!("0xa4b1"));
    env.store.upsert(WALLET, record);

    let outcome = env.coordinator.switch_to(ChainId(42161)).await?;
    assert_eq!(outcome, EvaluationOutcome::AlreadyReady);
    Ok(())
}

#[tokio::test]
async fn test_switch_rejected_while_vault_starting() -> anyhow::Result<()> {
    let mut env = connected_on_ethereum().await?;
    env.vault.set_started(false);

    let err = env.coordinator.switch_to(ChainId(137)).await.unwrap_err();

    assert_eq!(err, CoordinatorError::SwitchRejected);
    assert!(err.is_user_visible());
    assert!(env.connector.switches().is_empty());
    assert_eq!(env.coordinator.session().map(|s| s.chain_id), Some(ChainId(1)));
    Ok(())
}

#[tokio::test]
async fn test_connector_error_is_surfaced_verbatim() -> anyhow::Result<()> {
    let mut env = connected_on_ethereum().await?;
    env.connector.fail_next("User rejected the request.");

    let err = env.coordinator.switch_to(ChainId(56)).await.unwrap_err();

    assert_eq!(err.to_string(), "User rejected the request.");
    assert!(err.is_user_visible());
    assert_eq!(env.coordinator.session().map(|s| s.chain_id), Some(ChainId(1)));
    assert_eq!(env.coordinator.orchestrator().snapshot().phase(), InitPhase::Idle);
    Ok(())
}

#[tokio::test]
async fn test_unsupported_chain_is_refused() -> anyhow::Result<()> {
    let mut env = connected_on_ethereum().await?;

    let err = env.coordinator.switch_to(ChainId(10)).await.unwrap_err();

    assert_eq!(err, CoordinatorError::UnsupportedChain(ChainId(10)));
    assert!(env.connector.switches().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_switch_without_session() -> anyhow::Result<()> {
    let mut env = TestEnvironment::new().await?;

    let err = env.coordinator.switch_to(ChainId(137)).await.unwrap_err();
    assert_eq!(err, CoordinatorError::NotConnected);
    Ok(())
}

#[tokio::test]
async fn test_switch_back_mid_initialization() -> anyhow::Result<()> {
    let mut env = connected_on_ethereum().await?;
    env.coordinator.switch_to(ChainId(137)).await?;
    env.bus.publish(LifecycleEvent::InitStarted { chain_id: ChainId(137) });
    let scanning = env.wait_for(|s| s.phase() == InitPhase::Scanning).await;

    let outcome = env.coordinator.switch_to(ChainId(1)).await?;
    assert_eq!(outcome, EvaluationOutcome::AlreadyReady);

    // Switching to a synced network leaves the running lifetime alone
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = env.coordinator.orchestrator().snapshot();
    assert_eq!(snapshot.modal_lifetime, scanning.modal_lifetime);
    assert_eq!(snapshot.state.initializing_chain_id, Some(ChainId(137)));
    Ok(())
}
