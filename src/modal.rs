//! Modal lifecycle controller
//!
//! Presentation facade over the orchestrator snapshot. The controller owns
//! whether the modal is shown; it never mutates initialization state and
//! only asks the orchestrator to close a modal lifetime.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::chain::ChainId;
use crate::collaborators::VaultEngine;
use crate::error::CoordinatorError;
use crate::orchestrator::{EvaluationOutcome, OrchestratorHandle};
use crate::state::{InitPhase, ReadinessSnapshot};

/// The four mutually exclusive render states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModalView {
    AwaitingSignature,
    Bootstrapping,
    Failed,
    Ready,
}

impl ModalView {
    pub fn from_snapshot(snapshot: &ReadinessSnapshot) -> Self {
        if snapshot.state.failure.is_some() || snapshot.phase() == InitPhase::Failed {
            return ModalView::Failed;
        }
        match snapshot.phase() {
            InitPhase::Ready => ModalView::Ready,
            InitPhase::Scanning | InitPhase::Bootstrapping => ModalView::Bootstrapping,
            _ => ModalView::AwaitingSignature,
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Clone, Debug, PartialEq)]
pub struct ModalRender {
    pub view: ModalView,
    pub message: String,
    pub percent: f64,
    pub chain: Option<ChainId>,
    pub error: Option<String>,
}

pub struct ModalController<V> {
    orchestrator: OrchestratorHandle,
    snapshots: watch::Receiver<ReadinessSnapshot>,
    vault: Arc<V>,
    wallet_address: Option<String>,
    visible: bool,
    /// Opened before the first oracle answer
    eager: bool,
    ready_since: Option<Instant>,
    persisted_lifetime: Option<u64>,
    /// Lifetime the user closed; its snapshots may still be in flight
    closed_lifetime: Option<u64>,
    auto_clear: Option<Duration>,
}

impl<V: VaultEngine> ModalController<V> {
    pub fn new(orchestrator: OrchestratorHandle, vault: Arc<V>, auto_clear: Option<Duration>) -> Self {
        let snapshots = orchestrator.subscribe();
        Self {
            orchestrator,
            snapshots,
            vault,
            wallet_address: None,
            visible: false,
            eager: false,
            ready_since: None,
            persisted_lifetime: None,
            closed_lifetime: None,
            auto_clear,
        }
    }

    pub(crate) fn set_wallet(&mut self, wallet_address: Option<String>) {
        if self.wallet_address != wallet_address {
            self.wallet_address = wallet_address;
            self.hide();
        }
    }

    /// Show the modal before readiness is known (reconnect path)
    pub fn open_eager(&mut self) {
        log::debug!("Opening readiness modal eagerly");
        self.visible = true;
        self.eager = true;
    }

    /// Settle an eager open once the oracle answered
    pub(crate) fn resolve_eager(&mut self, outcome: EvaluationOutcome) {
        self.eager = false;
        if outcome != EvaluationOutcome::Armed && self.current().phase() == InitPhase::Idle {
            self.hide();
        }
        self.sync();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Dismissal is refused while signing or bootstrapping is on screen
    pub fn is_locked(&self) -> bool {
        matches!(
            self.view(),
            Some(ModalView::AwaitingSignature | ModalView::Bootstrapping)
        )
    }

    pub fn view(&self) -> Option<ModalView> {
        self.visible
            .then(|| ModalView::from_snapshot(&self.current()))
    }

    pub fn render(&self) -> Option<ModalRender> {
        if !self.visible {
            return None;
        }
        let snapshot = self.current();
        Some(ModalRender {
            view: ModalView::from_snapshot(&snapshot),
            message: snapshot.state.message.clone(),
            percent: snapshot.progress.percent,
            chain: snapshot.state.initializing_chain_id,
            error: snapshot.state.failure.clone(),
        })
    }

    /// Pull the latest snapshot and update visibility
    pub fn sync(&mut self) -> Option<ModalView> {
        let snapshot = self.snapshots.borrow_and_update().clone();
        let closed = self.closed_lifetime == Some(snapshot.modal_lifetime);

        if snapshot.phase() != InitPhase::Idle && !closed {
            if !self.visible {
                log::debug!("Opening readiness modal for {:?}", snapshot.phase());
            }
            self.visible = true;
            self.eager = false;
        } else if self.visible && !self.eager {
            log::debug!("Initialization returned to idle, hiding modal");
            self.hide();
        }

        if self.visible && snapshot.phase() == InitPhase::Ready {
            self.ready_since.get_or_insert_with(Instant::now);
        } else {
            self.ready_since = None;
        }

        self.view()
    }

    /// User dismissal; returns whether the modal closed
    pub async fn dismiss(&mut self) -> Result<bool, CoordinatorError> {
        self.sync();
        let snapshot = self.current();

        match self.view() {
            None => Ok(false),
            Some(ModalView::Ready) => {
                self.persist_once(&snapshot).await;
                self.close(snapshot.modal_lifetime).await?;
                Ok(true)
            }
            Some(ModalView::Failed) => {
                self.close(snapshot.modal_lifetime).await?;
                Ok(true)
            }
            Some(view) => {
                log::debug!("Modal locked in {:?}, dismissal ignored", view);
                Ok(false)
            }
        }
    }

    /// Dismiss a displayed Ready once the auto-clear delay elapsed
    pub async fn auto_clear_if_due(&mut self) -> Result<bool, CoordinatorError> {
        self.sync();
        match self.auto_clear_deadline() {
            Some(deadline) if Instant::now() >= deadline => {
                log::debug!("Auto-clearing Ready modal");
                self.dismiss().await
            }
            _ => Ok(false),
        }
    }

    /// Wait for the next state change (or auto-clear) and return the new view
    pub async fn next_change(&mut self) -> Result<Option<ModalView>, CoordinatorError> {
        match self.auto_clear_deadline() {
            Some(deadline) => {
                tokio::select! {
                    changed = self.snapshots.changed() => {
                        changed.map_err(|_| CoordinatorError::OrchestratorClosed)?;
                    }
                    _ = tokio::time::sleep_until(deadline) => {
                        self.auto_clear_if_due().await?;
                    }
                }
            }
            None => {
                self.snapshots
                    .changed()
                    .await
                    .map_err(|_| CoordinatorError::OrchestratorClosed)?;
            }
        }
        Ok(self.sync())
    }

    fn auto_clear_deadline(&self) -> Option<Instant> {
        Some(self.ready_since? + self.auto_clear?)
    }

    async fn persist_once(&mut self, snapshot: &ReadinessSnapshot) {
        if self.persisted_lifetime == Some(snapshot.modal_lifetime) {
            return;
        }
        self.persisted_lifetime = Some(snapshot.modal_lifetime);

        let (Some(address), Some(chain)) =
            (self.wallet_address.as_deref(), snapshot.state.initializing_chain_id)
        else {
            log::warn!("Ready dismissed without a wallet or network, nothing to persist");
            return;
        };

        match self.vault.persist_completion(address, chain).await {
            Ok(()) => log::info!("Persisted completion for chain {}", chain),
            Err(e) => log::warn!("Failed to persist completion for chain {}: {}", chain, e),
        }
    }

    async fn close(&mut self, lifetime: u64) -> Result<(), CoordinatorError> {
        self.hide();
        self.closed_lifetime = Some(lifetime);
        self.orchestrator.close_modal(lifetime).await
    }

    fn hide(&mut self) {
        self.visible = false;
        self.eager = false;
        self.ready_since = None;
    }

    fn current(&self) -> ReadinessSnapshot {
        self.snapshots.borrow().clone()
    }
}
