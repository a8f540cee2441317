//! Chain-switch coordinator
//!
//! Single entry point for every trigger that may need the initialization UI:
//! initial connect, reconnect, manual network switch. Each one goes through
//! [`OrchestratorHandle::evaluate`], which performs a fresh oracle check
//! before arming anything.

use std::sync::Arc;

use crate::chain::{ChainId, SupportedChains};
use crate::collaborators::{VaultEngine, WalletConnector};
use crate::error::CoordinatorError;
use crate::machine::GateTrigger;
use crate::modal::ModalController;
use crate::orchestrator::{EvaluationOutcome, OrchestratorHandle};
use crate::session::WalletSession;

pub struct ChainSwitchCoordinator<C, V> {
    connector: Arc<C>,
    vault: Arc<V>,
    orchestrator: OrchestratorHandle,
    modal: ModalController<V>,
    chains: SupportedChains,
    session: Option<WalletSession>,
}

impl<C: WalletConnector, V: VaultEngine> ChainSwitchCoordinator<C, V> {
    pub fn new(
        connector: Arc<C>,
        vault: Arc<V>,
        orchestrator: OrchestratorHandle,
        modal: ModalController<V>,
        chains: SupportedChains,
    ) -> Self {
        Self {
            connector,
            vault,
            orchestrator,
            modal,
            chains,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&WalletSession> {
        self.session.as_ref()
    }

    pub fn modal(&self) -> &ModalController<V> {
        &self.modal
    }

    pub fn modal_mut(&mut self) -> &mut ModalController<V> {
        &mut self.modal
    }

    pub fn orchestrator(&self) -> &OrchestratorHandle {
        &self.orchestrator
    }

    /// Initial connection: the modal only opens if the network needs initializing
    pub async fn connect(&mut self, session: WalletSession) -> Result<EvaluationOutcome, CoordinatorError> {
        self.start_session(session, false).await
    }

    /// Reconnect of a known wallet: the modal opens before the oracle answers
    pub async fn reconnect(&mut self, session: WalletSession) -> Result<EvaluationOutcome, CoordinatorError> {
        self.start_session(session, true).await
    }

    /// Vault keys were derived for the connected wallet
    pub async fn set_vault_wallet_id(&mut self, vault_wallet_id: String) -> Result<(), CoordinatorError> {
        let session = self.session.as_mut().ok_or(CoordinatorError::NotConnected)?;
        session.vault_wallet_id = Some(vault_wallet_id);
        self.orchestrator.set_session(Some(session.clone())).await
    }

    pub async fn disconnect(&mut self) -> Result<(), CoordinatorError> {
        if let Some(session) = self.session.take() {
            log::info!("Disconnecting wallet {} (session {})", session.address, session.id);
        }
        self.modal.set_wallet(None);
        self.orchestrator.set_session(None).await
    }

    /// Switch the wallet to `chain` and re-evaluate readiness there
    pub async fn switch_to(&mut self, chain: ChainId) -> Result<EvaluationOutcome, CoordinatorError> {
        if !self.vault.is_started() {
            log::warn!("Network switch to {} rejected: vault engine still starting", chain);
            return Err(CoordinatorError::SwitchRejected);
        }
        let Some(current) = self.session.clone() else {
            return Err(CoordinatorError::NotConnected);
        };
        if !self.chains.contains(chain) {
            log::warn!("Network switch to unsupported chain {}", chain);
            return Err(CoordinatorError::UnsupportedChain(chain));
        }

        log::info!(
            "Switching {} from {} to {}",
            current.address,
            self.chains.label(current.chain_id),
            self.chains.label(chain)
        );
        self.connector.switch_chain(chain).await.map_err(|e| {
            log::warn!("Network switch to {} failed: {}", chain, e);
            CoordinatorError::SwitchFailed(e)
        })?;

        // The provider may still report the old network for a moment; readiness
        // is evaluated for the requested one.
        let updated = current.with_chain(chain);
        self.orchestrator.set_session(Some(updated.clone())).await?;
        self.session = Some(updated);

        let outcome = self.orchestrator.evaluate(chain, GateTrigger::Switch).await?;
        log::info!("Readiness on {} after switch: {:?}", self.chains.label(chain), outcome);
        self.modal.sync();
        Ok(outcome)
    }

    async fn start_session(
        &mut self,
        session: WalletSession,
        eager: bool,
    ) -> Result<EvaluationOutcome, CoordinatorError> {
        let chain = session.chain_id;
        log::info!(
            "Wallet {} connected on {} (session {})",
            session.address,
            self.chains.label(chain),
            session.id
        );

        self.orchestrator.set_session(Some(session.clone())).await?;
        self.modal.set_wallet(Some(session.address.clone()));
        self.session = Some(session);

        if eager {
            self.modal.open_eager();
        }

        let outcome = self.orchestrator.evaluate(chain, GateTrigger::Connect).await?;
        self.modal.resolve_eager(outcome);
        Ok(outcome)
    }
}
