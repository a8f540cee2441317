//! Initialization and progress state values
//!
//! These are owned by [`crate::machine::InitStateMachine`]; everything else
//! only sees them through [`ReadinessSnapshot`].

use serde::Serialize;

use crate::chain::ChainId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum InitPhase {
    Idle,
    AwaitingSignature,
    Scanning,
    Bootstrapping,
    Ready,
    Failed,
}

impl InitPhase {
    /// Initialization is underway and not yet terminal
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            InitPhase::AwaitingSignature | InitPhase::Scanning | InitPhase::Bootstrapping
        )
    }
}

pub(crate) mod messages {
    pub const IDLE: &str = "";
    pub const AWAITING_SIGNATURE: &str = "Sign the message in your wallet to unlock your private vault";
    pub const SCANNING: &str = "Scanning chain history…";
    pub const SYNCING: &str = "Syncing private balances…";
    pub const CREATING: &str = "Creating your private wallet…";
    pub const CONFIRMING: &str = "Confirming vault sync…";
    pub const FINALIZING: &str = "Finalizing…";
    pub const READY: &str = "Private vault ready";
    pub const FAILED: &str = "Vault initialization failed";
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InitializationState {
    pub phase: InitPhase,
    /// Human-readable status line
    pub message: String,
    /// Set only in `Failed`, verbatim from the SDK
    pub failure: Option<String>,
    /// Network being initialized; may lag or lead the wallet's live network
    pub initializing_chain_id: Option<ChainId>,
}

impl InitializationState {
    pub fn idle() -> Self {
        Self {
            phase: InitPhase::Idle,
            message: messages::IDLE.to_string(),
            failure: None,
            initializing_chain_id: None,
        }
    }
}

impl Default for InitializationState {
    fn default() -> Self {
        Self::idle()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ProgressState {
    /// 0–100
    pub percent: f64,
    pub active: bool,
}

impl ProgressState {
    pub fn inactive() -> Self {
        Self {
            percent: 0.0,
            active: false,
        }
    }

    pub fn started() -> Self {
        Self {
            percent: 0.0,
            active: true,
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Read-only view of the state machine published to the controller and coordinator
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReadinessSnapshot {
    pub state: InitializationState,
    pub progress: ProgressState,
    /// Percent reached 100 in this modal lifetime
    pub completion_locked: bool,
    /// Bumped on every wallet address change
    pub session_epoch: u64,
    /// Bumped whenever a new modal lifetime starts or the modal is closed
    pub modal_lifetime: u64,
    pub initial_connect_done: bool,
}

impl ReadinessSnapshot {
    pub fn phase(&self) -> InitPhase {
        self.state.phase
    }
}

impl Default for ReadinessSnapshot {
    fn default() -> Self {
        Self {
            state: InitializationState::idle(),
            progress: ProgressState::inactive(),
            completion_locked: false,
            session_epoch: 0,
            modal_lifetime: 0,
            initial_connect_done: false,
        }
    }
}
