//! Error types for readiness orchestration
//!
//! Oracle failures never reach the user: a [`StoreError`] is folded into an
//! `Inconclusive` verdict and retried. Only [`CoordinatorError::SwitchFailed`]
//! and the SDK-reported `InitFailed` event are meant to be shown.

use thiserror::Error;

use crate::chain::ChainId;

/// Failure talking to the wallet metadata store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Metadata store unreachable: {0}")]
    Transport(String),

    #[error("Metadata store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed metadata response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Malformed(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Failure of a connect / switch request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// The vault engine has not derived its key material yet
    #[error("Vault is still starting up, try switching networks again in a moment")]
    SwitchRejected,

    /// Connector error, carried verbatim
    #[error("{0}")]
    SwitchFailed(String),

    #[error("Network {0} is not supported")]
    UnsupportedChain(ChainId),

    #[error("No wallet connected")]
    NotConnected,

    #[error("Readiness orchestrator has shut down")]
    OrchestratorClosed,
}

impl CoordinatorError {
    /// Whether the error should surface as a user notification
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            CoordinatorError::SwitchFailed(_)
                | CoordinatorError::SwitchRejected
                | CoordinatorError::UnsupportedChain(_)
        )
    }
}
