/// External collaborators
///
/// The wallet connector and the vault SDK are black boxes; their errors are
/// plain strings because they are shown to the user verbatim.

use std::future::Future;

use crate::chain::ChainId;

/// Wallet connector (provider discovery and request plumbing live elsewhere)
pub trait WalletConnector: Send + Sync + 'static {
    /// Ask the wallet to switch its active network
    fn switch_chain(&self, chain: ChainId) -> impl Future<Output = Result<(), String>> + Send;
}

/// Cryptographic vault SDK
pub trait VaultEngine: Send + Sync + 'static {
    /// Global startup finished and vault key material exists
    fn is_started(&self) -> bool;

    /// Persist completion metadata so later sessions short-circuit through the oracle
    fn persist_completion(
        &self,
        wallet_address: &str,
        chain: ChainId,
    ) -> impl Future<Output = Result<(), String>> + Send;
}
