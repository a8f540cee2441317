//! Readiness oracle
//!
//! Answers "has this wallet finished initializing on this network?" from the
//! remote metadata store. The store is eventually consistent, so a single
//! answer may be inconclusive; callers go through [`ReadinessOracle::check_with_retry`]
//! which never yields `Inconclusive` and degrades toward `NotReady`.

pub mod store;
pub mod types;

use std::time::Duration;

pub use store::{HttpMetadataStore, MetadataStore};
pub use types::{ChainIdValue, MetadataResponse, WalletKeyRecord};

use crate::chain::ChainId;
use crate::config::ReadinessConfig;

/// Oracle verdict for one (wallet, network) pair
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Readiness {
    Ready,
    NotReady,
    Inconclusive,
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Bounded linear backoff for inconclusive answers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Wait before attempt `attempt + 1`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(300),
        }
    }
}

impl From<&ReadinessConfig> for RetryPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            max_attempts: config.oracle_max_attempts.max(1),
            backoff: config.oracle_backoff,
        }
    }
}

/// Verdict for `chain` given the records stored under the wallet address
///
/// Records are matched by vault wallet id; several records may share one
/// address after the vault keys were regenerated.
pub fn readiness_from_records(
    records: &[WalletKeyRecord],
    vault_wallet_id: Option<&str>,
    chain: ChainId,
) -> Readiness {
    let Some(wallet_id) = vault_wallet_id else {
        return Readiness::NotReady;
    };

    match records.iter().find(|record| record.wallet_id == wallet_id) {
        Some(record) if record.is_ready_on(chain) => Readiness::Ready,
        _ => Readiness::NotReady,
    }
}

pub struct ReadinessOracle<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: MetadataStore> ReadinessOracle<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Single uncached lookup
    pub async fn check_ready(
        &self,
        wallet_address: &str,
        vault_wallet_id: Option<&str>,
        chain: ChainId,
    ) -> Readiness {
        match self.store.wallet_metadata(wallet_address).await {
            Ok(None) => {
                log::debug!("No metadata record for {}, chain {} not ready", wallet_address, chain);
                Readiness::NotReady
            }
            Ok(Some(records)) => {
                let verdict = readiness_from_records(&records, vault_wallet_id, chain);
                log::debug!(
                    "Chain {} for {} ({} record(s)): {:?}",
                    chain,
                    wallet_address,
                    records.len(),
                    verdict
                );
                verdict
            }
            Err(e) => {
                log::warn!("Readiness check for chain {} inconclusive: {}", chain, e);
                Readiness::Inconclusive
            }
        }
    }

    /// Lookup with bounded retries on inconclusive answers
    ///
    /// Returns `None` as soon as `still_relevant` reports the request was
    /// superseded (session changed). Never returns `Inconclusive`: the last
    /// inconclusive attempt is reported as `NotReady` so the initialization
    /// UI is shown rather than silently skipped.
    pub async fn check_with_retry<F>(
        &self,
        wallet_address: &str,
        vault_wallet_id: Option<&str>,
        chain: ChainId,
        still_relevant: F,
    ) -> Option<Readiness>
    where
        F: Fn() -> bool,
    {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if !still_relevant() {
                log::debug!("Readiness check for chain {} superseded before attempt {}", chain, attempt);
                return None;
            }

            let verdict = self.check_ready(wallet_address, vault_wallet_id, chain).await;

            if !still_relevant() {
                log::debug!("Discarding readiness answer for chain {} (session changed)", chain);
                return None;
            }

            match verdict {
                Readiness::Ready | Readiness::NotReady => return Some(verdict),
                Readiness::Inconclusive if attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    log::debug!(
                        "Retrying readiness check for chain {} in {:?} (attempt {}/{})",
                        chain,
                        delay,
                        attempt + 1,
                        max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                Readiness::Inconclusive => {}
            }
        }

        log::warn!(
            "Readiness for chain {} still inconclusive after {} attempts, treating as not ready",
            chain,
            max_attempts
        );
        Some(Readiness::NotReady)
    }
}
