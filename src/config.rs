/// Readiness configuration from environment variables
///
/// Controls the metadata store endpoint, oracle retry policy, confirmation
/// polling and the supported network table.

use std::env;
use std::time::Duration;

use crate::chain::SupportedChains;

#[derive(Clone, Debug)]
pub struct ReadinessConfig {
    /// Wallet metadata store base URL
    pub metadata_url: String,
    /// Oracle attempts before an inconclusive answer degrades to NotReady
    pub oracle_max_attempts: u32,
    /// Linear backoff unit between oracle attempts
    pub oracle_backoff: Duration,
    /// Delay between post-scan confirmation checks
    pub confirm_interval: Duration,
    /// Confirmation checks issued per ScanComplete
    pub confirm_attempts: u32,
    /// Auto-dismiss delay for a displayed Ready modal (None disables)
    pub ready_auto_clear: Option<Duration>,
    /// Lifecycle event bus capacity per listener
    pub event_bus_capacity: usize,
    /// Networks the vault can be used on
    pub supported_chains: SupportedChains,
}

impl ReadinessConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `METADATA_API_URL`: metadata store endpoint
    /// - `ORACLE_MAX_ATTEMPTS`, `ORACLE_BACKOFF_MS`: oracle retry policy
    /// - `CONFIRM_INTERVAL_MS`, `CONFIRM_ATTEMPTS`: post-scan confirmation polling
    /// - `READY_AUTO_CLEAR_MS`: `0` keeps the Ready modal until dismissed
    /// - `EVENT_BUS_CAPACITY`: lifecycle bus buffer
    /// - `SUPPORTED_CHAINS`: `id:Name,id:Name`
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let metadata_url = env::var("METADATA_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                log::info!("Metadata store URL: {} (default)", defaults.metadata_url);
                defaults.metadata_url.clone()
            });

        let supported_chains = match env::var("SUPPORTED_CHAINS") {
            Ok(raw) => match SupportedChains::parse_list(&raw) {
                Ok(chains) => chains,
                Err(e) => {
                    log::warn!("Ignoring SUPPORTED_CHAINS ({}), using defaults", e);
                    defaults.supported_chains.clone()
                }
            },
            Err(_) => defaults.supported_chains.clone(),
        };

        let ready_auto_clear = match env_number::<u64>("READY_AUTO_CLEAR_MS") {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.ready_auto_clear,
        };

        let config = Self {
            metadata_url,
            oracle_max_attempts: env_number("ORACLE_MAX_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.oracle_max_attempts),
            oracle_backoff: env_number("ORACLE_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.oracle_backoff),
            confirm_interval: env_number("CONFIRM_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.confirm_interval),
            confirm_attempts: env_number("CONFIRM_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.confirm_attempts),
            ready_auto_clear,
            event_bus_capacity: env_number("EVENT_BUS_CAPACITY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.event_bus_capacity),
            supported_chains,
        };

        log::info!(
            "Readiness config: store={}, oracle_attempts={}, backoff={}ms, chains={}",
            config.metadata_url,
            config.oracle_max_attempts,
            config.oracle_backoff.as_millis(),
            config.supported_chains.len()
        );
        config
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("⚠️  Invalid value for {}: '{}', using default", key, raw);
            None
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            metadata_url: "http://localhost:3000".to_string(),
            oracle_max_attempts: 3,
            oracle_backoff: Duration::from_millis(300),
            confirm_interval: Duration::from_millis(1500),
            confirm_attempts: 20,
            ready_auto_clear: Some(Duration::from_secs(4)),
            event_bus_capacity: 256,
            supported_chains: SupportedChains::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;

    #[test]
    fn test_default_retry_policy() {
        let config = ReadinessConfig::default();
        assert_eq!(config.oracle_max_attempts, 3);
        assert_eq!(config.oracle_backoff, Duration::from_millis(300));
    }

    #[test]
    fn test_default_chains() {
        let config = ReadinessConfig::default();
        assert!(config.supported_chains.contains(ChainId(1)));
        assert!(config.supported_chains.contains(ChainId(137)));
    }
}
