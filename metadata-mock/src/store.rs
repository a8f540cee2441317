/// In-memory wallet metadata store
///
/// Keys are wallet addresses compared byte-for-byte, like the production
/// key-value store.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::types::WalletKeyRecord;

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Vec<WalletKeyRecord>>>,
    pending_failures: AtomicU32,
    reads: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{ "<address>": [records...] }` from a JSON file
    pub fn from_seed_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let seed: HashMap<String, Vec<WalletKeyRecord>> =
            serde_json::from_str(&raw).context("Invalid seed file")?;

        log::info!("Seeded {} wallet(s) from {}", seed.len(), path.display());
        Ok(Self {
            records: RwLock::new(seed),
            ..Self::default()
        })
    }

    pub fn records(&self, wallet_address: &str) -> Option<Vec<WalletKeyRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(wallet_address).cloned()
    }

    /// Insert or replace the record with the same wallet id
    pub fn upsert(&self, wallet_address: &str, record: WalletKeyRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let entries = records.entry(wallet_address.to_string()).or_default();
        match entries.iter_mut().find(|r| r.wallet_id == record.wallet_id) {
            Some(existing) => *existing = record,
            None => entries.push(record),
        }
    }

    /// Add `chain_id` to the record's scanned chains, creating the record if needed
    pub fn mark_scanned(
        &self,
        wallet_address: &str,
        wallet_id: &str,
        chain_id: serde_json::Value,
    ) -> WalletKeyRecord {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let entries = records.entry(wallet_address.to_string()).or_default();

        let index = match entries.iter().position(|r| r.wallet_id == wallet_id) {
            Some(index) => index,
            None => {
                entries.push(WalletKeyRecord::new(wallet_id));
                entries.len() - 1
            }
        };

        let record = &mut entries[index];
        if !record.scanned_chains.contains(&chain_id) {
            record.scanned_chains.push(chain_id);
        }
        record.clone()
    }

    /// Fail the next `count` reads with 503
    pub fn inject_failures(&self, count: u32) -> u32 {
        self.pending_failures.fetch_add(count, Ordering::SeqCst) + count
    }

    /// Consume one pending failure, if any
    pub fn take_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn pending_failures(&self) -> u32 {
        self.pending_failures.load(Ordering::SeqCst)
    }

    /// Metadata reads served so far (including failed ones)
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn count_read(&self) -> u64 {
        self.reads.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_addresses_are_case_sensitive() {
        let store = MemoryStore::new();
        store.upsert("0xAbC", WalletKeyRecord::new("vault-1"));
        assert!(store.records("0xAbC").is_some());
        assert!(store.records("0xabc").is_none());
    }

    #[test]
    fn test_mark_scanned_is_idempotent() {
        let store = MemoryStore::new();
        store.mark_scanned("0xA", "vault-1", json!(137));
        let record = store.mark_scanned("0xA", "vault-1", json!(137));
        assert_eq!(record.scanned_chains, vec![json!(137)]);
        assert_eq!(store.records("0xA").unwrap().len(), 1);
    }

    #[test]
    fn test_failures_are_consumed() {
        let store = MemoryStore::new();
        assert_eq!(store.inject_failures(2), 2);
        assert!(store.take_failure());
        assert!(store.take_failure());
        assert!(!store.take_failure());
    }
}
