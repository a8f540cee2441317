//! Network identifiers and the supported network table
//!
//! The metadata store writes chain ids inconsistently (JSON numbers, decimal
//! strings, `0x` hex strings). [`ChainId::parse`] is the single place where
//! those representations are normalized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// EVM-style numeric network identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Normalize a textual chain id (`"137"`, `"0x89"`, `" 0X89 "`)
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => trimmed.parse::<u64>().ok(),
        };

        parsed.map(ChainId)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}

impl FromStr for ChainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChainId::parse(s).ok_or_else(|| format!("invalid chain id: {}", s))
    }
}

/// Static id → display name table of networks the vault can be used on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupportedChains {
    chains: BTreeMap<ChainId, String>,
}

impl SupportedChains {
    pub fn new(entries: impl IntoIterator<Item = (ChainId, String)>) -> Self {
        Self {
            chains: entries.into_iter().collect(),
        }
    }

    /// Parse a `id:Name,id:Name` list (ids may be decimal or hex)
    pub fn parse_list(raw: &str) -> Result<Self, String> {
        let mut chains = BTreeMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, name) = entry
                .split_once(':')
                .ok_or_else(|| format!("expected id:Name, got '{}'", entry))?;
            let id = id.parse::<ChainId>()?;
            chains.insert(id, name.trim().to_string());
        }

        if chains.is_empty() {
            return Err("supported chain list is empty".to_string());
        }
        Ok(Self { chains })
    }

    pub fn contains(&self, chain: ChainId) -> bool {
        self.chains.contains_key(&chain)
    }

    pub fn name(&self, chain: ChainId) -> Option<&str> {
        self.chains.get(&chain).map(String::as_str)
    }

    /// Display name, falling back to `Chain <id>` for unknown networks
    pub fn label(&self, chain: ChainId) -> String {
        self.name(chain)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Chain {}", chain))
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl Default for SupportedChains {
    fn default() -> Self {
        Self::new([
            (ChainId(1), "Ethereum".to_string()),
            (ChainId(56), "BNB Chain".to_string()),
            (ChainId(137), "Polygon".to_string()),
            (ChainId(8453), "Base".to_string()),
            (ChainId(42161), "Arbitrum".to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_and_hex() {
        assert_eq!(ChainId::parse("137"), Some(ChainId(137)));
        assert_eq!(ChainId::parse("0x89"), Some(ChainId(137)));
        assert_eq!(ChainId::parse(" 0X1 "), Some(ChainId(1)));
        assert_eq!(ChainId::parse("0xa4b1"), Some(ChainId(42161)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(ChainId::parse(""), None);
        assert_eq!(ChainId::parse("0x"), None);
        assert_eq!(ChainId::parse("polygon"), None);
        assert_eq!(ChainId::parse("-1"), None);
    }

    #[test]
    fn test_supported_chains_parse_list() {
        let chains = SupportedChains::parse_list("1:Ethereum, 0x89:Polygon").unwrap();
        assert_eq!(chains.len(), 2);
        assert_eq!(chains.name(ChainId(137)), Some("Polygon"));
        assert!(!chains.contains(ChainId(10)));
        assert_eq!(chains.label(ChainId(10)), "Chain 10");
    }

    #[test]
    fn test_supported_chains_parse_list_errors() {
        assert!(SupportedChains::parse_list("").is_err());
        assert!(SupportedChains::parse_list("Ethereum").is_err());
        assert!(SupportedChains::parse_list("abc:Ethereum").is_err());
    }
}
