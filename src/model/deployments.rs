use std::collections::BTreeMap;
use std::path::Path;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::resource::ContractKey;

/// Per-network record of deployed contract addresses, as written by the
/// surrounding deploy tooling: a flat `{"Name": "0x..."}` JSON map.
///
/// Read-only from the reconciler's point of view. The file is the source of
/// truth for "freshly deployed address" during delta classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deployments(BTreeMap<String, Address>);

/// A desired entry names a contract this network has no deployment record
/// for. Reconciliation fails before any admin transaction is planned.
#[derive(Debug, Error)]
#[error("no deployment record for `{0}`")]
pub struct MissingDeployment(pub ContractKey);

impl Deployments {
    /// Load from file. A missing file is a fresh network, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Deployments::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading deployments file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing deployments file {}", path.display()))
    }

    pub fn get(&self, key: ContractKey) -> Option<Address> {
        self.0.get(key.as_str()).copied()
    }

    /// Look up a key that must exist.
    pub fn require(&self, key: ContractKey) -> Result<Address, MissingDeployment> {
        self.get(key).ok_or(MissingDeployment(key))
    }

    /// Every recorded address, including names outside the closed key set
    /// (older deployments the cleanup stage must still treat as known).
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.0.values().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn from_entries(entries: &[(ContractKey, Address)]) -> Self {
        Deployments(
            entries
                .iter()
                .map(|(k, a)| (k.as_str().to_string(), *a))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn missing_file_is_empty() {
        let d = Deployments::load(Path::new("/nonexistent/deployments.json")).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn require_names_the_missing_key() {
        let d = Deployments::default();
        let err = d.require(ContractKey::Roles).unwrap_err();
        assert!(err.to_string().contains("Roles"));
    }

    #[test]
    fn parses_flat_map() {
        let json = r#"{
            "Roles": "0x00000000000000000000000000000000000000aa",
            "IsolatedLending": "0x00000000000000000000000000000000000000bb"
        }"#;
        let d: Deployments = serde_json::from_str(json).unwrap();
        assert_eq!(
            d.get(ContractKey::Roles),
            Some(address!("00000000000000000000000000000000000000aa"))
        );
        assert_eq!(d.len(), 2);
    }
}
