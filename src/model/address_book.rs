use std::collections::BTreeMap;
use std::path::Path;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::resource::ContractKey;

/// Snapshot of the last exported address book: chain ID (decimal string)
/// to logical name to address.
///
/// Used only for replace detection. When the book still carries an old
/// address under a name that the deployments file has refreshed, the old
/// contract is the outgoing half of a replace pair. This file is never
/// written here; the export step of the deploy tooling owns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressBook(BTreeMap<String, BTreeMap<String, Address>>);

impl AddressBook {
    /// Load from file. Missing file means no replace detection anywhere.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(AddressBook::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading address book {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing address book {}", path.display()))
    }

    /// The book's entry for a logical name on a chain. `None` when the
    /// chain has no book entry at all, which degrades every
    /// classification on that chain to a plain add.
    pub fn lookup(&self, chain_id: u64, key: ContractKey) -> Option<Address> {
        self.0
            .get(&chain_id.to_string())?
            .get(key.as_str())
            .copied()
    }

    /// All recorded addresses for a chain (cleanup treats these as known).
    pub fn chain_addresses(&self, chain_id: u64) -> impl Iterator<Item = Address> + '_ {
        self.0
            .get(&chain_id.to_string())
            .into_iter()
            .flat_map(|entries| entries.values().copied())
    }

    #[cfg(test)]
    pub fn with_entry(chain_id: u64, key: ContractKey, addr: Address) -> Self {
        let mut book = AddressBook::default();
        book.0
            .entry(chain_id.to_string())
            .or_default()
            .insert(key.as_str().to_string(), addr);
        book
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const ADDR: Address = address!("00000000000000000000000000000000000000cc");

    #[test]
    fn lookup_hit() {
        let book = AddressBook::with_entry(43114, ContractKey::IsolatedLending, ADDR);
        assert_eq!(book.lookup(43114, ContractKey::IsolatedLending), Some(ADDR));
    }

    #[test]
    fn missing_chain_key_yields_none() {
        let book = AddressBook::with_entry(43114, ContractKey::IsolatedLending, ADDR);
        assert_eq!(book.lookup(31337, ContractKey::IsolatedLending), None);
    }

    #[test]
    fn parses_chain_keyed_shape() {
        let json = r#"{"43114": {"Roles": "0x00000000000000000000000000000000000000aa"}}"#;
        let book: AddressBook = serde_json::from_str(json).unwrap();
        assert!(book.lookup(43114, ContractKey::Roles).is_some());
        assert_eq!(book.chain_addresses(43114).count(), 1);
        assert_eq!(book.chain_addresses(1).count(), 0);
    }
}
