use std::collections::BTreeMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Administrative work recorded for one network: contracts to bring under
/// management, replace pairs (incoming address to the outgoing one it
/// retires), and strategies to enable.
///
/// This is a superset of what still needs submission. Entries are merged
/// in before any batch is attempted and pruned against the fresh on-chain
/// management set after every successful execution, so an interrupted or
/// deferred run picks up exactly where it left off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingMigration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manage: Vec<Address>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replace: BTreeMap<Address, Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategies: Vec<Address>,
}

impl PendingMigration {
    pub fn is_empty(&self) -> bool {
        self.manage.is_empty() && self.replace.is_empty() && self.strategies.is_empty()
    }

    pub fn merge_manage(&mut self, addr: Address) {
        if !self.manage.contains(&addr) {
            self.manage.push(addr);
        }
    }

    /// Record a replace pair. A re-run that produced yet another incoming
    /// address for the same outgoing contract keeps both entries; the
    /// retention predicate drops whichever swap completes.
    pub fn merge_replace(&mut self, incoming: Address, outgoing: Address) {
        self.replace.insert(incoming, outgoing);
    }

    pub fn merge_strategy(&mut self, addr: Address) {
        if !self.strategies.contains(&addr) {
            self.strategies.push(addr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const A: Address = address!("0000000000000000000000000000000000000001");
    const B: Address = address!("0000000000000000000000000000000000000002");

    #[test]
    fn merge_is_idempotent() {
        let mut p = PendingMigration::default();
        p.merge_manage(A);
        p.merge_manage(A);
        p.merge_strategy(B);
        p.merge_strategy(B);
        assert_eq!(p.manage, vec![A]);
        assert_eq!(p.strategies, vec![B]);
    }

    #[test]
    fn serialized_shape_skips_empty_sections() {
        let mut p = PendingMigration::default();
        p.merge_manage(A);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("manage"));
        assert!(!json.contains("replace"));
        assert!(!json.contains("strategies"));
    }

    #[test]
    fn replace_serializes_incoming_to_outgoing() {
        let mut p = PendingMigration::default();
        p.merge_replace(A, B);
        let json = serde_json::to_string(&p).unwrap();
        let back: PendingMigration = serde_json::from_str(&json).unwrap();
        assert_eq!(back.replace.get(&A), Some(&B));
    }
}
