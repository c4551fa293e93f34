use std::collections::HashSet;

use alloy::primitives::Address;

/// Fresh on-chain baseline: the controller's managed contracts and the
/// registry's enabled strategies.
///
/// Always re-read before computing a delta, never carried across
/// reconciliation steps. Addresses compare as 20-byte values, so checksum
/// casing in source files is irrelevant once parsed.
#[derive(Debug, Clone, Default)]
pub struct ManagementSet {
    pub managed: HashSet<Address>,
    pub enabled_strategies: HashSet<Address>,
}

impl ManagementSet {
    pub fn is_managed(&self, addr: Address) -> bool {
        self.managed.contains(&addr)
    }

    pub fn is_enabled(&self, addr: Address) -> bool {
        self.enabled_strategies.contains(&addr)
    }

    #[cfg(test)]
    pub fn of(managed: &[Address], enabled: &[Address]) -> Self {
        ManagementSet {
            managed: managed.iter().copied().collect(),
            enabled_strategies: enabled.iter().copied().collect(),
        }
    }
}
