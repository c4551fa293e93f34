//! Pure delta computation. No I/O here: classification and pruning work
//! on a management set somebody else read, which keeps every rule
//! testable without a chain.

use std::collections::HashSet;

use alloy::primitives::Address;

use crate::model::address_book::AddressBook;
use crate::model::management::ManagementSet;
use crate::model::migration::PendingMigration;
use crate::model::resource::ContractKey;

/// How a freshly deployed address relates to the current on-chain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    AlreadyManaged,
    Manage,
    /// The address book still holds a managed predecessor under the same
    /// logical name: retire it in the same batch that manages the
    /// successor.
    Replace { outgoing: Address },
}

/// Classify one desired contract. Replace wins over a plain add, but only
/// when the book's entry is itself still managed; a stale book entry with
/// no live predecessor is just an add. A book with no entry for this
/// chain degrades everything to adds.
pub fn classify(
    current: &ManagementSet,
    book: &AddressBook,
    chain_id: u64,
    key: ContractKey,
    fresh: Address,
) -> Disposition {
    if current.is_managed(fresh) {
        return Disposition::AlreadyManaged;
    }
    match book.lookup(chain_id, key) {
        Some(outgoing) if outgoing != fresh && current.is_managed(outgoing) => {
            Disposition::Replace { outgoing }
        }
        _ => Disposition::Manage,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceEntry {
    pub incoming: Address,
    pub outgoing: Address,
}

/// What still needs submission, in pending-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    pub manage: Vec<Address>,
    pub replace: Vec<ReplaceEntry>,
    pub enable: Vec<Address>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.manage.is_empty() && self.replace.is_empty() && self.enable.is_empty()
    }

    /// Operation slots this delta occupies (a replace takes two).
    pub fn op_count(&self) -> usize {
        self.manage.len() + 2 * self.replace.len() + self.enable.len()
    }

    /// The pending-ledger representation of this delta. Writing this back
    /// after each execution is what prunes completed work.
    pub fn into_pending(self) -> PendingMigration {
        PendingMigration {
            manage: self.manage,
            replace: self
                .replace
                .into_iter()
                .map(|r| (r.incoming, r.outgoing))
                .collect(),
            strategies: self.enable,
        }
    }
}

impl std::fmt::Display for Delta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "manage={} replace={} enable={}",
            self.manage.len(),
            self.replace.len(),
            self.enable.len()
        )
    }
}

/// Filter the pending ledger against a fresh baseline. First occurrence
/// wins on duplicates; order is preserved.
///
/// A replace pair stays until the swap is observed complete, that is
/// until the incoming address is managed AND the outgoing one is not.
/// Keeping the pair while the outgoing contract lives means an
/// interrupted half-swap is finished rather than forgotten.
pub fn compute(pending: &PendingMigration, current: &ManagementSet) -> Delta {
    let mut seen: HashSet<Address> = HashSet::new();
    let mut delta = Delta::default();

    for &addr in &pending.manage {
        if !current.is_managed(addr) && seen.insert(addr) {
            delta.manage.push(addr);
        }
    }
    for (&incoming, &outgoing) in &pending.replace {
        if (!current.is_managed(incoming) || current.is_managed(outgoing)) && seen.insert(incoming)
        {
            delta.replace.push(ReplaceEntry { incoming, outgoing });
        }
    }
    for &addr in &pending.strategies {
        if !current.is_enabled(addr) && seen.insert(addr) {
            delta.enable.push(addr);
        }
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const NEW: Address = address!("0000000000000000000000000000000000000011");
    const OLD: Address = address!("0000000000000000000000000000000000000022");
    const OTHER: Address = address!("0000000000000000000000000000000000000033");
    const CHAIN: u64 = 43114;

    #[test]
    fn managed_address_is_skipped() {
        let current = ManagementSet::of(&[NEW], &[]);
        let book = AddressBook::default();
        assert_eq!(
            classify(&current, &book, CHAIN, ContractKey::IsolatedLending, NEW),
            Disposition::AlreadyManaged
        );
    }

    #[test]
    fn no_book_entry_means_plain_add() {
        let current = ManagementSet::default();
        let book = AddressBook::default();
        assert_eq!(
            classify(&current, &book, CHAIN, ContractKey::IsolatedLending, NEW),
            Disposition::Manage
        );
    }

    #[test]
    fn managed_predecessor_in_book_means_replace() {
        let current = ManagementSet::of(&[OLD], &[]);
        let book = AddressBook::with_entry(CHAIN, ContractKey::IsolatedLending, OLD);
        assert_eq!(
            classify(&current, &book, CHAIN, ContractKey::IsolatedLending, NEW),
            Disposition::Replace { outgoing: OLD }
        );
    }

    #[test]
    fn stale_book_entry_without_live_predecessor_is_add() {
        // Book knows OLD but the controller no longer manages it.
        let current = ManagementSet::default();
        let book = AddressBook::with_entry(CHAIN, ContractKey::IsolatedLending, OLD);
        assert_eq!(
            classify(&current, &book, CHAIN, ContractKey::IsolatedLending, NEW),
            Disposition::Manage
        );
    }

    #[test]
    fn book_entry_for_other_chain_degrades_to_add() {
        let current = ManagementSet::of(&[OLD], &[]);
        let book = AddressBook::with_entry(CHAIN, ContractKey::IsolatedLending, OLD);
        assert_eq!(
            classify(&current, &book, 31337, ContractKey::IsolatedLending, NEW),
            Disposition::Manage
        );
    }

    #[test]
    fn book_agreeing_with_fresh_address_is_add_until_managed() {
        let current = ManagementSet::default();
        let book = AddressBook::with_entry(CHAIN, ContractKey::IsolatedLending, NEW);
        assert_eq!(
            classify(&current, &book, CHAIN, ContractKey::IsolatedLending, NEW),
            Disposition::Manage
        );
    }

    fn pending_with(
        manage: &[Address],
        replace: &[(Address, Address)],
        strategies: &[Address],
    ) -> PendingMigration {
        let mut p = PendingMigration::default();
        for &a in manage {
            p.merge_manage(a);
        }
        for &(i, o) in replace {
            p.merge_replace(i, o);
        }
        for &a in strategies {
            p.merge_strategy(a);
        }
        p
    }

    #[test]
    fn completed_manage_entries_are_pruned() {
        let pending = pending_with(&[NEW, OTHER], &[], &[]);
        let current = ManagementSet::of(&[NEW], &[]);
        let delta = compute(&pending, &current);
        assert_eq!(delta.manage, vec![OTHER]);
    }

    #[test]
    fn replace_is_retained_until_swap_completes() {
        let pending = pending_with(&[], &[(NEW, OLD)], &[]);

        // Neither side moved yet: keep.
        let delta = compute(&pending, &ManagementSet::of(&[OLD], &[]));
        assert_eq!(delta.replace.len(), 1);

        // Incoming managed but outgoing still live: half-done, keep.
        let delta = compute(&pending, &ManagementSet::of(&[NEW, OLD], &[]));
        assert_eq!(delta.replace.len(), 1);

        // Swap observed complete: drop.
        let delta = compute(&pending, &ManagementSet::of(&[NEW], &[]));
        assert!(delta.is_empty());
    }

    #[test]
    fn enabled_strategies_are_pruned() {
        let pending = pending_with(&[], &[], &[NEW, OTHER]);
        let current = ManagementSet::of(&[], &[NEW]);
        let delta = compute(&pending, &current);
        assert_eq!(delta.enable, vec![OTHER]);
    }

    #[test]
    fn first_occurrence_wins_across_classes() {
        // The same address recorded both as a manage and as the incoming
        // half of a replace only surfaces once.
        let pending = pending_with(&[NEW], &[(NEW, OLD)], &[]);
        let current = ManagementSet::of(&[OLD], &[]);
        let delta = compute(&pending, &current);
        assert_eq!(delta.manage, vec![NEW]);
        assert!(delta.replace.is_empty());
    }

    #[test]
    fn empty_pending_yields_empty_delta() {
        let delta = compute(&PendingMigration::default(), &ManagementSet::default());
        assert!(delta.is_empty());
        assert_eq!(delta.op_count(), 0);
    }
}
