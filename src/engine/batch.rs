//! Splits a delta into admin batches sized for one management unit each.

use alloy::primitives::Address;

use crate::engine::delta::Delta;

/// Argument set for a single management unit. One managed call per entry;
/// a replace contributes an incoming manage and an outgoing disable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub manage: Vec<Address>,
    pub disable: Vec<Address>,
    pub enable: Vec<Address>,
}

impl Batch {
    pub fn op_count(&self) -> usize {
        self.manage.len() + self.disable.len() + self.enable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.op_count() == 0
    }
}

impl std::fmt::Display for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} manage / {} disable / {} enable",
            self.manage.len(),
            self.disable.len(),
            self.enable.len()
        )
    }
}

/// Pack a delta into batches of at most `max_batch` operations.
///
/// Plain adds fill first, then replace pairs while both halves fit (a
/// pair never splits across batches), and strategy enables ride along
/// only once no management work remains, chunked to the same bound.
/// Bounds below 2 could never place a replace pair, so they are raised.
pub fn plan(delta: &Delta, max_batch: usize) -> Vec<Batch> {
    debug_assert!(max_batch >= 2, "batch bound cannot hold a replace pair");
    let max_batch = max_batch.max(2);

    let mut manage = delta.manage.as_slice();
    let mut replace = delta.replace.as_slice();
    let mut enable = delta.enable.as_slice();

    let mut batches = Vec::new();
    while !(manage.is_empty() && replace.is_empty() && enable.is_empty()) {
        let mut batch = Batch::default();

        while batch.op_count() < max_batch {
            match manage.split_first() {
                Some((&addr, rest)) => {
                    batch.manage.push(addr);
                    manage = rest;
                }
                None => break,
            }
        }

        while batch.op_count() + 2 <= max_batch {
            match replace.split_first() {
                Some((pair, rest)) => {
                    batch.manage.push(pair.incoming);
                    batch.disable.push(pair.outgoing);
                    replace = rest;
                }
                None => break,
            }
        }

        if manage.is_empty() && replace.is_empty() {
            while batch.op_count() < max_batch {
                match enable.split_first() {
                    Some((&addr, rest)) => {
                        batch.enable.push(addr);
                        enable = rest;
                    }
                    None => break,
                }
            }
        }

        batches.push(batch);
    }

    batches
}
