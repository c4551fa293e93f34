//! Persistence for pending migrations, one JSON file keyed by network.
//! Last writer wins; the tooling assumes a single operator per network.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::migration::PendingMigration;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading migration file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("parsing migration file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("writing migration file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// The on-disk ledger: `{"<network>": {manage, replace, strategies}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MigrationLedger(BTreeMap<String, PendingMigration>);

impl MigrationLedger {
    /// Load the ledger, or start fresh when the file doesn't exist yet.
    pub fn load_or_new(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(MigrationLedger::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Rewrite the whole ledger as pretty JSON, creating parent
    /// directories on first use.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| StoreError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, json).map_err(write_err)
    }

    /// This network's pending work (empty when nothing is recorded).
    pub fn network(&self, name: &str) -> PendingMigration {
        self.0.get(name).cloned().unwrap_or_default()
    }

    pub fn set_network(&mut self, name: &str, pending: PendingMigration) {
        if pending.is_empty() {
            self.0.remove(name);
        } else {
            self.0.insert(name.to_string(), pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!(
            "chainwright-ledger-{}/contract-migrations.json",
            std::process::id()
        ));

        let mut ledger = MigrationLedger::default();
        let mut pending = PendingMigration::default();
        pending.merge_manage(address!("0000000000000000000000000000000000000001"));
        pending.merge_replace(
            address!("0000000000000000000000000000000000000002"),
            address!("0000000000000000000000000000000000000003"),
        );
        ledger.set_network("localhost", pending.clone());
        ledger.save(&path).unwrap();

        let loaded = MigrationLedger::load_or_new(&path).unwrap();
        assert_eq!(loaded.network("localhost"), pending);
        assert!(loaded.network("avalanche").is_empty());
    }

    #[test]
    fn missing_file_is_fresh() {
        let ledger =
            MigrationLedger::load_or_new(Path::new("/nonexistent/contract-migrations.json"))
                .unwrap();
        assert!(ledger.network("localhost").is_empty());
    }

    #[test]
    fn emptied_network_drops_out_of_the_file() {
        let mut ledger = MigrationLedger::default();
        let mut pending = PendingMigration::default();
        pending.merge_manage(address!("0000000000000000000000000000000000000001"));
        ledger.set_network("localhost", pending);
        ledger.set_network("localhost", PendingMigration::default());
        let json = serde_json::to_string(&ledger).unwrap();
        assert_eq!(json, "{}");
    }
}
