pub mod abi;
pub mod artifacts;
pub mod executor;
pub mod provider;
pub mod registry;

use alloy::primitives::TxHash;
use alloy::rpc::types::TransactionReceipt;
use thiserror::Error;

/// Chain ID of the local development chain, where account impersonation
/// is available.
pub const DEV_CHAIN_ID: u64 = 31337;

/// Gas allowance for batched admin transactions. Batches are sized to the
/// operation cap, not to gas, so the limit is generous and fixed.
pub const ADMIN_GAS_LIMIT: u64 = 8_000_000;

/// An EVM network the reconciler can target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

impl Network {
    pub fn avalanche() -> Self {
        Network {
            name: "avalanche".into(),
            chain_id: 43114,
            rpc_url: "https://api.avax.network/ext/bc/C/rpc".into(),
        }
    }

    pub fn localhost() -> Self {
        Network {
            name: "localhost".into(),
            chain_id: DEV_CHAIN_ID,
            rpc_url: "http://127.0.0.1:8545".into(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "avalanche" => Some(Self::avalanche()),
            "localhost" => Some(Self::localhost()),
            _ => None,
        }
    }

    pub fn custom(name: impl Into<String>, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        Network {
            name: name.into(),
            chain_id,
            rpc_url: rpc_url.into(),
        }
    }

    /// Development chains allow the impersonated-owner execution path.
    pub fn is_dev(&self) -> bool {
        self.chain_id == DEV_CHAIN_ID
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A submitted transaction was mined but reverted.
#[derive(Debug, Error)]
#[error("{label} tx reverted (hash {tx_hash})")]
pub struct RevertError {
    pub label: String,
    pub tx_hash: TxHash,
}

pub fn require_success(receipt: &TransactionReceipt, label: &str) -> Result<(), RevertError> {
    if !receipt.status() {
        return Err(RevertError {
            label: label.to_string(),
            tx_hash: receipt.transaction_hash,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_networks_resolve() {
        assert_eq!(Network::from_name("Avalanche").unwrap().chain_id, 43114);
        assert!(Network::from_name("localhost").unwrap().is_dev());
        assert!(Network::from_name("fuji").is_none());
    }
}
