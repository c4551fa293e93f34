use std::path::PathBuf;

use alloy::network::TransactionBuilder;
use alloy::primitives::Address;
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::chain::require_success;
use crate::model::resource::ContractKey;

/// Loader for compiled contract artifacts: `<dir>/<Name>.json` with at
/// least a `bytecode` field holding hex creation code.
#[derive(Debug, Clone)]
pub struct Artifacts {
    dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact for `{name}` not found at {path}")]
    NotFound { name: ContractKey, path: String },

    #[error("artifact for `{name}` unreadable: {source}")]
    Io {
        name: ContractKey,
        source: std::io::Error,
    },

    #[error("artifact for `{name}` malformed: {reason}")]
    Malformed { name: ContractKey, reason: String },
}

#[derive(Deserialize)]
struct ArtifactFile {
    bytecode: String,
}

impl Artifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Artifacts { dir: dir.into() }
    }

    pub fn path_for(&self, name: ContractKey) -> PathBuf {
        self.dir.join(format!("{}.json", name.as_str()))
    }

    /// Creation bytecode for a contract, without constructor arguments.
    pub fn creation_code(&self, name: ContractKey) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(ArtifactError::NotFound {
                name,
                path: path.display().to_string(),
            });
        }
        let contents =
            std::fs::read_to_string(&path).map_err(|source| ArtifactError::Io { name, source })?;
        let artifact: ArtifactFile =
            serde_json::from_str(&contents).map_err(|e| ArtifactError::Malformed {
                name,
                reason: e.to_string(),
            })?;
        decode_bytecode(&artifact.bytecode).map_err(|reason| ArtifactError::Malformed {
            name,
            reason,
        })
    }
}

fn decode_bytecode(hex_str: &str) -> Result<Vec<u8>, String> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    if stripped.is_empty() {
        return Err("empty bytecode".to_string());
    }
    alloy::hex::decode(stripped).map_err(|e| format!("bad bytecode hex: {e}"))
}

/// Deploy a migration unit: creation code plus ABI-encoded constructor
/// arguments, submitted as a plain create transaction.
pub async fn deploy_unit(
    provider: &impl Provider,
    name: ContractKey,
    mut code: Vec<u8>,
    ctor_args: Vec<u8>,
) -> Result<Address> {
    code.extend_from_slice(&ctor_args);
    let tx = TransactionRequest::default().with_deploy_code(code);
    let receipt = provider
        .send_transaction(tx)
        .await
        .with_context(|| format!("deploying {name}"))?
        .get_receipt()
        .await
        .with_context(|| format!("deploy receipt for {name}"))?;
    require_success(&receipt, name.as_str())?;
    receipt
        .contract_address
        .with_context(|| format!("deploy receipt for {name} carries no contract address"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_artifacts(name: ContractKey, body: &str) -> Artifacts {
        let dir = std::env::temp_dir().join(format!(
            "chainwright-artifacts-{}-{}",
            name.as_str(),
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{}.json", name.as_str())), body).unwrap();
        Artifacts::new(dir)
    }

    #[test]
    fn loads_prefixed_bytecode() {
        let artifacts = temp_artifacts(
            ContractKey::ContractManagement,
            r#"{"bytecode": "0x6080604052"}"#,
        );
        let code = artifacts
            .creation_code(ContractKey::ContractManagement)
            .unwrap();
        assert_eq!(code, vec![0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn missing_artifact_names_the_unit() {
        let artifacts = Artifacts::new(std::env::temp_dir().join("chainwright-no-such-dir"));
        let err = artifacts
            .creation_code(ContractKey::DependencyCleaner)
            .unwrap_err();
        assert!(err.to_string().contains("DependencyCleaner"));
    }

    #[test]
    fn malformed_bytecode_is_rejected() {
        let artifacts = temp_artifacts(ContractKey::TokenActivation, r#"{"bytecode": "0xzz"}"#);
        assert!(artifacts
            .creation_code(ContractKey::TokenActivation)
            .is_err());
    }

    #[test]
    fn empty_bytecode_is_rejected() {
        let artifacts = temp_artifacts(ContractKey::OracleActivation, r#"{"bytecode": ""}"#);
        assert!(artifacts
            .creation_code(ContractKey::OracleActivation)
            .is_err());
    }
}
