use thiserror::Error;

use alloy::primitives::TxHash;

use crate::chain::RevertError;
use crate::chain::artifacts::ArtifactError;
use crate::engine::batch::Batch;
use crate::model::deployments::MissingDeployment;
use crate::model::resource::ContractKey;
use crate::store::StoreError;

/// Failure taxonomy for one reconciliation pass. Everything the operator
/// can act on gets its own shape; the rest funnels through `Other`.
#[derive(Debug, Error)]
pub enum PassError {
    /// Reading the on-chain baseline failed before any work was planned.
    /// Nothing was submitted and nothing was persisted.
    #[error("baseline read failed: {0:#}")]
    BaselineRead(#[source] anyhow::Error),

    /// A unit executed but its admin transaction reverted. The batch is
    /// still in the ledger; a later pass retries it.
    #[error("{unit} reverted (tx {tx_hash}){}", batch_suffix(.batch))]
    SubmissionReverted {
        unit: ContractKey,
        tx_hash: TxHash,
        batch: Batch,
    },

    #[error(transparent)]
    MissingDeployment(#[from] MissingDeployment),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Units that batch management operations report what stays pending;
/// parameter activation units carry an empty batch and no suffix.
fn batch_suffix(batch: &Batch) -> String {
    if batch.is_empty() {
        String::new()
    } else {
        format!(", batch left pending: {batch}")
    }
}

impl PassError {
    /// Classify a unit execution failure. A revert carries its tx hash
    /// and the batch that was being applied; transport or encoding
    /// failures pass through untouched.
    pub fn unit_failure(unit: ContractKey, batch: Batch, err: anyhow::Error) -> Self {
        match err.downcast::<RevertError>() {
            Ok(revert) => PassError::SubmissionReverted {
                unit,
                tx_hash: revert.tx_hash,
                batch,
            },
            Err(other) => PassError::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::b256;

    #[test]
    fn revert_downcasts_to_submission_failure() {
        let hash = b256!("1111111111111111111111111111111111111111111111111111111111111111");
        let err = anyhow::Error::new(RevertError {
            label: "ContractManagement".into(),
            tx_hash: hash,
        });
        let classified =
            PassError::unit_failure(ContractKey::ContractManagement, Batch::default(), err);
        match classified {
            PassError::SubmissionReverted { unit, tx_hash, .. } => {
                assert_eq!(unit, ContractKey::ContractManagement);
                assert_eq!(tx_hash, hash);
            }
            other => panic!("expected SubmissionReverted, got {other}"),
        }
    }

    #[test]
    fn non_revert_stays_generic() {
        let err = anyhow::anyhow!("connection refused");
        let classified =
            PassError::unit_failure(ContractKey::TokenActivation, Batch::default(), err);
        assert!(matches!(classified, PassError::Other(_)));
    }
}
