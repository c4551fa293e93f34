use std::path::PathBuf;

use alloy::primitives::Address;
use anyhow::{Result, bail};

use crate::chain::Network;
use crate::cli::TargetArgs;

/// Runtime configuration for a reconciliation pass.
pub struct RuntimeConfig {
    pub network: Network,
    /// Hex private key from the environment. Absent is legal: the pass
    /// degrades to plan-and-persist.
    pub private_key: Option<String>,
    /// Address derived from the private key, when one is present.
    pub deployer: Option<Address>,
    pub deployments_file: PathBuf,
    pub address_book_file: PathBuf,
    pub migrations_file: PathBuf,
    pub artifacts_dir: PathBuf,
    pub max_batch: usize,
    pub clean: bool,
}

impl RuntimeConfig {
    pub fn from_cli(cli: &TargetArgs) -> Result<Self> {
        let private_key = std::env::var("CHAINWRIGHT_PRIVATE_KEY").ok();

        let deployer = match &private_key {
            Some(key) => {
                use alloy::signers::local::PrivateKeySigner;
                let signer: PrivateKeySigner = key
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid private key: {e}"))?;
                Some(signer.address())
            }
            None => None,
        };

        let mut network = match Network::from_name(&cli.network) {
            Some(known) => known,
            None => match (&cli.rpc_url, cli.chain_id) {
                (Some(rpc), Some(chain_id)) => Network::custom(&cli.network, chain_id, rpc),
                _ => bail!(
                    "Unknown network '{}'. Use 'avalanche' or 'localhost', \
                     or pass both --rpc-url and --chain-id.",
                    cli.network
                ),
            },
        };
        if let Some(rpc) = &cli.rpc_url {
            network.rpc_url = rpc.clone();
        }
        if let Some(chain_id) = cli.chain_id {
            network.chain_id = chain_id;
        }

        if cli.max_batch < 2 {
            bail!("--max-batch must be at least 2 to hold a replace pair");
        }

        let deployments_file = cli
            .deployments
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("deployments/{}.json", network.name)));

        Ok(RuntimeConfig {
            network,
            private_key,
            deployer,
            deployments_file,
            address_book_file: cli.address_book.clone(),
            migrations_file: cli.migrations_file.clone(),
            artifacts_dir: cli.artifacts_dir.clone(),
            max_batch: cli.max_batch,
            clean: cli.clean,
        })
    }
}
