//! Declared configuration: which contracts are managed, which tokens are
//! listed with what parameters, and which strategies are enabled.
//!
//! The tables in [`networks`] are the declarations; [`build`] resolves
//! them against a network's deployment records into one immutable
//! [`DesiredState`] per run.

pub mod networks;

use anyhow::{bail, Result};

use crate::model::deployments::Deployments;
use crate::model::desired::{DesiredEntry, DesiredState, DesiredStrategy, DesiredToken};

/// Build the desired state for a network. Fails when the network has no
/// token listing table or when a declared contract has no deployment
/// record (a half-deployed network should fail loudly before any admin
/// transaction is planned).
pub fn build(network: &str, deployments: &Deployments) -> Result<DesiredState> {
    let Some(tokens) = networks::token_addresses(network) else {
        bail!("no token listings declared for network `{network}`");
    };
    let token_addresses = tokens.iter().copied().collect();

    let mut managed = Vec::new();
    for key in networks::managed_contracts() {
        let address = deployments.require(key)?;
        managed.push(DesiredEntry { key, address });
    }

    let records = networks::init_records();
    let mut desired_tokens = Vec::new();
    for (symbol, address) in &tokens {
        let Some((_, record)) = records.iter().find(|(s, _)| s == symbol) else {
            bail!("token `{symbol}` is listed on `{network}` but has no init record");
        };
        desired_tokens.push(DesiredToken {
            symbol: *symbol,
            address: *address,
            record: record.clone(),
        });
    }

    let mut strategies = Vec::new();
    for (key, strategy_tokens) in networks::strategies(network) {
        let address = deployments.require(key)?;
        strategies.push(DesiredStrategy {
            key,
            address,
            tokens: strategy_tokens,
        });
    }

    Ok(DesiredState {
        network: network.to_string(),
        managed,
        tokens: desired_tokens,
        strategies,
        token_addresses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::resource::ContractKey;
    use crate::model::TokenSymbol;
    use alloy::primitives::Address;

    fn full_deployments() -> Deployments {
        let entries: Vec<(ContractKey, Address)> = ContractKey::ALL
            .iter()
            .filter(|k| !k.is_unit())
            .enumerate()
            .map(|(i, k)| (*k, Address::with_last_byte(i as u8 + 1)))
            .collect();
        Deployments::from_entries(&entries)
    }

    #[test]
    fn avalanche_builds_completely() {
        let desired = build("avalanche", &full_deployments()).unwrap();
        assert_eq!(desired.managed.len(), 9);
        assert_eq!(desired.tokens.len(), 4);
        assert_eq!(desired.strategies.len(), 2);
        // Proxy via-token must resolve against the same table.
        let savax = desired.token(TokenSymbol::SAvax).unwrap();
        assert!(savax
            .record
            .oracle
            .resolve(&savax.record, &desired.token_addresses)
            .is_some());
    }

    #[test]
    fn localhost_mirrors_avalanche_tokens() {
        let a = build("avalanche", &full_deployments()).unwrap();
        let l = build("localhost", &full_deployments()).unwrap();
        assert_eq!(a.token_addresses, l.token_addresses);
    }

    #[test]
    fn unknown_network_is_rejected() {
        let err = build("fuji", &full_deployments()).unwrap_err();
        assert!(err.to_string().contains("fuji"));
    }

    #[test]
    fn missing_deployment_fails_fast() {
        let err = build("avalanche", &Deployments::default()).unwrap_err();
        assert!(err.to_string().contains("StrategyRegistry"));
    }
}
