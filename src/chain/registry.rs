//! Current-state reader. Everything here is a view call; read failures
//! are fatal to the reconciliation pass because no delta can be trusted
//! without a true baseline.

use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use anyhow::{Context, Result};

use crate::chain::abi::{
    IChainlinkOracle, IDependencyController, IEquivalentScaledOracle, IIsolatedLending,
    IProxyOracle, IRoles, IStrategy, IStrategyRegistry, ITrancheIdService, ITwapOracle,
    IUniswapV2Factory,
};
use crate::model::deployments::{Deployments, MissingDeployment};
use crate::model::desired::OracleWiring;
use crate::model::management::ManagementSet;
use crate::model::resource::ContractKey;

/// Upper bound when probing the controller's role index. Reads past the
/// end of the on-chain array revert, which terminates the probe early;
/// the bound caps pathological registries.
pub const ROLE_PROBE_BOUND: usize = 256;

/// The resolved core protocol addresses a pass works against.
#[derive(Debug, Clone, Copy)]
pub struct CoreAddresses {
    pub roles: Address,
    pub dependency_controller: Address,
    pub strategy_registry: Address,
    pub stablecoin: Address,
    pub isolated_lending: Address,
    pub tranche_id_service: Address,
}

impl CoreAddresses {
    pub fn resolve(deployments: &Deployments) -> Result<Self, MissingDeployment> {
        Ok(CoreAddresses {
            roles: deployments.require(ContractKey::Roles)?,
            dependency_controller: deployments.require(ContractKey::DependencyController)?,
            strategy_registry: deployments.require(ContractKey::StrategyRegistry)?,
            stablecoin: deployments.require(ContractKey::Stablecoin)?,
            isolated_lending: deployments.require(ContractKey::IsolatedLending)?,
            tranche_id_service: deployments.require(ContractKey::TrancheIdService)?,
        })
    }
}

/// Listing parameters as the lending contract currently holds them.
#[derive(Debug, Clone, Copy)]
pub struct IlMetadata {
    pub debt_ceiling: U256,
    pub total_debt: U256,
    pub minting_fee: U256,
    pub borrowable_per_10k: U256,
}

/// Read the full management baseline. Empty arrays from fresh registries
/// are valid baselines, not errors.
pub async fn management_set(
    provider: &impl Provider,
    core: &CoreAddresses,
) -> Result<ManagementSet> {
    let controller = IDependencyController::new(core.dependency_controller, provider);
    let managed = controller
        .allManagedContracts()
        .call()
        .await
        .context("allManagedContracts")?;

    let registry = IStrategyRegistry::new(core.strategy_registry, provider);
    let enabled = registry
        .allEnabledStrategies()
        .call()
        .await
        .context("allEnabledStrategies")?;

    Ok(ManagementSet {
        managed: managed.into_iter().collect(),
        enabled_strategies: enabled.into_iter().collect(),
    })
}

/// Managed contracts in on-chain order, for deterministic cleanup batches.
pub async fn managed_list(provider: &impl Provider, core: &CoreAddresses) -> Result<Vec<Address>> {
    let controller = IDependencyController::new(core.dependency_controller, provider);
    controller
        .allManagedContracts()
        .call()
        .await
        .context("allManagedContracts")
}

pub async fn roles_owner(provider: &impl Provider, core: &CoreAddresses) -> Result<Address> {
    let roles = IRoles::new(core.roles, provider);
    roles.owner().call().await.context("Roles.owner")
}

pub async fn il_metadata(
    provider: &impl Provider,
    core: &CoreAddresses,
    token: Address,
) -> Result<IlMetadata> {
    let lending = IIsolatedLending::new(core.isolated_lending, provider);
    let meta = lending
        .viewILMetadata(token)
        .call()
        .await
        .context("viewILMetadata")?;
    Ok(IlMetadata {
        debt_ceiling: meta.debtCeiling,
        total_debt: meta.totalDebt,
        minting_fee: meta.mintingFee,
        borrowable_per_10k: meta.borrowablePer10k,
    })
}

/// The tranche slot registered for the lending contract; zero means
/// `setupTrancheSlot()` has not run yet.
pub async fn tranche_slot(provider: &impl Provider, core: &CoreAddresses) -> Result<U256> {
    let service = ITrancheIdService::new(core.tranche_id_service, provider);
    service
        .viewSlotByTrancheContract(core.isolated_lending)
        .call()
        .await
        .context("viewSlotByTrancheContract")
}

/// Probe the controller's role index. Reading past the end of the array
/// reverts, so each index read is an `Option`: `None` marks the end. The
/// bound keeps the probe finite even against a contract that never
/// reverts.
pub async fn known_roles(provider: &impl Provider, core: &CoreAddresses) -> Result<Vec<U256>> {
    let controller = IDependencyController::new(core.dependency_controller, provider);
    let mut roles = Vec::new();
    for i in 0..ROLE_PROBE_BOUND {
        let Some(role) = controller.allRoles(U256::from(i)).call().await.ok() else {
            break;
        };
        roles.push(role);
    }
    Ok(roles)
}

pub async fn has_role(
    provider: &impl Provider,
    core: &CoreAddresses,
    role: U256,
    actor: Address,
) -> Result<bool> {
    let roles = IRoles::new(core.roles, provider);
    roles
        .getRole(role, actor)
        .call()
        .await
        .context("Roles.getRole")
}

/// Ask an oracle whether its current parameters for `token` match the
/// wiring, returning the encoded parameters either way. The encoding is
/// what an activation unit submits when the check fails.
pub async fn check_oracle(
    provider: &impl Provider,
    oracle: Address,
    token: Address,
    peg: Address,
    wiring: &OracleWiring,
) -> Result<(bool, Bytes)> {
    match wiring {
        OracleWiring::Chainlink { feed, decimals } => {
            let c = IChainlinkOracle::new(oracle, provider);
            let r = c
                .encodeAndCheckOracleParams(token, peg, *feed, U256::from(*decimals))
                .call()
                .await
                .context("ChainlinkOracle.encodeAndCheckOracleParams")?;
            Ok((r.matches, r.encoded))
        }
        OracleWiring::Twap { factory, .. } => {
            let pair = pair_for(provider, *factory, token, peg).await?;
            let c = ITwapOracle::new(oracle, provider);
            let r = c
                .encodeAndCheckOracleParams(token, peg, pair, true)
                .call()
                .await
                .context("TwapOracle.encodeAndCheckOracleParams")?;
            Ok((r.matches, r.encoded))
        }
        OracleWiring::EquivalentScaled { scale_units } => {
            let c = IEquivalentScaledOracle::new(oracle, provider);
            let r = c
                .encodeAndCheckOracleParams(token, peg, *scale_units, U256::from(10).pow(U256::from(18)))
                .call()
                .await
                .context("EquivalentScaledOracle.encodeAndCheckOracleParams")?;
            Ok((r.matches, r.encoded))
        }
        OracleWiring::Proxy { via } => {
            let c = IProxyOracle::new(oracle, provider);
            let r = c
                .encodeAndCheckOracleParams(token, *via, peg)
                .call()
                .await
                .context("ProxyOracle.encodeAndCheckOracleParams")?;
            Ok((r.matches, r.encoded))
        }
    }
}

/// Whether a strategy already has approval wiring for a token, plus the
/// encoded approval data to submit when it does not.
pub async fn strategy_approved(
    provider: &impl Provider,
    strategy: Address,
    token: Address,
) -> Result<(bool, Bytes)> {
    let s = IStrategy::new(strategy, provider);
    let r = s
        .checkApprovedAndEncode(token)
        .call()
        .await
        .context("checkApprovedAndEncode")?;
    Ok((r.approved, r.data))
}

/// Pair addresses are registered under sorted token order in the factory.
async fn pair_for(
    provider: &impl Provider,
    factory: Address,
    a: Address,
    b: Address,
) -> Result<Address> {
    let (token0, token1) = if a < b { (a, b) } else { (b, a) };
    let f = IUniswapV2Factory::new(factory, provider);
    f.getPair(token0, token1)
        .call()
        .await
        .context("factory.getPair")
}
