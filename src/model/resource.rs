use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What class of protocol resource a logical name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Contract,
    Strategy,
    Oracle,
    Token,
}

/// Every logical contract name the suite deploys.
///
/// Deployment records, the address book, and build artifacts are all keyed
/// by these names, so a typo'd name is a compile error rather than a
/// silently-skipped migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractKey {
    // ── Core protocol ──
    Roles,
    DependencyController,
    StrategyRegistry,
    OracleRegistry,
    Stablecoin,
    IsolatedLending,
    TrancheIdService,

    // ── Oracles ──
    ChainlinkOracle,
    TwapOracle,
    ProxyOracle,
    EquivalentScaledOracle,

    // ── Strategies ──
    SimpleHoldingStrategy,
    YieldYakStrategy,

    // ── Disposable migration units ──
    ContractManagement,
    OracleActivation,
    TokenActivation,
    StrategyTokenActivation,
    DependencyCleaner,
}

#[derive(Debug, Error)]
#[error("unknown contract name `{0}`")]
pub struct UnknownContractKey(pub String);

impl ContractKey {
    pub const ALL: [ContractKey; 18] = [
        ContractKey::Roles,
        ContractKey::DependencyController,
        ContractKey::StrategyRegistry,
        ContractKey::OracleRegistry,
        ContractKey::Stablecoin,
        ContractKey::IsolatedLending,
        ContractKey::TrancheIdService,
        ContractKey::ChainlinkOracle,
        ContractKey::TwapOracle,
        ContractKey::ProxyOracle,
        ContractKey::EquivalentScaledOracle,
        ContractKey::SimpleHoldingStrategy,
        ContractKey::YieldYakStrategy,
        ContractKey::ContractManagement,
        ContractKey::OracleActivation,
        ContractKey::TokenActivation,
        ContractKey::StrategyTokenActivation,
        ContractKey::DependencyCleaner,
    ];

    /// The name used in deployment records, the address book, and artifacts.
    pub fn as_str(self) -> &'static str {
        match self {
            ContractKey::Roles => "Roles",
            ContractKey::DependencyController => "DependencyController",
            ContractKey::StrategyRegistry => "StrategyRegistry",
            ContractKey::OracleRegistry => "OracleRegistry",
            ContractKey::Stablecoin => "Stablecoin",
            ContractKey::IsolatedLending => "IsolatedLending",
            ContractKey::TrancheIdService => "TrancheIdService",
            ContractKey::ChainlinkOracle => "ChainlinkOracle",
            ContractKey::TwapOracle => "TwapOracle",
            ContractKey::ProxyOracle => "ProxyOracle",
            ContractKey::EquivalentScaledOracle => "EquivalentScaledOracle",
            ContractKey::SimpleHoldingStrategy => "SimpleHoldingStrategy",
            ContractKey::YieldYakStrategy => "YieldYakStrategy",
            ContractKey::ContractManagement => "ContractManagement",
            ContractKey::OracleActivation => "OracleActivation",
            ContractKey::TokenActivation => "TokenActivation",
            ContractKey::StrategyTokenActivation => "StrategyTokenActivation",
            ContractKey::DependencyCleaner => "DependencyCleaner",
        }
    }

    pub fn kind(self) -> ResourceKind {
        match self {
            ContractKey::ChainlinkOracle
            | ContractKey::TwapOracle
            | ContractKey::ProxyOracle
            | ContractKey::EquivalentScaledOracle => ResourceKind::Oracle,
            ContractKey::SimpleHoldingStrategy | ContractKey::YieldYakStrategy => {
                ResourceKind::Strategy
            }
            _ => ResourceKind::Contract,
        }
    }

    /// Disposable migration units are deployed, executed once by the owner,
    /// and self-destruct. They never appear in the desired state.
    pub fn is_unit(self) -> bool {
        matches!(
            self,
            ContractKey::ContractManagement
                | ContractKey::OracleActivation
                | ContractKey::TokenActivation
                | ContractKey::StrategyTokenActivation
                | ContractKey::DependencyCleaner
        )
    }
}

impl std::str::FromStr for ContractKey {
    type Err = UnknownContractKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownContractKey(s.to_string()))
    }
}

impl std::fmt::Display for ContractKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
