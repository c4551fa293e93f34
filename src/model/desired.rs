use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::resource::ContractKey;

/// Collateral tokens the lending market supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TokenSymbol {
    Wavax,
    Weth,
    Usdc,
    SAvax,
}

impl TokenSymbol {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenSymbol::Wavax => "WAVAX",
            TokenSymbol::Weth => "WETH",
            TokenSymbol::Usdc => "USDC",
            TokenSymbol::SAvax => "sAVAX",
        }
    }
}

impl std::fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Oracle wiring ────────────────────────────────────────────────────

/// How a token's price oracle is parameterized. Each variant maps onto one
/// oracle contract and the argument tuple its parameter check takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleSpec {
    /// Chainlink USD feed.
    Chainlink { feed: Address },
    /// AMM time-weighted average price against another listed token. The
    /// pair is resolved through the factory at reconcile time.
    Twap { factory: Address, peg: TokenSymbol },
    /// Fixed-scale equivalence to the stablecoin (for stables).
    EquivalentScaled { scale: u64 },
    /// Views the token through another token's oracle (e.g. a liquid
    /// staking token priced via its underlying).
    Proxy { via: TokenSymbol },
}

impl OracleSpec {
    /// The oracle contract this variant wires.
    pub fn oracle_key(&self) -> ContractKey {
        match self {
            OracleSpec::Chainlink { .. } => ContractKey::ChainlinkOracle,
            OracleSpec::Twap { .. } => ContractKey::TwapOracle,
            OracleSpec::EquivalentScaled { .. } => ContractKey::EquivalentScaledOracle,
            OracleSpec::Proxy { .. } => ContractKey::ProxyOracle,
        }
    }

    /// Resolve token-symbol references into concrete addresses. `None`
    /// when a referenced symbol is not listed on this network.
    pub fn resolve(
        &self,
        record: &TokenInitRecord,
        tokens: &BTreeMap<TokenSymbol, Address>,
    ) -> Option<OracleWiring> {
        match self {
            OracleSpec::Chainlink { feed } => Some(OracleWiring::Chainlink {
                feed: *feed,
                decimals: record.decimals,
            }),
            OracleSpec::Twap { factory, peg } => Some(OracleWiring::Twap {
                factory: *factory,
                peg_token: *tokens.get(peg)?,
            }),
            OracleSpec::EquivalentScaled { scale } => Some(OracleWiring::EquivalentScaled {
                scale_units: U256::from(*scale) * U256::from(10).pow(U256::from(record.decimals)),
            }),
            OracleSpec::Proxy { via } => Some(OracleWiring::Proxy {
                via: *tokens.get(via)?,
            }),
        }
    }
}

/// Fully resolved oracle arguments, ready for the on-chain parameter check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleWiring {
    Chainlink { feed: Address, decimals: u8 },
    Twap { factory: Address, peg_token: Address },
    EquivalentScaled { scale_units: U256 },
    Proxy { via: Address },
}

// ── Token listing parameters ─────────────────────────────────────────

/// Listing parameters for one collateral token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInitRecord {
    pub decimals: u8,
    pub oracle: OracleSpec,
    /// Debt ceiling in whole stablecoin units.
    pub debt_ceiling: u64,
    pub minting_fee_percent: u64,
    pub col_ratio_percent: u64,
    /// Extra oracles to keep current alongside the primary, e.g. a TWAP
    /// backstop next to a Chainlink feed. Checked before the primary.
    pub additional_oracles: Vec<(TokenSymbol, OracleSpec)>,
}

impl TokenInitRecord {
    pub fn new(oracle: OracleSpec, debt_ceiling: u64) -> Self {
        TokenInitRecord {
            decimals: 18,
            oracle,
            debt_ceiling,
            minting_fee_percent: 1,
            col_ratio_percent: 166,
            additional_oracles: Vec::new(),
        }
    }

    pub fn decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn minting_fee_percent(mut self, percent: u64) -> Self {
        self.minting_fee_percent = percent;
        self
    }

    pub fn col_ratio_percent(mut self, percent: u64) -> Self {
        self.col_ratio_percent = percent;
        self
    }

    pub fn additional_oracle(mut self, token: TokenSymbol, spec: OracleSpec) -> Self {
        self.additional_oracles.push((token, spec));
        self
    }

    /// Debt ceiling scaled to the lending contract's internal units.
    pub fn debt_ceiling_units(&self) -> U256 {
        U256::from(self.debt_ceiling) * U256::from(10).pow(U256::from(6))
    }

    /// Minting fee in per-mil, as the lending contract stores it.
    pub fn fee_per_mil(&self) -> U256 {
        U256::from(self.minting_fee_percent * 10)
    }

    /// Collateralization ratio in basis points of required coverage.
    pub fn col_ratio_per_10k(&self) -> U256 {
        U256::from(self.col_ratio_percent * 100)
    }
}

// ── Desired state ────────────────────────────────────────────────────

/// A contract that must be managed by the dependency controller.
#[derive(Debug, Clone)]
pub struct DesiredEntry {
    pub key: ContractKey,
    pub address: Address,
}

/// A collateral token and its listing parameters.
#[derive(Debug, Clone)]
pub struct DesiredToken {
    pub symbol: TokenSymbol,
    pub address: Address,
    pub record: TokenInitRecord,
}

/// A strategy to enable, and the tokens it must have approval for.
#[derive(Debug, Clone)]
pub struct DesiredStrategy {
    pub key: ContractKey,
    pub address: Address,
    pub tokens: Vec<TokenSymbol>,
}

/// The full declared configuration for one network, built once per run
/// and immutable afterwards. Lists keep declaration order; the delta
/// calculator preserves it.
#[derive(Debug, Clone)]
pub struct DesiredState {
    pub network: String,
    pub managed: Vec<DesiredEntry>,
    pub tokens: Vec<DesiredToken>,
    pub strategies: Vec<DesiredStrategy>,
    /// Symbol to address for this network, for oracle peg resolution.
    pub token_addresses: BTreeMap<TokenSymbol, Address>,
}

impl DesiredState {
    pub fn token(&self, symbol: TokenSymbol) -> Option<&DesiredToken> {
        self.tokens.iter().find(|t| t.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn record_defaults() {
        let r = TokenInitRecord::new(OracleSpec::EquivalentScaled { scale: 1 }, 1000);
        assert_eq!(r.decimals, 18);
        assert_eq!(r.minting_fee_percent, 1);
        assert_eq!(r.col_ratio_percent, 166);
        assert_eq!(r.fee_per_mil(), U256::from(10));
        assert_eq!(r.col_ratio_per_10k(), U256::from(16600));
        assert_eq!(r.debt_ceiling_units(), U256::from(1_000_000_000u64));
    }

    #[test]
    fn equivalent_scale_uses_token_decimals() {
        let r = TokenInitRecord::new(OracleSpec::EquivalentScaled { scale: 1 }, 1000).decimals(6);
        let wiring = r.oracle.resolve(&r, &BTreeMap::new()).unwrap();
        assert_eq!(
            wiring,
            OracleWiring::EquivalentScaled {
                scale_units: U256::from(1_000_000u64)
            }
        );
    }

    #[test]
    fn proxy_resolution_requires_listed_via_token() {
        let r = TokenInitRecord::new(
            OracleSpec::Proxy {
                via: TokenSymbol::Wavax,
            },
            500,
        );
        assert!(r.oracle.resolve(&r, &BTreeMap::new()).is_none());

        let mut tokens = BTreeMap::new();
        let wavax = address!("B31f66AA3C1e785363F0875A1B74E27b85FD66c7");
        tokens.insert(TokenSymbol::Wavax, wavax);
        assert_eq!(
            r.oracle.resolve(&r, &tokens),
            Some(OracleWiring::Proxy { via: wavax })
        );
    }
}
