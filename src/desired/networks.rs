use alloy::primitives::{address, Address};

use crate::model::desired::{OracleSpec, TokenInitRecord, TokenSymbol};
use crate::model::resource::ContractKey;

// ── Avalanche mainnet addresses ──────────────────────────────────────

const WAVAX: Address = address!("B31f66AA3C1e785363F0875A1B74E27b85FD66c7");
const WETH_E: Address = address!("49D5c2BdFfac6CE2BFdB6640F4F80f226bc10bAB");
const USDC_E: Address = address!("A7D7079b0FEaD91F3e65f86E8915Cb59c1a4C664");
const SAVAX: Address = address!("2b2C81e08f1Af8835a78Bb2A90AE924ACE0eA4bE");

const CHAINLINK_AVAX_USD: Address = address!("0A77230d17318075983913bC2145DB16C7366156");
const CHAINLINK_ETH_USD: Address = address!("976B3D034E162d8bD72D6b9C989d545b839003b0");

/// Trader Joe V1 factory, for TWAP pair lookups.
const JOE_FACTORY: Address = address!("9Ad6C38BE94206cA50bb0d90783181662f0Cfa10");

/// Token listings per network. Localhost is a fork of Avalanche, so it
/// mirrors the mainnet addresses.
pub fn token_addresses(network: &str) -> Option<Vec<(TokenSymbol, Address)>> {
    match network {
        "avalanche" | "localhost" => Some(vec![
            (TokenSymbol::Wavax, WAVAX),
            (TokenSymbol::Weth, WETH_E),
            (TokenSymbol::Usdc, USDC_E),
            (TokenSymbol::SAvax, SAVAX),
        ]),
        _ => None,
    }
}

/// Listing parameters per token. Network-independent: address resolution
/// is the only thing that varies between networks.
pub fn init_records() -> Vec<(TokenSymbol, TokenInitRecord)> {
    vec![
        (
            TokenSymbol::Wavax,
            TokenInitRecord::new(
                OracleSpec::Chainlink {
                    feed: CHAINLINK_AVAX_USD,
                },
                1000,
            )
            .additional_oracle(
                TokenSymbol::Wavax,
                OracleSpec::Twap {
                    factory: JOE_FACTORY,
                    peg: TokenSymbol::Usdc,
                },
            ),
        ),
        (
            TokenSymbol::Weth,
            TokenInitRecord::new(
                OracleSpec::Chainlink {
                    feed: CHAINLINK_ETH_USD,
                },
                100,
            )
            .additional_oracle(
                TokenSymbol::Weth,
                OracleSpec::Twap {
                    factory: JOE_FACTORY,
                    peg: TokenSymbol::Usdc,
                },
            ),
        ),
        (
            TokenSymbol::Usdc,
            TokenInitRecord::new(OracleSpec::EquivalentScaled { scale: 1 }, 1000).decimals(6),
        ),
        (
            TokenSymbol::SAvax,
            TokenInitRecord::new(
                OracleSpec::Proxy {
                    via: TokenSymbol::Wavax,
                },
                500,
            ),
        ),
    ]
}

/// Contracts the dependency controller must manage. Order matters: it is
/// the order manage operations are batched in.
pub fn managed_contracts() -> Vec<ContractKey> {
    vec![
        ContractKey::StrategyRegistry,
        ContractKey::OracleRegistry,
        ContractKey::Stablecoin,
        ContractKey::IsolatedLending,
        ContractKey::TrancheIdService,
        ContractKey::ChainlinkOracle,
        ContractKey::TwapOracle,
        ContractKey::ProxyOracle,
        ContractKey::EquivalentScaledOracle,
    ]
}

/// Strategies to enable per network, with the tokens each must approve.
pub fn strategies(network: &str) -> Vec<(ContractKey, Vec<TokenSymbol>)> {
    match network {
        "localhost" => vec![(
            ContractKey::SimpleHoldingStrategy,
            vec![TokenSymbol::Usdc, TokenSymbol::Weth, TokenSymbol::Wavax],
        )],
        "avalanche" => vec![
            (
                ContractKey::SimpleHoldingStrategy,
                vec![TokenSymbol::Usdc, TokenSymbol::Weth],
            ),
            (ContractKey::YieldYakStrategy, vec![TokenSymbol::Wavax]),
        ],
        _ => Vec::new(),
    }
}
