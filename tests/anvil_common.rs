#![allow(dead_code)]

use std::path::{Path, PathBuf};

use alloy::node_bindings::Anvil;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};

use chainwright::chain::Network;
use chainwright::engine::config::RuntimeConfig;
use chainwright::model::resource::ContractKey;

// ── Local chain context ──────────────────────────────────────────────

pub struct ChainContext {
    pub _anvil: alloy::node_bindings::AnvilInstance,
    pub rpc_url: String,
    pub deployer: Address,
    pub private_key: String,
}

/// Spawn a plain local Anvil (chain ID 31337). Needs `anvil` on PATH.
pub fn spawn_local() -> ChainContext {
    let anvil = Anvil::new().chain_id(31337).spawn();

    let rpc_url = anvil.endpoint();
    let deployer = anvil.addresses()[0];
    let private_key = hex::encode(anvil.keys()[0].to_bytes());

    ChainContext {
        _anvil: anvil,
        rpc_url,
        deployer,
        private_key,
    }
}

// ── Anvil cheats ─────────────────────────────────────────────────────

/// Fund native balance via anvil_setBalance.
pub async fn fund_eth(rpc_url: &str, addr: Address, amount: U256) {
    let provider = ProviderBuilder::new().connect_http(rpc_url.parse().unwrap());
    let _: () = provider
        .raw_request("anvil_setBalance".into(), (addr, amount))
        .await
        .expect("anvil_setBalance failed");
}

pub async fn impersonate(rpc_url: &str, addr: Address) {
    let provider = ProviderBuilder::new().connect_http(rpc_url.parse().unwrap());
    let _: () = provider
        .raw_request("anvil_impersonateAccount".into(), [addr])
        .await
        .expect("anvil_impersonateAccount failed");
}

pub async fn stop_impersonating(rpc_url: &str, addr: Address) {
    let provider = ProviderBuilder::new().connect_http(rpc_url.parse().unwrap());
    let _: () = provider
        .raw_request("anvil_stopImpersonatingAccount".into(), [addr])
        .await
        .expect("anvil_stopImpersonatingAccount failed");
}

// ── Config and fixture builders ──────────────────────────────────────

/// A throwaway directory for one test's files.
pub fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("chainwright-test-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("creating test dir failed");
    dir
}

pub fn write_json(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("writing test fixture failed");
}

/// Signerless localhost config with all files under `dir`. Tests that
/// exercise signing set `private_key` and `deployer` themselves.
pub fn make_config(ctx: &ChainContext, dir: &Path) -> RuntimeConfig {
    let mut network = Network::from_name("localhost").unwrap();
    network.rpc_url = ctx.rpc_url.clone();

    RuntimeConfig {
        network,
        private_key: None,
        deployer: None,
        deployments_file: dir.join("deployments.json"),
        address_book_file: dir.join("addresses.json"),
        migrations_file: dir.join("contract-migrations.json"),
        artifacts_dir: dir.join("artifacts"),
        max_batch: 8,
        clean: false,
    }
}

/// A deployments file naming every non-unit contract, with distinct dummy
/// addresses. None of them has code; useful for exercising error paths.
pub fn write_dummy_deployments(path: &Path) {
    let entries: Vec<String> = ContractKey::ALL
        .iter()
        .filter(|k| !k.is_unit())
        .enumerate()
        .map(|(i, k)| {
            format!(
                "  \"{}\": \"{}\"",
                k.as_str(),
                Address::with_last_byte(i as u8 + 1)
            )
        })
        .collect();
    write_json(path, &format!("{{\n{}\n}}", entries.join(",\n")));
}
