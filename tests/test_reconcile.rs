mod anvil_common;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;

use chainwright::engine::error::PassError;
use chainwright::engine::{RunMode, reconcile};
use chainwright::model::resource::ContractKey;

use anvil_common::*;

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore] // Requires Anvil
async fn test_missing_core_deployment_is_reported() {
    let ctx = spawn_local();
    let dir = test_dir("missing-core");

    // No deployments file at all: the first required contract is the
    // one the error must name.
    let config = make_config(&ctx, &dir);
    let err = reconcile(config, RunMode::Plan).await.unwrap_err();

    match err {
        PassError::MissingDeployment(missing) => {
            assert_eq!(missing.0, ContractKey::StrategyRegistry);
        }
        other => panic!("expected MissingDeployment, got {other}"),
    }
}

#[tokio::test]
#[ignore] // Requires Anvil
async fn test_baseline_read_failure_is_typed() {
    let ctx = spawn_local();
    let dir = test_dir("baseline");

    // Every contract named, none deployed: the management-set read hits
    // a codeless address and must come back as a baseline failure, not
    // a generic error.
    write_dummy_deployments(&make_config(&ctx, &dir).deployments_file);
    let config = make_config(&ctx, &dir);
    let err = reconcile(config, RunMode::Plan).await.unwrap_err();

    assert!(
        matches!(err, PassError::BaselineRead(_)),
        "expected BaselineRead, got {err}"
    );
}

#[tokio::test]
#[ignore] // Requires Anvil
async fn test_impersonated_account_can_send() {
    let ctx = spawn_local();
    let ghost = Address::with_last_byte(0x42);
    let sink = Address::with_last_byte(0x43);
    let one_eth = U256::from(10u128.pow(18));

    // 1. Fund an account no one holds keys for
    fund_eth(&ctx.rpc_url, ghost, U256::from(5u128 * 10u128.pow(18))).await;

    // 2. Impersonate it and send through a walletless provider, the way
    //    owner calls go out on a development chain
    impersonate(&ctx.rpc_url, ghost).await;
    let provider = ProviderBuilder::new().connect_http(ctx.rpc_url.parse().unwrap());
    let tx = TransactionRequest::default()
        .with_from(ghost)
        .with_to(sink)
        .with_value(one_eth);
    provider
        .send_transaction(tx)
        .await
        .expect("impersonated send failed")
        .get_receipt()
        .await
        .expect("impersonated receipt failed");
    stop_impersonating(&ctx.rpc_url, ghost).await;

    // 3. The transfer landed
    let balance = provider.get_balance(sink).await.expect("balance query failed");
    assert_eq!(balance, one_eth);
}
