use alloy::providers::{Provider, ProviderBuilder};
use anyhow::Result;

/// Read-only provider, no signer attached.
pub fn read_provider(rpc_url: &str) -> Result<impl Provider + Clone + use<>> {
    Ok(ProviderBuilder::new().connect_http(rpc_url.parse()?))
}

/// Provider with the deployer's wallet attached, for unit deployment and
/// owner-signed execution.
pub fn make_provider(private_key: &str, rpc_url: &str) -> Result<impl Provider + Clone + use<>> {
    let signer: alloy::signers::local::PrivateKeySigner = private_key
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid key: {e}"))?;
    let wallet = alloy::network::EthereumWallet::from(signer);
    Ok(ProviderBuilder::new()
        .wallet(wallet)
        .connect_http(rpc_url.parse()?))
}
