#![allow(clippy::print_stdout)]
//! Register an agent on a local Identity Registry and request its validation.
//!
//! Usage:
//!   cargo run --example `register_agent`
//!
//! Set `PRIVATE_KEY` to a funded dev account. Expects an Anvil node at
//! `127.0.0.1:8545` with the registries deployed as the first two contracts.

use alloy::{
    network::EthereumWallet, primitives::address, providers::ProviderBuilder,
    signers::local::PrivateKeySigner,
};
use erc8004::{
    Erc8004, NetworkAddresses,
    networks::LOCAL_RPC_URL,
    validation::{ValidationRequestParams, snapshot_id},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let signer: PrivateKeySigner = std::env::var("PRIVATE_KEY")?.parse()?;
    let sender = signer.address();

    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(LOCAL_RPC_URL.parse()?);

    let client = Erc8004::new(provider)
        .with_addresses(NetworkAddresses::LOCAL_DEVNET)
        .with_sender(sender);

    let agent_uri = "https://weather-bot.example.com/erc8004.json";
    let registered = client.identity()?.register_with_uri(agent_uri).await?;
    println!(
        "Registered agent #{} in tx {}",
        registered.agent_id, registered.confirmation.tx_hash
    );

    let params = ValidationRequestParams::for_snapshot(
        address!("90F79bf6EB2c4f870365E785982E1f101E93b906"),
        registered.agent_id,
        agent_uri,
        snapshot_id(client.block_number().await?),
    );
    let submitted = client.validation()?.validation_request(&params).await?;
    println!(
        "Validation requested with hash {} ({} event(s))",
        params.request_hash,
        submitted.events.len()
    );

    Ok(())
}
