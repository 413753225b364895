#![allow(clippy::print_stdout)]
//! Read an agent's on-chain identity from a local Identity Registry.
//!
//! Usage:
//!   cargo run --example `query_agent`
//!
//! Expects an Anvil node at `127.0.0.1:8545` with the registries deployed
//! as the first two contracts, and agent #1 already registered.

use alloy::{primitives::U256, providers::ProviderBuilder};
use erc8004::{Erc8004, NetworkAddresses, networks::LOCAL_RPC_URL};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = ProviderBuilder::new().connect_http(LOCAL_RPC_URL.parse()?);
    let client = Erc8004::new(provider).with_addresses(NetworkAddresses::LOCAL_DEVNET);

    let head = client.block_number().await?;
    println!("Chain head: {head}");

    let agent = client.identity()?.agent(U256::from(1)).await?;
    println!("Agent #{}", agent.agent_id);
    println!("  Owner:  {}", agent.owner);
    println!("  URI:    {}", agent.uri);
    println!("  Wallet: {}", agent.wallet);

    Ok(())
}
