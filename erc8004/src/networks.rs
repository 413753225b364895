//! Registry address sets for known deployments.
//!
//! A fresh Anvil or Hardhat node deploys contracts at addresses derived from
//! the deployer account and its nonce, so the first two deployments made by
//! the default dev account always land at the same addresses.

use alloy::primitives::{Address, address};

/// EIP-155 chain ID used by Anvil and Hardhat local nodes.
pub const LOCAL_CHAIN_ID: u64 = 31_337;

/// Default JSON-RPC endpoint of a local development node.
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

/// Contract addresses for one deployment of the registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkAddresses {
    /// The Identity Registry (ERC-721) contract address.
    pub identity: Address,
    /// The Validation Registry contract address.
    pub validation: Address,
}

impl NetworkAddresses {
    /// Registries deployed as the first two contracts on a local dev node.
    pub const LOCAL_DEVNET: Self = Self {
        identity: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
        validation: address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
    };

    /// Returns the `eip155:{chainId}:{identityRegistry}` agent registry identifier.
    #[must_use]
    pub fn agent_registry(&self, chain_id: u64) -> String {
        format!("eip155:{chain_id}:{}", self.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_registry_uses_checksummed_identity() {
        let id = NetworkAddresses::LOCAL_DEVNET.agent_registry(LOCAL_CHAIN_ID);
        assert_eq!(
            id, "eip155:31337:0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "registry identifier should embed the checksummed address"
        );
    }
}
