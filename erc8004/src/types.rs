//! Core domain types returned by the registry handles.

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::TransactionReceipt;

use crate::error::Result;
use crate::events::mint_token_id;

/// On-chain identity of a registered agent, assembled from read-only calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    /// The ERC-721 token ID assigned at mint time.
    pub agent_id: U256,
    /// Current owner of the agent token.
    pub owner: Address,
    /// The `agentURI` stored as the token URI.
    pub uri: String,
    /// Wallet the agent has delegated to (zero if unset).
    pub wallet: Address,
}

/// Where a confirmed transaction landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// Hash of the confirmed transaction.
    pub tx_hash: B256,
    /// Block the transaction was included in, when the node reports it.
    pub block_number: Option<u64>,
}

impl From<&TransactionReceipt> for Confirmation {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        }
    }
}

/// Result of a successful `register(agentURI)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredAgent {
    /// The newly minted agent ID, taken from the mint `Transfer` event.
    pub agent_id: U256,
    /// The confirmed registration transaction.
    pub confirmation: Confirmation,
}

impl RegisteredAgent {
    /// Read the minted agent ID from a confirmed `register` receipt.
    ///
    /// The ID comes from the mint `Transfer` event rather than the call's
    /// return value, which a mined transaction does not expose.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EventNotFound`] if the receipt has no mint.
    pub fn from_receipt(receipt: &TransactionReceipt) -> Result<Self> {
        Ok(Self {
            agent_id: mint_token_id(receipt.inner.logs(), receipt.transaction_hash)?,
            confirmation: Confirmation::from(receipt),
        })
    }
}
