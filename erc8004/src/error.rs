//! Error type shared by every client operation.

use std::time::Duration;

use alloy::primitives::B256;
use alloy::providers::PendingTransactionError;
use alloy::transports::TransportError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the ERC-8004 client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No contract address was configured for the requested registry.
    #[error("{0} registry address is not configured")]
    MissingAddress(&'static str),

    /// A state-changing call was attempted without a sender account.
    #[error("no sender account configured for state-changing calls")]
    MissingSender,

    /// The receipt did not contain the expected event.
    #[error("{event} event not found in receipt of {tx_hash}")]
    EventNotFound {
        /// Name of the event that was expected.
        event: &'static str,
        /// Transaction whose receipt was searched.
        tx_hash: B256,
    },

    /// The transaction was broadcast but no receipt arrived within the wait policy.
    #[error("transaction {tx_hash} not confirmed within {waited:?}")]
    ConfirmationTimeout {
        /// Hash of the submitted transaction.
        tx_hash: B256,
        /// How long the client waited before giving up.
        waited: Duration,
    },

    /// The transaction was mined but reverted.
    #[error("transaction {tx_hash} reverted")]
    Reverted {
        /// Hash of the reverted transaction.
        tx_hash: B256,
    },

    /// JSON-RPC transport failure.
    #[error("rpc transport: {0}")]
    Transport(#[from] TransportError),

    /// Contract call or submission failure.
    #[error("contract call: {0}")]
    Contract(#[from] alloy::contract::Error),

    /// Failure while waiting on a pending transaction.
    #[error("pending transaction: {0}")]
    PendingTransaction(#[from] PendingTransactionError),

    /// A log matched an event signature but could not be decoded.
    #[error("event decoding: {0}")]
    Decode(#[from] alloy::sol_types::Error),
}
