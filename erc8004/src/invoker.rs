//! Submission of state-changing contract calls.
//!
//! A call is sent exactly once. The nonce is read from the node right before
//! broadcasting, and confirmation waiting is bounded by a [`WaitPolicy`].
//! Nothing here retries: a second submission could mint or request twice.

use std::fmt;
use std::time::Duration;

use alloy::contract::{CallBuilder, CallDecoder};
use alloy::network::Ethereum;
use alloy::primitives::{Address, B256};
use alloy::providers::{
    PendingTransactionBuilder, PendingTransactionError, Provider, WatchTxError,
};
use alloy::rpc::types::TransactionReceipt;

use crate::error::{Error, Result};

/// How long to wait for a receipt and how often to poll for it.
///
/// The poll interval is applied to the RPC client when the provider is built;
/// the invoker enforces `max_wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Upper bound on the time between broadcast and receipt.
    pub max_wait: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(120),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Sends calls on behalf of a single sender account.
#[derive(Debug, Clone, Copy)]
pub struct Invoker<'a, P> {
    provider: &'a P,
    sender: Address,
    policy: WaitPolicy,
}

impl<'a, P: Provider> Invoker<'a, P> {
    /// Create an invoker for `sender`. The provider must hold its signing key.
    #[must_use]
    pub const fn new(provider: &'a P, sender: Address, policy: WaitPolicy) -> Self {
        Self {
            provider,
            sender,
            policy,
        }
    }

    /// The account that signs and pays for submitted calls.
    #[must_use]
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// Sign and broadcast `call` without waiting for it to be mined.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the nonce cannot be fetched.
    /// - [`Error::Contract`] if encoding, signing or broadcasting fails.
    pub async fn submit<T, D>(&self, call: CallBuilder<T, D>) -> Result<Submission>
    where
        T: Provider,
        D: CallDecoder,
    {
        let nonce = self.provider.get_transaction_count(self.sender).await?;
        let pending = pin_sender(call, self.sender, nonce).send().await?;
        Ok(Submission {
            tx_hash: *pending.tx_hash(),
            pending,
            max_wait: self.policy.max_wait,
        })
    }

    /// Sign, broadcast and wait for `call` to be mined.
    ///
    /// # Errors
    ///
    /// Any error of [`Invoker::submit`] or [`Submission::confirm`].
    pub async fn send<T, D>(&self, call: CallBuilder<T, D>) -> Result<TransactionReceipt>
    where
        T: Provider,
        D: CallDecoder,
    {
        self.submit(call).await?.confirm().await
    }
}

/// A broadcast transaction whose receipt has not been seen yet.
///
/// Dropping it does not cancel anything: the transaction stays in the mempool.
pub struct Submission {
    pending: PendingTransactionBuilder<Ethereum>,
    tx_hash: B256,
    max_wait: Duration,
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("tx_hash", &self.tx_hash)
            .field("max_wait", &self.max_wait)
            .finish_non_exhaustive()
    }
}

impl Submission {
    /// Hash of the broadcast transaction.
    #[must_use]
    pub const fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    /// Block until the receipt arrives or the wait policy runs out.
    ///
    /// # Errors
    ///
    /// - [`Error::ConfirmationTimeout`] if no receipt arrives in time.
    /// - [`Error::PendingTransaction`] for other watcher failures.
    /// - [`Error::Reverted`] if the transaction was mined but failed.
    pub async fn confirm(self) -> Result<TransactionReceipt> {
        let Self {
            pending,
            tx_hash,
            max_wait,
        } = self;

        let receipt = pending
            .with_timeout(Some(max_wait))
            .get_receipt()
            .await
            .map_err(|e| watch_error(e, tx_hash, max_wait))?;
        ensure_success(receipt, tx_hash)
    }
}

/// Fix `from` and `nonce` so the node and the fillers cannot pick other values.
fn pin_sender<T, D>(call: CallBuilder<T, D>, sender: Address, nonce: u64) -> CallBuilder<T, D>
where
    T: Provider,
    D: CallDecoder,
{
    call.from(sender).nonce(nonce)
}

fn watch_error(error: PendingTransactionError, tx_hash: B256, waited: Duration) -> Error {
    match error {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
            Error::ConfirmationTimeout { tx_hash, waited }
        }
        other => Error::PendingTransaction(other),
    }
}

fn ensure_success(receipt: TransactionReceipt, tx_hash: B256) -> Result<TransactionReceipt> {
    if receipt.status() {
        Ok(receipt)
    } else {
        Err(Error::Reverted { tx_hash })
    }
}
