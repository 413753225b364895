//! Handle for the Validation Registry and request-hash derivation.

use std::fmt;

use alloy::primitives::{Address, B256, U256, keccak256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionReceipt;

use crate::contracts::IValidationRegistry::{
    self, IValidationRegistryInstance, ValidationRequest, ValidationResponse,
};
use crate::error::{Error, Result};
use crate::events::{self, DecodedEvent, EventIter, TopicFilter};
use crate::invoker::{Invoker, Submission, WaitPolicy};
use crate::types::Confirmation;

/// The string hashed into a request hash: `"{agent_uri}:{snapshot_id}"`.
#[must_use]
pub fn request_hash_input(agent_uri: &str, snapshot_id: u64) -> String {
    format!("{agent_uri}:{snapshot_id}")
}

/// Keccak-256 of the UTF-8 bytes of [`request_hash_input`].
#[must_use]
pub fn request_hash(agent_uri: &str, snapshot_id: u64) -> B256 {
    keccak256(request_hash_input(agent_uri, snapshot_id).as_bytes())
}

/// Snapshot a request against the block before the current head.
#[must_use]
pub const fn snapshot_id(head: u64) -> u64 {
    head.saturating_sub(1)
}

/// Arguments of a `validationRequest` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequestParams {
    /// Validator asked to check the agent.
    pub validator: Address,
    /// Agent under validation.
    pub agent_id: U256,
    /// URI the validator should inspect.
    pub request_uri: String,
    /// Commitment identifying this request.
    pub request_hash: B256,
    /// Block height the request refers to.
    pub snapshot_id: u64,
}

impl ValidationRequestParams {
    /// Build a request whose hash commits to `agent_uri` at `snapshot_id`.
    #[must_use]
    pub fn for_snapshot(
        validator: Address,
        agent_id: U256,
        agent_uri: impl Into<String>,
        snapshot_id: u64,
    ) -> Self {
        let request_uri = agent_uri.into();
        let request_hash = request_hash(&request_uri, snapshot_id);
        Self {
            validator,
            agent_id,
            request_uri,
            request_hash,
            snapshot_id,
        }
    }
}

/// A confirmed `validationRequest` transaction and the events it emitted.
#[derive(Debug, Clone)]
pub struct SubmittedRequest {
    /// Where the transaction was mined.
    pub confirmation: Confirmation,
    /// Every `ValidationRequest` event in the receipt, in emission order.
    pub events: Vec<DecodedEvent<ValidationRequest>>,
}

impl SubmittedRequest {
    /// Decode the `ValidationRequest` events of a confirmed receipt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] if there are none, or
    /// [`Error::Decode`] if one is malformed.
    pub fn from_receipt(receipt: &TransactionReceipt) -> Result<Self> {
        let events = events::decode_logs::<ValidationRequest>(receipt.inner.logs())?;
        if events.is_empty() {
            return Err(Error::EventNotFound {
                event: "ValidationRequest",
                tx_hash: receipt.transaction_hash,
            });
        }
        Ok(Self {
            confirmation: Confirmation::from(receipt),
            events,
        })
    }
}

/// Exact-match filter over the indexed fields of `ValidationResponse`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseFilter {
    /// Only responses from this validator.
    pub validator: Option<Address>,
    /// Only responses about this agent.
    pub agent_id: Option<U256>,
    /// Only responses to this request.
    pub request_hash: Option<B256>,
}

impl ResponseFilter {
    /// Whether no field is constrained.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.validator.is_none() && self.agent_id.is_none() && self.request_hash.is_none()
    }

    /// Topic constraints in the event's indexed-field order.
    #[must_use]
    pub fn topics(&self) -> TopicFilter {
        let mut filter = TopicFilter::new();
        if let Some(v) = self.validator {
            filter = filter.topic1(events::address_topic(v));
        }
        if let Some(id) = self.agent_id {
            filter = filter.topic2(events::uint_topic(id));
        }
        if let Some(h) = self.request_hash {
            filter = filter.topic3(h);
        }
        filter
    }
}

/// Borrowed view of the Validation Registry, obtained from [`crate::Erc8004::validation`].
pub struct ValidationRegistry<'a, P> {
    contract: IValidationRegistryInstance<&'a P>,
    provider: &'a P,
    sender: Option<Address>,
    policy: WaitPolicy,
}

impl<P: Provider> fmt::Debug for ValidationRegistry<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRegistry")
            .field("address", self.contract.address())
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl<'a, P: Provider> ValidationRegistry<'a, P> {
    pub(crate) fn new(
        address: Address,
        provider: &'a P,
        sender: Option<Address>,
        policy: WaitPolicy,
    ) -> Self {
        Self {
            contract: IValidationRegistry::new(address, provider),
            provider,
            sender,
            policy,
        }
    }

    /// The registry contract address.
    #[must_use]
    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    /// Broadcast `validationRequest` without waiting for it to be mined.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSender`] before any I/O if no sender is
    /// configured, or any error of [`Invoker::submit`].
    pub async fn submit_request(&self, params: &ValidationRequestParams) -> Result<Submission> {
        let sender = self.sender.ok_or(Error::MissingSender)?;
        let call = self.contract.validationRequest(
            params.validator,
            params.agent_id,
            params.request_uri.clone(),
            params.request_hash,
            params.snapshot_id,
        );
        Invoker::new(self.provider, sender, self.policy)
            .submit(call)
            .await
    }

    /// Submit a validation request and decode the `ValidationRequest` events it emitted.
    ///
    /// # Errors
    ///
    /// Any error of [`ValidationRegistry::submit_request`],
    /// [`Submission::confirm`] or [`SubmittedRequest::from_receipt`].
    pub async fn validation_request(
        &self,
        params: &ValidationRequestParams,
    ) -> Result<SubmittedRequest> {
        let receipt = self.submit_request(params).await?.confirm().await?;
        SubmittedRequest::from_receipt(&receipt)
    }

    /// Historical `ValidationResponse` events from `from_block` to the head.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the log query fails.
    pub async fn responses(
        &self,
        filter: &ResponseFilter,
        from_block: u64,
    ) -> Result<EventIter<ValidationResponse>> {
        events::query(self.provider, self.address(), from_block, filter.topics()).await
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{LogData, address};
    use alloy::rpc::types::Log;
    use alloy::sol_types::SolEvent;

    use super::*;

    #[test]
    fn hash_input_joins_uri_and_snapshot() {
        assert_eq!(
            request_hash_input("https://example.com/agent", 99),
            "https://example.com/agent:99",
            "input format is uri, colon, decimal snapshot"
        );
        assert_eq!(
            request_hash("https://example.com/agent", 99),
            keccak256(b"https://example.com/agent:99"),
            "hash is keccak256 of the UTF-8 input"
        );
    }

    #[test]
    fn request_hash_is_deterministic_and_input_sensitive() {
        let uris = ["https://example.com/agent", "https://example.com/agent2", ""];
        let mut seen = std::collections::HashSet::new();
        for uri in uris {
            for snapshot in [0, 1, 99, 100, u64::MAX] {
                let h = request_hash(uri, snapshot);
                assert_eq!(h, request_hash(uri, snapshot), "same input, same hash");
                assert!(seen.insert(h), "collision for {uri:?} at {snapshot}");
            }
        }
    }

    #[test]
    fn snapshot_is_previous_block_clamped_at_genesis() {
        assert_eq!(snapshot_id(100), 99, "one block behind head");
        assert_eq!(snapshot_id(1), 0, "block one snapshots genesis");
        assert_eq!(snapshot_id(0), 0, "never underflows");
    }

    #[test]
    fn params_commit_to_uri_and_snapshot() {
        let validator = address!("90F79bf6EB2c4f870365E785982E1f101E93b906");
        let params =
            ValidationRequestParams::for_snapshot(validator, U256::from(1), "ipfs://agent", 41);
        assert_eq!(params.request_hash, request_hash("ipfs://agent", 41), "hash matches inputs");
        assert_eq!(params.request_uri, "ipfs://agent", "uri is sent as-is");
    }

    fn response_log(agent_id: u64, block: u64) -> Log {
        let event = ValidationResponse {
            validatorAddress: address!("90F79bf6EB2c4f870365E785982E1f101E93b906"),
            agentId: U256::from(agent_id),
            requestHash: request_hash("https://example.com/agent", block),
            response: 1,
            responseURI: format!("https://validator.example/{agent_id}"),
            responseHash: B256::repeat_byte(0xab),
            tag: "demo".to_owned(),
        };
        Log {
            inner: alloy::primitives::Log {
                address: address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
                data: event.encode_log_data(),
            },
            block_number: Some(block),
            ..Default::default()
        }
    }

    #[test]
    fn agent_filter_keeps_only_that_agent() {
        let mut logs: Vec<Log> = [3, 5, 7, 5, 11, 5, 2]
            .iter()
            .enumerate()
            .map(|(i, id)| response_log(*id, 10 + i as u64))
            .collect();
        // An unrelated event in the same range.
        logs.push(Log {
            inner: alloy::primitives::Log {
                address: Address::ZERO,
                data: LogData::new_unchecked(
                    vec![ValidationRequest::SIGNATURE_HASH],
                    Default::default(),
                ),
            },
            ..Default::default()
        });

        let filter = ResponseFilter {
            agent_id: Some(U256::from(5)),
            ..ResponseFilter::default()
        };
        let events: Vec<_> = EventIter::<ValidationResponse>::new(logs, filter.topics())
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(events.len(), 3, "three responses concern agent 5");
        assert!(
            events.iter().all(|e| e.event.agentId == U256::from(5)),
            "every decoded record is for agent 5"
        );
        let blocks: Vec<_> = events.iter().filter_map(|e| e.block_number).collect();
        assert_eq!(blocks, vec![11, 13, 15], "emission order is preserved");
    }

    #[test]
    fn request_hash_filter_targets_third_topic() {
        let wanted = request_hash("https://example.com/agent", 12);
        let logs: Vec<Log> = (10..15).map(|b| response_log(5, b)).collect();
        let filter = ResponseFilter {
            request_hash: Some(wanted),
            ..ResponseFilter::default()
        };
        let events: Vec<_> = EventIter::<ValidationResponse>::new(logs, filter.topics())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(events.len(), 1, "a single response matches the hash");
        assert_eq!(events[0].event.requestHash, wanted, "matched by request hash");
    }

    #[test]
    fn empty_filter_has_no_topics() {
        assert!(ResponseFilter::default().is_empty(), "default is unconstrained");
        assert!(ResponseFilter::default().topics().is_empty(), "no topic constraints");
    }

    #[tokio::test]
    async fn registry_responses_for_agent_five() {
        use alloy::providers::ProviderBuilder;
        use alloy::transports::mock::Asserter;

        use crate::Erc8004;
        use crate::networks::NetworkAddresses;

        let asserter = Asserter::new();
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter.clone());
        let client = Erc8004::new(provider).with_addresses(NetworkAddresses::LOCAL_DEVNET);
        let registry = client.validation().unwrap();

        let logs: Vec<Log> = [3, 5, 7, 5, 11, 5, 2]
            .iter()
            .enumerate()
            .map(|(i, id)| response_log(*id, 100 + i as u64))
            .collect();
        asserter.push_success(&logs);

        let filter = ResponseFilter {
            agent_id: Some(U256::from(5)),
            ..ResponseFilter::default()
        };
        let events = registry
            .responses(&filter, 90)
            .await
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(events.len(), 3, "three of seven responses concern agent 5");
        assert!(
            events.iter().all(|e| e.event.agentId == U256::from(5)),
            "no other agent leaks through"
        );
        let debug = format!("{registry:?}");
        assert!(
            debug.starts_with("ValidationRegistry") && debug.contains("address"),
            "handle debug names the contract: {debug}"
        );
    }
}
