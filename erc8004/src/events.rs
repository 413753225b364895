//! Event extraction from receipts and historical log queries.
//!
//! Receipt extraction is synchronous over already-fetched logs. Historical
//! extraction performs exactly one `eth_getLogs` round trip and hands back an
//! [`EventIter`] that decodes lazily and cannot be restarted.

use std::marker::PhantomData;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;

use crate::contracts::IIdentityRegistry::Transfer;
use crate::error::{Error, Result};

/// A log decoded against a known event schema, with its on-chain position.
#[derive(Debug, Clone)]
pub struct DecodedEvent<E> {
    /// The decoded event payload.
    pub event: E,
    /// Contract that emitted the log.
    pub address: Address,
    /// Block the log was included in.
    pub block_number: Option<u64>,
    /// Transaction that emitted the log.
    pub tx_hash: Option<B256>,
    /// Position of the log within its block.
    pub log_index: Option<u64>,
}

impl<E: SolEvent> DecodedEvent<E> {
    /// Decode a single log. The caller is expected to have checked the signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if topics or data do not fit the schema.
    pub fn decode(log: &Log) -> Result<Self> {
        let decoded = log.log_decode::<E>()?;
        Ok(Self {
            event: decoded.inner.data,
            address: log.address(),
            block_number: log.block_number,
            tx_hash: log.transaction_hash,
            log_index: log.log_index,
        })
    }
}

/// Whether `log` carries the signature topic of event `E`.
#[must_use]
pub fn matches_signature<E: SolEvent>(log: &Log) -> bool {
    log.topic0() == Some(&E::SIGNATURE_HASH)
}

/// Decode every log in `logs` whose signature matches `E`, in emission order.
///
/// # Errors
///
/// Returns [`Error::Decode`] if a signature-matching log is malformed.
pub fn decode_logs<E: SolEvent>(logs: &[Log]) -> Result<Vec<DecodedEvent<E>>> {
    logs.iter()
        .filter(|log| matches_signature::<E>(log))
        .map(DecodedEvent::decode)
        .collect()
}

/// Find the token ID minted in a receipt.
///
/// Only `Transfer` logs whose `from` is the zero address count as mints. Other
/// transfer-shaped logs, including ERC-20 transfers that share the signature
/// but not the topic layout, are skipped.
///
/// # Errors
///
/// Returns [`Error::EventNotFound`] when no mint log is present.
pub fn mint_token_id(logs: &[Log], tx_hash: B256) -> Result<U256> {
    logs.iter()
        .filter(|log| matches_signature::<Transfer>(log))
        .filter_map(|log| DecodedEvent::<Transfer>::decode(log).ok())
        .find(|decoded| decoded.event.from == Address::ZERO)
        .map(|decoded| decoded.event.tokenId)
        .ok_or(Error::EventNotFound {
            event: "Transfer (mint)",
            tx_hash,
        })
}

/// Encode an indexed `address` the way it appears in a topic.
#[must_use]
pub fn address_topic(address: Address) -> B256 {
    address.into_word()
}

/// Encode an indexed `uint256` the way it appears in a topic.
#[must_use]
pub fn uint_topic(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

/// Exact-match constraints on the indexed topics of an event.
///
/// Position 0 is always the event signature; positions 1 to 3 hold indexed
/// fields in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicFilter {
    topics: [Option<B256>; 3],
}

impl TopicFilter {
    /// A filter that accepts every log.
    #[must_use]
    pub const fn new() -> Self {
        Self { topics: [None; 3] }
    }

    /// Require the first indexed field to equal `value`.
    #[must_use]
    pub const fn topic1(mut self, value: B256) -> Self {
        self.topics[0] = Some(value);
        self
    }

    /// Require the second indexed field to equal `value`.
    #[must_use]
    pub const fn topic2(mut self, value: B256) -> Self {
        self.topics[1] = Some(value);
        self
    }

    /// Require the third indexed field to equal `value`.
    #[must_use]
    pub const fn topic3(mut self, value: B256) -> Self {
        self.topics[2] = Some(value);
        self
    }

    /// Whether no field is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.iter().all(Option::is_none)
    }

    /// Push the constraints into an RPC log filter.
    #[must_use]
    pub fn apply(&self, mut filter: Filter) -> Filter {
        let [t1, t2, t3] = self.topics;
        if let Some(t) = t1 {
            filter = filter.topic1(t);
        }
        if let Some(t) = t2 {
            filter = filter.topic2(t);
        }
        if let Some(t) = t3 {
            filter = filter.topic3(t);
        }
        filter
    }

    /// Whether `log` satisfies every constraint.
    #[must_use]
    pub fn matches(&self, log: &Log) -> bool {
        let topics = log.topics();
        self.topics
            .iter()
            .zip(topics.iter().skip(1).map(Some).chain(std::iter::repeat(None)))
            .all(|(want, got)| want.is_none_or(|w| got == Some(&w)))
    }
}

/// Lazily decoded events from a single historical query.
///
/// Logs that do not carry `E`'s signature or fail the [`TopicFilter`] are
/// skipped, so a node that ignores topic filters still yields only matching
/// records.
#[derive(Debug)]
pub struct EventIter<E> {
    logs: std::vec::IntoIter<Log>,
    filter: TopicFilter,
    _event: PhantomData<fn() -> E>,
}

impl<E> EventIter<E> {
    /// Wrap already-fetched logs.
    #[must_use]
    pub fn new(logs: Vec<Log>, filter: TopicFilter) -> Self {
        Self {
            logs: logs.into_iter(),
            filter,
            _event: PhantomData,
        }
    }
}

impl<E: SolEvent> Iterator for EventIter<E> {
    type Item = Result<DecodedEvent<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        for log in self.logs.by_ref() {
            if matches_signature::<E>(&log) && self.filter.matches(&log) {
                return Some(DecodedEvent::decode(&log));
            }
        }
        None
    }
}

/// Query logs of event `E` emitted by `address` from `from_block` to the chain head.
///
/// # Errors
///
/// Returns [`Error::Transport`] if the `eth_getLogs` call fails.
pub async fn query<P, E>(
    provider: &P,
    address: Address,
    from_block: u64,
    filter: TopicFilter,
) -> Result<EventIter<E>>
where
    P: Provider,
    E: SolEvent,
{
    let logs = provider
        .get_logs(&log_filter::<E>(address, from_block, &filter))
        .await?;
    Ok(EventIter::new(logs, filter))
}

/// The `eth_getLogs` filter for event `E` of `address` from `from_block` onward.
#[must_use]
pub fn log_filter<E: SolEvent>(address: Address, from_block: u64, topics: &TopicFilter) -> Filter {
    topics.apply(
        Filter::new()
            .address(address)
            .event_signature(E::SIGNATURE_HASH)
            .from_block(from_block),
    )
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{LogData, address};

    use super::*;

    const REGISTRY: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

    fn rpc_log(data: LogData, index: u64) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: REGISTRY,
                data,
            },
            block_number: Some(7),
            log_index: Some(index),
            ..Default::default()
        }
    }

    fn transfer(from: Address, to: Address, id: u64, index: u64) -> Log {
        let event = Transfer {
            from,
            to,
            tokenId: U256::from(id),
        };
        rpc_log(event.encode_log_data(), index)
    }

    #[test]
    fn mint_is_the_transfer_from_zero() {
        let owner = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let other = address!("90F79bf6EB2c4f870365E785982E1f101E93b906");
        let logs = vec![
            transfer(owner, other, 3, 0),
            transfer(Address::ZERO, owner, 4, 1),
            transfer(other, owner, 5, 2),
        ];
        let id = mint_token_id(&logs, B256::ZERO).unwrap();
        assert_eq!(id, U256::from(4), "only the zero-address transfer is a mint");
    }

    #[test]
    fn missing_mint_is_event_not_found() {
        let a = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let b = address!("90F79bf6EB2c4f870365E785982E1f101E93b906");
        let logs = vec![transfer(a, b, 1, 0), transfer(b, a, 1, 1)];
        let err = mint_token_id(&logs, B256::ZERO).unwrap_err();
        assert!(
            matches!(err, Error::EventNotFound { .. }),
            "expected EventNotFound, got {err}"
        );
        assert!(
            matches!(mint_token_id(&[], B256::ZERO), Err(Error::EventNotFound { .. })),
            "an empty receipt has no mint"
        );
    }

    #[test]
    fn erc20_shaped_transfer_is_ignored() {
        // Same signature, but only two indexed topics and the amount in data.
        let erc20 = LogData::new_unchecked(
            vec![
                Transfer::SIGNATURE_HASH,
                address_topic(Address::ZERO),
                address_topic(REGISTRY),
            ],
            U256::from(1_000).to_be_bytes_vec().into(),
        );
        let owner = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let logs = vec![rpc_log(erc20, 0), transfer(Address::ZERO, owner, 9, 1)];
        assert_eq!(
            mint_token_id(&logs, B256::ZERO).unwrap(),
            U256::from(9),
            "ERC-20 transfer must not be mistaken for the mint"
        );
    }

    #[test]
    fn decode_logs_preserves_emission_order() {
        let owner = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let logs: Vec<_> = (0..4)
            .map(|i| transfer(Address::ZERO, owner, 10 + i, i))
            .collect();
        let ids: Vec<_> = decode_logs::<Transfer>(&logs)
            .unwrap()
            .into_iter()
            .map(|d| d.event.tokenId)
            .collect();
        let expected: Vec<_> = (10..14u64).map(U256::from).collect();
        assert_eq!(ids, expected, "decoded order should follow the receipt");
    }

    #[test]
    fn topic_filter_rejects_mismatched_and_short_logs() {
        let owner = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let log = transfer(Address::ZERO, owner, 1, 0);

        assert!(TopicFilter::new().matches(&log), "empty filter accepts all");
        assert!(
            TopicFilter::new()
                .topic2(address_topic(owner))
                .matches(&log),
            "exact match on the second indexed field"
        );
        assert!(
            !TopicFilter::new()
                .topic3(uint_topic(U256::from(2)))
                .matches(&log),
            "different token id must be rejected"
        );

        let short = rpc_log(
            LogData::new_unchecked(vec![Transfer::SIGNATURE_HASH], Default::default()),
            0,
        );
        assert!(
            !TopicFilter::new().topic1(B256::ZERO).matches(&short),
            "a log lacking the constrained topic cannot match"
        );
    }

    #[test]
    fn uint_topic_is_big_endian_word() {
        let topic = uint_topic(U256::from(5));
        assert_eq!(topic.0[31], 5, "low byte last");
        assert!(topic.0[..31].iter().all(|b| *b == 0), "left padded with zeros");
    }

    #[test]
    fn log_filter_scopes_address_signature_and_range() {
        let owner = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let topics = TopicFilter::new()
            .topic2(address_topic(owner))
            .topic3(uint_topic(U256::from(9)));
        let filter = log_filter::<Transfer>(REGISTRY, 120, &topics);

        assert_eq!(filter.get_from_block(), Some(120), "starts at the requested block");
        assert!(filter.address.matches(&REGISTRY), "registry address included");
        assert!(!filter.address.matches(&owner), "other contracts excluded");
        assert!(
            filter.topics[0].matches(&Transfer::SIGNATURE_HASH),
            "signature is topic 0"
        );
        assert!(!filter.topics[0].matches(&B256::ZERO), "other events excluded");
        assert!(filter.topics[1].is_empty(), "unconstrained field is a wildcard");
        assert!(filter.topics[2].matches(&address_topic(owner)), "second indexed field");
        assert!(filter.topics[3].matches(&uint_topic(U256::from(9))), "third indexed field");
        assert!(
            !filter.topics[3].matches(&uint_topic(U256::from(8))),
            "third indexed field is exact"
        );
    }

    #[tokio::test]
    async fn query_refilters_what_the_node_returns() {
        use alloy::providers::ProviderBuilder;
        use alloy::transports::mock::Asserter;

        let owner = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter.clone());

        // A node that ignores topic filters and returns everything.
        asserter.push_success(&vec![
            transfer(Address::ZERO, owner, 1, 0),
            transfer(Address::ZERO, Address::ZERO, 2, 1),
            transfer(Address::ZERO, owner, 3, 2),
        ]);

        let topics = TopicFilter::new().topic2(address_topic(owner));
        let ids: Vec<_> = query::<_, Transfer>(&provider, REGISTRY, 0, topics)
            .await
            .unwrap()
            .map(|decoded| decoded.unwrap().event.tokenId)
            .collect();
        assert_eq!(ids, vec![U256::from(1), U256::from(3)], "only transfers to owner, in order");
    }

    #[tokio::test]
    async fn query_failure_is_a_transport_error() {
        use alloy::providers::ProviderBuilder;
        use alloy::transports::mock::Asserter;

        let asserter = Asserter::new();
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter.clone());
        asserter.push_failure_msg("query returned more than 10000 results");

        let err = query::<_, Transfer>(&provider, REGISTRY, 0, TopicFilter::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "transport error, got {err}");
    }
}
