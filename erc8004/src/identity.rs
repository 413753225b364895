//! Handle for the Identity Registry.

use std::fmt;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;

use crate::contracts::IIdentityRegistry::{self, IIdentityRegistryInstance};
use crate::error::{Error, Result};
use crate::invoker::{Invoker, Submission, WaitPolicy};
use crate::types::{AgentIdentity, RegisteredAgent};

/// Borrowed view of the Identity Registry, obtained from [`crate::Erc8004::identity`].
pub struct IdentityRegistry<'a, P> {
    contract: IIdentityRegistryInstance<&'a P>,
    provider: &'a P,
    sender: Option<Address>,
    policy: WaitPolicy,
}

impl<P: Provider> fmt::Debug for IdentityRegistry<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("address", self.contract.address())
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl<'a, P: Provider> IdentityRegistry<'a, P> {
    pub(crate) fn new(
        address: Address,
        provider: &'a P,
        sender: Option<Address>,
        policy: WaitPolicy,
    ) -> Self {
        Self {
            contract: IIdentityRegistry::new(address, provider),
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

    fn invoker(&self) -> Result<Invoker<'a, P>> {
        let sender = self.sender.ok_or(Error::MissingSender)?;
        Ok(Invoker::new(self.provider, sender, self.policy))
    }

    /// Broadcast `register(agentURI)` without waiting for it to be mined.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSender`] without touching the network if no
    /// sender is configured, or any error of [`Invoker::submit`].
    pub async fn submit_register(&self, agent_uri: impl Into<String>) -> Result<Submission> {
        self.invoker()?
            .submit(self.contract.register(agent_uri.into()))
            .await
    }

    /// Register a new agent pointing at `agent_uri` and return the minted ID.
    ///
    /// # Errors
    ///
    /// Any error of [`IdentityRegistry::submit_register`],
    /// [`Submission::confirm`] or [`RegisteredAgent::from_receipt`].
    pub async fn register_with_uri(&self, agent_uri: impl Into<String>) -> Result<RegisteredAgent> {
        let receipt = self.submit_register(agent_uri).await?.confirm().await?;
        RegisteredAgent::from_receipt(&receipt)
    }

    /// Owner of the agent token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Contract`] if the call fails or the token does not exist.
    pub async fn owner_of(&self, agent_id: U256) -> Result<Address> {
        Ok(self.contract.ownerOf(agent_id).call().await?)
    }

    /// The `agentURI` stored for the agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Contract`] if the call fails or the token does not exist.
    pub async fn token_uri(&self, agent_id: U256) -> Result<String> {
        Ok(self.contract.tokenURI(agent_id).call().await?)
    }

    /// The wallet delegated by the agent, or the zero address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Contract`] if the call fails.
    pub async fn get_agent_wallet(&self, agent_id: U256) -> Result<Address> {
        Ok(self.contract.getAgentWallet(agent_id).call().await?)
    }

    /// Fetch owner, URI and wallet of an agent, one call after another.
    ///
    /// # Errors
    ///
    /// Returns the first failing read.
    pub async fn agent(&self, agent_id: U256) -> Result<AgentIdentity> {
        let owner = self.owner_of(agent_id).await?;
        let uri = self.token_uri(agent_id).await?;
        let wallet = self.get_agent_wallet(agent_id).await?;
        Ok(AgentIdentity {
            agent_id,
            owner,
            uri,
            wallet,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Bytes, address};
    use alloy::providers::ProviderBuilder;
    use alloy::sol_types::SolValue;
    use alloy::transports::mock::Asserter;

    use super::*;
    use crate::Erc8004;
    use crate::networks::NetworkAddresses;

    fn encoded<T: SolValue>(value: T) -> Bytes {
        (value,).abi_encode_params().into()
    }

    #[tokio::test]
    async fn agent_reads_owner_uri_and_wallet() {
        let owner = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let wallet = address!("90F79bf6EB2c4f870365E785982E1f101E93b906");
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter.clone());
        let client = Erc8004::new(provider).with_addresses(NetworkAddresses::LOCAL_DEVNET);

        asserter.push_success(&encoded(owner));
        asserter.push_success(&encoded("https://example.com/agent".to_owned()));
        asserter.push_success(&encoded(wallet));

        let agent = client.identity().unwrap().agent(U256::from(4)).await.unwrap();
        assert_eq!(
            agent,
            AgentIdentity {
                agent_id: U256::from(4),
                owner,
                uri: "https://example.com/agent".to_owned(),
                wallet,
            },
            "three reads assembled in order"
        );
    }

    #[tokio::test]
    async fn register_without_sender_fails_before_any_request() {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(Asserter::new());
        let client = Erc8004::new(provider).with_addresses(NetworkAddresses::LOCAL_DEVNET);
        let identity = client.identity().unwrap();

        // An empty mock queue would turn any request into a transport error.
        let err = identity.submit_register("ipfs://agent").await.unwrap_err();
        assert!(matches!(err, Error::MissingSender), "got {err}");

        let debug = format!("{identity:?}");
        assert!(debug.contains("sender: None"), "handle debug shows the sender: {debug}");
    }

    #[test]
    fn missing_registry_address_is_reported() {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(Asserter::new());
        let err = Erc8004::new(provider).identity().unwrap_err();
        assert!(matches!(err, Error::MissingAddress("identity")), "got {err}");
    }
}
