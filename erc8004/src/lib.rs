//! Client for ERC-8004 identity and validation registries.
//!
//! [`Erc8004`] wraps an [`alloy`] provider together with the registry
//! addresses, the sender account and the receipt [`WaitPolicy`]. Registry
//! handles borrow from it:
//!
//! ```no_run
//! use alloy::providers::ProviderBuilder;
//! use erc8004::{Erc8004, NetworkAddresses};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderBuilder::new().connect_http("http://127.0.0.1:8545".parse()?);
//! let client = Erc8004::new(provider).with_addresses(NetworkAddresses::LOCAL_DEVNET);
//! let identity = client.identity()?.agent(alloy::primitives::U256::from(1)).await?;
//! println!("{identity:?}");
//! # Ok(())
//! # }
//! ```

pub mod contracts;
pub mod error;
pub mod events;
pub mod identity;
pub mod invoker;
pub mod networks;
pub mod types;
pub mod validation;

use alloy::primitives::Address;
use alloy::providers::Provider;

pub use error::{Error, Result};
pub use identity::IdentityRegistry;
pub use invoker::{Invoker, WaitPolicy};
pub use networks::NetworkAddresses;
pub use validation::ValidationRegistry;

/// Entry point bundling a provider with registry configuration.
#[derive(Debug, Clone)]
pub struct Erc8004<P> {
    provider: P,
    identity: Option<Address>,
    validation: Option<Address>,
    sender: Option<Address>,
    policy: WaitPolicy,
}

impl<P: Provider> Erc8004<P> {
    /// Wrap `provider` with no registries, no sender and the default wait policy.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            identity: None,
            validation: None,
            sender: None,
            policy: WaitPolicy::default(),
        }
    }

    /// Use both registries of a known deployment.
    #[must_use]
    pub const fn with_addresses(mut self, addresses: NetworkAddresses) -> Self {
        self.identity = Some(addresses.identity);
        self.validation = Some(addresses.validation);
        self
    }

    /// Override the Identity Registry address.
    #[must_use]
    pub const fn with_identity_address(mut self, address: Address) -> Self {
        self.identity = Some(address);
        self
    }

    /// Override the Validation Registry address.
    #[must_use]
    pub const fn with_validation_address(mut self, address: Address) -> Self {
        self.validation = Some(address);
        self
    }

    /// Account used as `from` for state-changing calls.
    ///
    /// The provider must be able to sign for it.
    #[must_use]
    pub const fn with_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Bound receipt waiting for submitted transactions.
    #[must_use]
    pub const fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The underlying provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Current chain head.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the node cannot be reached.
    pub async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    /// Identity Registry handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAddress`] if no identity address is configured.
    pub fn identity(&self) -> Result<IdentityRegistry<'_, P>> {
        let address = self.identity.ok_or(Error::MissingAddress("identity"))?;
        Ok(IdentityRegistry::new(
            address,
            &self.provider,
            self.sender,
            self.policy,
        ))
    }

    /// Validation Registry handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAddress`] if no validation address is configured.
    pub fn validation(&self) -> Result<ValidationRegistry<'_, P>> {
        let address = self.validation.ok_or(Error::MissingAddress("validation"))?;
        Ok(ValidationRegistry::new(
            address,
            &self.provider,
            self.sender,
            self.policy,
        ))
    }
}
