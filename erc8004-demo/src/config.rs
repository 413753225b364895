//! Configuration resolved once at startup from an ordered list of sources.
//!
//! Precedence is process environment, then the `.env` file, then built-in
//! defaults. The first source holding a non-empty value wins. Values are
//! parsed into [`Settings`] before any network I/O, so malformed or missing
//! values fail fast. `AGENT_ID` and `REQUEST_HASH` are parsed by the commands
//! that read them, still before their first network call.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use erc8004::{NetworkAddresses, WaitPolicy, networks::LOCAL_RPC_URL};

use crate::env_file::{EnvFile, KeyValueStore};

/// Every configuration key the commands understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// JSON-RPC endpoint.
    RpcUrl,
    /// Identity Registry contract.
    IdentityRegistryAddress,
    /// Validation Registry contract.
    ValidationRegistryAddress,
    /// Hex private key of the signing account.
    PrivateKey,
    /// Validator asked to validate the agent.
    ValidatorAddress,
    /// URI registered for the agent and sent with validation requests.
    AgentUri,
    /// Agent ID written by `register`.
    AgentId,
    /// Request hash written by `request-validation`.
    RequestHash,
    /// Seconds to wait for a receipt.
    ReceiptTimeoutSecs,
    /// Milliseconds between receipt polls.
    ReceiptPollIntervalMs,
    /// How many blocks back historical queries start.
    LookbackBlocks,
}

/// Account #2 of the standard Anvil/Hardhat test mnemonic. Local nodes only.
const DEV_PRIVATE_KEY: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";
/// Account #3 of the same mnemonic.
const DEV_VALIDATOR: &str = "0x90F79bf6EB2c4f870365E785982E1f101E93b906";
const DEFAULT_AGENT_URI: &str = "https://example.com/agent";
const DEFAULT_LOOKBACK_BLOCKS: u64 = 3_000;

impl Key {
    /// All keys, in documentation order.
    pub const ALL: &[Self] = &[
        Self::RpcUrl,
        Self::IdentityRegistryAddress,
        Self::ValidationRegistryAddress,
        Self::PrivateKey,
        Self::ValidatorAddress,
        Self::AgentUri,
        Self::AgentId,
        Self::RequestHash,
        Self::ReceiptTimeoutSecs,
        Self::ReceiptPollIntervalMs,
        Self::LookbackBlocks,
    ];

    /// Variable name as written in `.env` and the environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RpcUrl => "RPC_URL",
            Self::IdentityRegistryAddress => "IDENTITY_REGISTRY_ADDRESS",
            Self::ValidationRegistryAddress => "VALIDATION_REGISTRY_ADDRESS",
            Self::PrivateKey => "PRIVATE_KEY",
            Self::ValidatorAddress => "VALIDATOR_ADDRESS",
            Self::AgentUri => "AGENT_URI",
            Self::AgentId => "AGENT_ID",
            Self::RequestHash => "REQUEST_HASH",
            Self::ReceiptTimeoutSecs => "RECEIPT_TIMEOUT_SECS",
            Self::ReceiptPollIntervalMs => "RECEIPT_POLL_INTERVAL_MS",
            Self::LookbackBlocks => "LOOKBACK_BLOCKS",
        }
    }

    /// Built-in fallback, or `None` for keys that must be supplied.
    #[must_use]
    pub fn default_value(self) -> Option<String> {
        let wait = WaitPolicy::default();
        let local = NetworkAddresses::LOCAL_DEVNET;
        match self {
            Self::RpcUrl => Some(LOCAL_RPC_URL.to_owned()),
            Self::IdentityRegistryAddress => Some(local.identity.to_string()),
            Self::ValidationRegistryAddress => Some(local.validation.to_string()),
            Self::PrivateKey => Some(DEV_PRIVATE_KEY.to_owned()),
            Self::ValidatorAddress => Some(DEV_VALIDATOR.to_owned()),
            Self::AgentUri => Some(DEFAULT_AGENT_URI.to_owned()),
            Self::ReceiptTimeoutSecs => Some(wait.max_wait.as_secs().to_string()),
            Self::ReceiptPollIntervalMs => Some(wait.poll_interval.as_millis().to_string()),
            Self::LookbackBlocks => Some(DEFAULT_LOOKBACK_BLOCKS.to_string()),
            Self::AgentId | Self::RequestHash => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration failures. Both are detected before any network call.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required key has no value in any source.
    #[error("{key} must be set in .env or the environment")]
    MissingConfiguration {
        /// The absent key.
        key: Key,
    },

    /// A value is present but does not parse.
    #[error("{key} is malformed: {reason}")]
    MalformedInput {
        /// The offending key.
        key: Key,
        /// Parser message.
        reason: String,
    },
}

/// A place configuration values can come from.
pub trait Source {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Raw value for `key`, if this source has one.
    fn get(&self, key: Key) -> Option<String>;
}

/// Variables of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Source for ProcessEnv {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn get(&self, key: Key) -> Option<String> {
        std::env::var(key.as_str()).ok()
    }
}

/// Built-in fallbacks from [`Key::default_value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Defaults;

impl Source for Defaults {
    fn name(&self) -> &'static str {
        "defaults"
    }

    fn get(&self, key: Key) -> Option<String> {
        key.default_value()
    }
}

impl Source for EnvFile {
    fn name(&self) -> &'static str {
        ".env"
    }

    fn get(&self, key: Key) -> Option<String> {
        KeyValueStore::get(self, key.as_str())
    }
}

/// Ordered overlay of sources; earlier sources win.
pub struct Resolver<'a> {
    sources: Vec<&'a dyn Source>,
}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.name()))
            .finish()
    }
}

impl Default for Resolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    /// A resolver with no sources.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append `source` below every source added so far.
    #[must_use]
    pub fn with(mut self, source: &'a dyn Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Process environment, then `env_file`, then defaults.
    #[must_use]
    pub fn layered(env_file: &'a EnvFile) -> Self {
        Self::new().with(&ProcessEnv).with(env_file).with(&Defaults)
    }

    /// First non-empty value for `key`.
    #[must_use]
    pub fn get(&self, key: Key) -> Option<String> {
        self.sources.iter().find_map(|source| {
            let value = source.get(key).filter(|v| !v.is_empty())?;
            tracing::trace!(%key, source = source.name(), "resolved");
            Some(value)
        })
    }

    /// Value for `key`, failing if no source has one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingConfiguration`] when absent everywhere.
    pub fn require(&self, key: Key) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingConfiguration { key })
    }

    fn parse<T>(&self, key: Key) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(key).map(|raw| parse_value(key, &raw)).transpose()
    }

    fn parse_required<T>(&self, key: Key) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.parse(key)?.ok_or(ConfigError::MissingConfiguration { key })
    }
}

fn parse_value<T>(key: Key, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::MalformedInput {
        key,
        reason: e.to_string(),
    })
}

/// Configuration handed to every command.
///
/// `AGENT_ID` and `REQUEST_HASH` are kept raw and parsed by the commands
/// that read them, so a stale value cannot block a command that ignores it.
#[derive(Debug, Clone)]
pub struct Settings {
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Identity Registry contract.
    pub identity_registry: Address,
    /// Validation Registry contract.
    pub validation_registry: Address,
    /// Signing account; the key never leaves memory.
    pub signer: PrivateKeySigner,
    /// Validator targeted by validation requests.
    pub validator: Address,
    /// Agent URI to register and to request validation for.
    pub agent_uri: String,
    agent_id: Option<String>,
    request_hash: Option<String>,
    /// Receipt waiting bounds.
    pub wait: WaitPolicy,
    /// Historical query window, in blocks.
    pub lookback_blocks: u64,
}

impl Settings {
    /// Parse every key from `resolver`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedInput`] for the first value that does
    /// not parse, or [`ConfigError::MissingConfiguration`] if a defaulted key
    /// has no value because the resolver lacks a defaults source.
    pub fn resolve(resolver: &Resolver<'_>) -> Result<Self, ConfigError> {
        let signer = resolver
            .require(Key::PrivateKey)?
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|_| ConfigError::MalformedInput {
                key: Key::PrivateKey,
                reason: "not a 32-byte hex secp256k1 key".to_owned(),
            })?;

        let settings = Self {
            rpc_url: resolver.parse_required(Key::RpcUrl)?,
            identity_registry: resolver.parse_required(Key::IdentityRegistryAddress)?,
            validation_registry: resolver.parse_required(Key::ValidationRegistryAddress)?,
            signer,
            validator: resolver.parse_required(Key::ValidatorAddress)?,
            agent_uri: resolver.require(Key::AgentUri)?,
            agent_id: resolver.get(Key::AgentId),
            request_hash: resolver.get(Key::RequestHash),
            wait: WaitPolicy {
                max_wait: Duration::from_secs(resolver.parse_required(Key::ReceiptTimeoutSecs)?),
                poll_interval: Duration::from_millis(
                    resolver.parse_required(Key::ReceiptPollIntervalMs)?,
                ),
            },
            lookback_blocks: resolver.parse_required(Key::LookbackBlocks)?,
        };
        tracing::debug!(
            rpc = %settings.rpc_url,
            identity = %settings.identity_registry,
            validation = %settings.validation_registry,
            agent_id = ?settings.agent_id,
            "configuration resolved"
        );
        Ok(settings)
    }

    /// The agent ID, required by commands that act on an existing agent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingConfiguration`] if `AGENT_ID` is unset,
    /// or [`ConfigError::MalformedInput`] if it is not an integer.
    pub fn agent_id(&self) -> Result<U256, ConfigError> {
        self.agent_id_opt()?
            .ok_or(ConfigError::MissingConfiguration { key: Key::AgentId })
    }

    /// The agent ID if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedInput`] if `AGENT_ID` is not an integer.
    pub fn agent_id_opt(&self) -> Result<Option<U256>, ConfigError> {
        self.agent_id
            .as_deref()
            .map(|raw| parse_value(Key::AgentId, raw))
            .transpose()
    }

    /// The request hash to filter responses by, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedInput`] if `REQUEST_HASH` is not 32 hex bytes.
    pub fn request_hash(&self) -> Result<Option<B256>, ConfigError> {
        self.request_hash
            .as_deref()
            .map(|raw| parse_value(Key::RequestHash, raw))
            .transpose()
    }

    /// Registry addresses as a set.
    #[must_use]
    pub const fn addresses(&self) -> NetworkAddresses {
        NetworkAddresses {
            identity: self.identity_registry,
            validation: self.validation_registry,
        }
    }
}
