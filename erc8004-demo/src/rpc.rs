//! Provider construction and the connectivity check every command runs first.

use alloy::network::EthereumWallet;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::transports::TransportError;
use alloy::transports::http::reqwest::Url;

use crate::config::Settings;

/// The RPC endpoint did not answer.
#[derive(Debug, thiserror::Error)]
#[error("cannot connect to RPC at {url}")]
pub struct ConnectivityFailure {
    /// Endpoint that was tried.
    pub url: Url,
    /// Underlying transport error.
    #[source]
    pub source: TransportError,
}

/// HTTP client polling at the configured receipt interval.
fn client(settings: &Settings) -> RpcClient {
    RpcClient::new_http(settings.rpc_url.clone()).with_poll_interval(settings.wait.poll_interval)
}

/// Provider for read-only calls and log queries.
pub fn read_only(settings: &Settings) -> impl Provider + use<> {
    ProviderBuilder::new().connect_client(client(settings))
}

/// Provider that signs with the configured key.
pub fn signing(settings: &Settings) -> impl Provider + use<> {
    ProviderBuilder::new()
        .wallet(EthereumWallet::from(settings.signer.clone()))
        .connect_client(client(settings))
}

/// Ask for the chain head, mapping any failure to [`ConnectivityFailure`].
///
/// # Errors
///
/// Returns [`ConnectivityFailure`] if the node cannot be reached.
pub async fn check_connectivity<P: Provider>(
    provider: &P,
    url: &Url,
) -> Result<u64, ConnectivityFailure> {
    let head = provider
        .get_block_number()
        .await
        .map_err(|source| ConnectivityFailure {
            url: url.clone(),
            source,
        })?;
    tracing::info!(rpc = %url, head, "connected");
    Ok(head)
}
