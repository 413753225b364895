//! One function per subcommand. Each runs top to bottom exactly once.
//!
//! Required keys are checked before the provider is built, so a missing
//! `AGENT_ID` never costs a network round trip.

use anyhow::{Context, Result};
use erc8004::Erc8004;
use erc8004::types::RegisteredAgent;
use erc8004::validation::{
    ResponseFilter, SubmittedRequest, ValidationRequestParams, request_hash_input, snapshot_id,
};

use crate::config::{Key, Settings};
use crate::env_file::{EnvFile, KeyValueStore};
use crate::report;
use crate::rpc;
use crate::workflow::{Stage, Workflow};

/// Register `AGENT_URI`, read the new identity back and record `AGENT_ID`.
///
/// # Errors
///
/// Returns the first connectivity, submission, extraction or write failure.
pub async fn register(settings: &Settings, env: &mut EnvFile, flow: &mut Workflow) -> Result<()> {
    let provider = rpc::signing(settings);
    rpc::check_connectivity(&provider, &settings.rpc_url).await?;

    let sender = settings.signer.address();
    report::signer(sender);

    let client = Erc8004::new(provider)
        .with_addresses(settings.addresses())
        .with_sender(sender)
        .with_wait_policy(settings.wait);
    let identity = client.identity()?;

    report::line(format!("Registering agent with URI: {}", settings.agent_uri));
    let submission = identity
        .submit_register(settings.agent_uri.as_str())
        .await
        .context("submitting register")?;
    flow.advance(Stage::Submitted)?;
    report::sent(submission.tx_hash());

    let receipt = submission.confirm().await?;
    flow.advance(Stage::Confirmed)?;

    let registered = RegisteredAgent::from_receipt(&receipt)?;
    flow.advance(Stage::EventsExtracted)?;
    report::confirmed(&registered.confirmation);
    report::line(format!("Agent registered with ID: {}", registered.agent_id));

    let agent = identity
        .agent(registered.agent_id)
        .await
        .context("reading back the registered agent")?;
    report::agent(&agent);

    let value = registered.agent_id.to_string();
    record(env, Key::AgentId, &value)?;
    flow.advance(Stage::ConfigUpdated)?;
    Ok(())
}

/// Request validation of `AGENT_ID` at the previous block and record `REQUEST_HASH`.
///
/// # Errors
///
/// Returns [`crate::config::ConfigError::MissingConfiguration`] before any
/// I/O if `AGENT_ID` is unset, otherwise the first network or write failure.
pub async fn request_validation(
    settings: &Settings,
    env: &mut EnvFile,
    flow: &mut Workflow,
) -> Result<()> {
    let agent_id = settings
        .agent_id()
        .context("run `register` first to obtain an agent ID")?;

    let provider = rpc::signing(settings);
    let head = rpc::check_connectivity(&provider, &settings.rpc_url).await?;

    let sender = settings.signer.address();
    report::signer(sender);

    let snapshot = snapshot_id(head);
    report::line(format!("Current block: {head}, using snapshot_id: {snapshot}"));

    let params = ValidationRequestParams::for_snapshot(
        settings.validator,
        agent_id,
        settings.agent_uri.as_str(),
        snapshot,
    );
    report::line(format!(
        "Request hash input: {}",
        request_hash_input(&params.request_uri, snapshot)
    ));
    report::line(format!("Request hash: {}", params.request_hash));

    let client = Erc8004::new(provider)
        .with_addresses(settings.addresses())
        .with_sender(sender)
        .with_wait_policy(settings.wait);
    let validation = client.validation()?;

    report::line(format!(
        "Submitting validation request: validator={}, agent_id={agent_id}, snapshot_id={snapshot}",
        params.validator
    ));
    let submission = validation
        .submit_request(&params)
        .await
        .context("submitting validationRequest")?;
    flow.advance(Stage::Submitted)?;
    report::sent(submission.tx_hash());

    let receipt = submission.confirm().await?;
    flow.advance(Stage::Confirmed)?;

    let submitted = SubmittedRequest::from_receipt(&receipt)?;
    flow.advance(Stage::EventsExtracted)?;
    report::confirmed(&submitted.confirmation);
    for event in &submitted.events {
        report::validation_request(event);
    }

    let value = format!("{:#x}", params.request_hash);
    record(env, Key::RequestHash, &value)?;
    flow.advance(Stage::ConfigUpdated)?;
    Ok(())
}

/// List `ValidationResponse` events in the look-back window, filtered by
/// `REQUEST_HASH` and `AGENT_ID` when set.
///
/// # Errors
///
/// Returns [`crate::config::ConfigError::MalformedInput`] before any I/O if a
/// filter value does not parse, otherwise a connectivity, query or decoding
/// failure.
pub async fn validation_responses(settings: &Settings, flow: &mut Workflow) -> Result<()> {
    let filter = ResponseFilter {
        validator: None,
        agent_id: settings.agent_id_opt()?,
        request_hash: settings.request_hash()?,
    };

    let provider = rpc::read_only(settings);
    let head = rpc::check_connectivity(&provider, &settings.rpc_url).await?;
    let from_block = head.saturating_sub(settings.lookback_blocks);

    report::line(format!(
        "Querying ValidationResponse events from block {from_block} (current: {head})..."
    ));
    if let Some(filters) = report::format_filter(&filter) {
        report::line(filters);
    }

    let client = Erc8004::new(provider).with_addresses(settings.addresses());
    let events = client
        .validation()?
        .responses(&filter, from_block)
        .await
        .context("querying ValidationResponse logs")?
        .collect::<erc8004::Result<Vec<_>>>()?;
    flow.advance(Stage::EventsExtracted)?;
    tracing::info!(count = events.len(), from_block, "responses decoded");

    if events.is_empty() {
        report::line("No ValidationResponse events found.");
        return Ok(());
    }

    report::line(format!("Found {} ValidationResponse event(s):\n", events.len()));
    for event in &events {
        report::validation_response(event);
    }
    Ok(())
}

/// Print owner, URI and wallet of `AGENT_ID`.
///
/// # Errors
///
/// Returns [`crate::config::ConfigError::MissingConfiguration`] before any
/// I/O if `AGENT_ID` is unset, otherwise the first failing read.
pub async fn agent(settings: &Settings) -> Result<()> {
    let agent_id = settings.agent_id()?;

    let provider = rpc::read_only(settings);
    rpc::check_connectivity(&provider, &settings.rpc_url).await?;

    let client = Erc8004::new(provider).with_addresses(settings.addresses());
    let identity = client
        .identity()?
        .agent(agent_id)
        .await
        .with_context(|| format!("reading agent {agent_id}"))?;
    report::agent(&identity);
    Ok(())
}

/// Write `key=value` to the env file and tell the operator what happened.
fn record(env: &mut EnvFile, key: Key, value: &str) -> Result<()> {
    let update = env
        .set(key.as_str(), value)
        .with_context(|| format!("recording {key}"))?;
    report::env_update(env.path(), key.as_str(), value, update);
    Ok(())
}
