//! Human-readable output on stdout. Diagnostics go through `tracing` to stderr.

#![allow(clippy::print_stdout)]

use std::path::Path;

use alloy::primitives::{Address, B256};
use erc8004::contracts::IValidationRegistry::{ValidationRequest, ValidationResponse};
use erc8004::events::DecodedEvent;
use erc8004::types::{AgentIdentity, Confirmation};
use erc8004::validation::ResponseFilter;

use crate::env_file::Update;
use crate::workflow::Stage;

/// Print one line.
pub fn line(text: impl AsRef<str>) {
    println!("{}", text.as_ref());
}

/// Print the account that signs transactions.
pub fn signer(address: Address) {
    println!("Signer address: {address}");
}

/// Print the hash of a freshly broadcast transaction.
pub fn sent(tx_hash: B256) {
    println!("Transaction sent: {tx_hash}");
}

/// Print where a transaction was mined.
pub fn confirmed(confirmation: &Confirmation) {
    match confirmation.block_number {
        Some(block) => println!("Transaction confirmed in block {block}"),
        None => println!("Transaction confirmed (block not reported)"),
    }
}

/// Print an agent's identity record.
pub fn agent(identity: &AgentIdentity) {
    print!("{}", format_agent(identity));
}

/// Print a decoded `ValidationRequest` event.
pub fn validation_request(event: &DecodedEvent<ValidationRequest>) {
    print!("{}", format_validation_request(&event.event));
}

/// Print a decoded `ValidationResponse` event followed by a blank line.
pub fn validation_response(event: &DecodedEvent<ValidationResponse>) {
    println!("{}", format_validation_response(event));
}

/// Print the outcome of recording `key=value` in the env file.
pub fn env_update(path: &Path, key: &str, value: &str, update: Update) {
    print!("{}", format_env_update(path, key, value, update));
}

/// Print a fatal error together with the last stage the run completed.
pub fn failure(command: &str, reached: Stage, error: &anyhow::Error) {
    println!("ERROR: {error:#}");
    println!("  ({command} stopped after stage {reached})");
}

fn format_agent(identity: &AgentIdentity) -> String {
    format!(
        "Agent #{}\n  Owner:        {}\n  Token URI:    {}\n  Agent Wallet: {}\n",
        identity.agent_id, identity.owner, identity.uri, identity.wallet
    )
}

fn format_validation_request(event: &ValidationRequest) -> String {
    format!(
        "ValidationRequest event:\n  Validator:    {}\n  Agent ID:     {}\n  \
         Request URI:  {}\n  Request Hash: {}\n",
        event.validatorAddress, event.agentId, event.requestURI, event.requestHash
    )
}

fn format_validation_response(decoded: &DecodedEvent<ValidationResponse>) -> String {
    let event = &decoded.event;
    let block = decoded
        .block_number
        .map(|block| format!("  Block:         {block}\n"))
        .unwrap_or_default();
    let tx = decoded
        .tx_hash
        .map(|tx| format!("  Tx Hash:       {tx}\n"))
        .unwrap_or_default();
    format!(
        "{block}{tx}  Validator:     {}\n  Agent ID:      {}\n  Request Hash:  {}\n  \
         Response:      {}\n  Response URI:  {}\n  Response Hash: {}\n  Tag:           {}\n",
        event.validatorAddress,
        event.agentId,
        event.requestHash,
        event.response,
        event.responseURI,
        event.responseHash,
        event.tag
    )
}

/// Render the active response filters, or `None` when unfiltered.
#[must_use]
pub fn format_filter(filter: &ResponseFilter) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(v) = filter.validator {
        parts.push(format!("validatorAddress={v}"));
    }
    if let Some(id) = filter.agent_id {
        parts.push(format!("agentId={id}"));
    }
    if let Some(h) = filter.request_hash {
        parts.push(format!("requestHash={h}"));
    }
    (!parts.is_empty()).then(|| format!("  Filters: {}", parts.join(", ")))
}

fn format_env_update(path: &Path, key: &str, value: &str, update: Update) -> String {
    let name = path.display();
    match update {
        Update::Replaced | Update::Appended => format!("\n{name} updated with {key}={value}\n"),
        Update::Unchanged => format!("\n{name} already has {key}={value}\n"),
        Update::FileMissing => {
            format!("\nNo {name} file found. Add this manually:\n  {key}={value}\n")
        }
    }
}
