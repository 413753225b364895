//! ERC-8004 agent workflow CLI.
//!
//! Everything is configured through `.env` in the working directory and
//! the process environment; subcommands take no flags.
//!
//! # Usage
//!
//! ```bash
//! # Mint an agent identity for AGENT_URI and store AGENT_ID in .env
//! erc8004-demo register
//!
//! # Ask VALIDATOR_ADDRESS to validate AGENT_ID, store REQUEST_HASH in .env
//! erc8004-demo request-validation
//!
//! # List validator responses, filtered by REQUEST_HASH / AGENT_ID when set
//! erc8004-demo validation-responses
//!
//! # Show owner, URI and wallet of AGENT_ID
//! erc8004-demo agent
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use erc8004_demo::config::{Resolver, Settings};
use erc8004_demo::env_file::EnvFile;
use erc8004_demo::workflow::{Stage, Workflow};
use erc8004_demo::{commands, report};

/// Configuration file read at startup and updated by write commands.
const ENV_FILE: &str = ".env";

/// ERC-8004 identity and validation registry workflows.
#[derive(Debug, Parser)]
#[command(name = "erc8004-demo", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Register a new agent with AGENT_URI and record its AGENT_ID.
    Register,
    /// Submit a validation request for AGENT_ID and record its REQUEST_HASH.
    RequestValidation,
    /// Fetch ValidationResponse events from recent blocks.
    ValidationResponses,
    /// Show the on-chain identity of AGENT_ID.
    Agent,
}

impl Command {
    const fn name(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::RequestValidation => "request-validation",
            Self::ValidationResponses => "validation-responses",
            Self::Agent => "agent",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut flow = Workflow::new(cli.command.name());

    match run(cli.command, &mut flow).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let reached = flow.fail();
            report::failure(flow.name(), reached, &e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, flow: &mut Workflow) -> Result<()> {
    let mut env = EnvFile::load(ENV_FILE)?;
    let settings = Settings::resolve(&Resolver::layered(&env))?;
    flow.advance(Stage::ConfigResolved)?;

    match command {
        Command::Register => commands::register(&settings, &mut env, flow).await?,
        Command::RequestValidation => {
            commands::request_validation(&settings, &mut env, flow).await?;
        }
        Command::ValidationResponses => commands::validation_responses(&settings, flow).await?,
        Command::Agent => commands::agent(&settings).await?,
    }

    flow.advance(Stage::Done)?;
    Ok(())
}
