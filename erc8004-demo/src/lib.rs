//! `.env`-driven ERC-8004 workflows.
//!
//! Each subcommand resolves [`config::Settings`] once, talks to the chain
//! through the [`erc8004`] client and, for write commands, records its
//! result back into the `.env` file so the next command can pick it up.

pub mod commands;
pub mod config;
pub mod env_file;
pub mod report;
pub mod rpc;
pub mod workflow;
