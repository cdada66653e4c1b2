//! Configuration for the userop tool

use std::path::PathBuf;

use alloy_primitives::{Address, U256};
use clap::{Parser, Subcommand};
use userop_core::{Authorizer, ENTRY_POINT_V07_ADDRESS, EntryPointVersion};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Config {
    /// Chain ID the operation hash is bound to
    #[arg(long, env = "USEROP_CHAIN_ID", default_value = "8453", global = true)]
    pub(crate) chain_id: u64,

    /// EntryPoint the operation hash is bound to
    #[arg(long, env = "USEROP_ENTRY_POINT", default_value_t = ENTRY_POINT_V07_ADDRESS, global = true)]
    pub(crate) entry_point: Address,

    #[arg(long, env = "USEROP_LOG_LEVEL", default_value = "info", global = true)]
    pub(crate) log_level: String,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Pack an authorizer and validity window into a validation data word
    PackValidationData {
        /// Aggregator address, or `true`/`false` for a plain signature result
        #[arg(long, value_parser = parse_authorizer)]
        authorizer: Authorizer,
        #[arg(long, default_value_t = 0)]
        valid_after: u64,
        /// 0 means no expiry
        #[arg(long, default_value_t = 0)]
        valid_until: u64,
    },
    /// Decode a validation data word
    ParseValidationData { word: U256 },
    /// Intersect two validation data words
    CombineValidationData { a: U256, b: U256 },
    /// Check a validation data word against a timestamp
    ValidationRange {
        word: U256,
        /// Unix timestamp to check against, defaults to the system clock
        #[arg(long)]
        now: Option<u64>,
    },
    /// Print every field of a user operation read from a JSON file
    Inspect { path: PathBuf },
    /// Compute the hash of a user operation read from a JSON file
    Hash {
        path: PathBuf,
        #[arg(long = "entry-point-version", value_parser = parse_version, default_value = "v0.7")]
        version: EntryPointVersion,
    },
}

fn parse_authorizer(value: &str) -> Result<Authorizer, String> {
    match value {
        "true" => Ok(Authorizer::from(true)),
        "false" => Ok(Authorizer::from(false)),
        address => address
            .parse::<Address>()
            .map(Authorizer::from)
            .map_err(|e| format!("expected an address, `true` or `false`: {e}")),
    }
}

fn parse_version(value: &str) -> Result<EntryPointVersion, String> {
    match value {
        "v0.7" | "0.7" => Ok(EntryPointVersion::V0_7),
        "v0.8" | "0.8" => Ok(EntryPointVersion::V0_8),
        other => Err(format!("unsupported EntryPoint version `{other}`")),
    }
}
