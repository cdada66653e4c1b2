//! ERC-4337 user operation tool
//!
//! Packs, parses and combines validation data words, and inspects or hashes
//! user operations read from JSON files.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use userop_core::logger::init_logger;

use crate::config::Config;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::parse();
    init_logger(&config.log_level);

    info!(
        message = "Starting userop tool",
        chain_id = config.chain_id,
        entry_point = %config.entry_point,
    );

    let report = commands::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
