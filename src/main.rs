//! # palletfs CLI
//!
//! This is the binary entry point for the `palletfs` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging and the pallet cache chain.
//! - Executing the appropriate command based on the parsed arguments.
//!
//! The core logic lives in the `palletfs` library crate; the binary is a thin
//! wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
