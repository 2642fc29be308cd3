//! # Export Command Implementation
//!
//! Implements the `export` subcommand: resolve a pallet through the cache
//! chain, merge its imports, and write the merged tree to a directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;

use palletfs::cache::PalletCache;
use palletfs::export::export_fs;
use palletfs::imports::merge_fs_pallet;

use super::Context;

/// Write the merged file tree of a pallet to a directory
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Pallet path, e.g. github.com/org/repo
    #[arg(value_name = "PALLET_PATH")]
    pub pallet: String,

    /// Pallet version
    #[arg(value_name = "VERSION")]
    pub version: String,

    /// Destination directory, created if missing
    #[arg(value_name = "DEST")]
    pub dest: PathBuf,

    /// Octal permission bits applied to every exported file (e.g. 644)
    #[arg(long, value_name = "OCTAL", value_parser = parse_mode)]
    pub mode: Option<u32>,
}

fn parse_mode(s: &str) -> std::result::Result<u32, String> {
    let digits = s.trim_start_matches("0o");
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o7777 => Ok(mode),
        _ => Err(format!("'{}' is not an octal permission mode", s)),
    }
}

/// Execute the `export` command.
pub fn execute(args: ExportArgs, ctx: &Context) -> Result<()> {
    let pallet = ctx
        .cache
        .load_fs_pallet(&args.pallet, &args.version)
        .map_err(|e| anyhow::anyhow!("Failed to load pallet {}@{}: {}", args.pallet, args.version, e))?;
    let merged = merge_fs_pallet(&pallet, &ctx.cache)
        .map_err(|e| anyhow::anyhow!("Failed to resolve imports of {}: {}", pallet.path_version(), e))?;

    export_fs(merged.fs.as_ref(), &args.dest, args.mode).map_err(|e| {
        anyhow::anyhow!(
            "Failed to export {} to {}: {}",
            merged.path_version(),
            args.dest.display(),
            e
        )
    })?;
    info!("exported {} to {}", merged.path_version(), args.dest.display());
    println!(
        "Exported {} to {}",
        ctx.output.label(merged.path(), &merged.version),
        args.dest.display()
    );
    Ok(())
}
