//! # Ls Command Implementation
//!
//! This module implements the `ls-pallets` and `ls-pkgs` subcommands, which
//! list the pallets or packages matching a search pattern across the cache
//! chain.
//!
//! Patterns use the doublestar dialect: `*` stays within a path component and
//! `**` crosses components. A pallet pattern matches its path or its
//! `path@version` label; a package pattern matches its path or its
//! `pallet@version/subdir` label.
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;

use palletfs::cache::PalletCache;
use palletfs::defaults::DEFAULT_PATTERN;
use palletfs::pallet::FsPallet;
use palletfs::pkg::FsPkg;

use super::Context;

/// List pallets or packages matching a pattern
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Search pattern (e.g. "github.com/org/*", "github.com/org/repo@v1.*")
    #[arg(value_name = "PATTERN", default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Output formats for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// One line per entry
    #[default]
    Text,
    /// A JSON array
    Json,
}

#[derive(Debug, Serialize)]
struct PalletEntry<'a> {
    path: &'a str,
    version: &'a str,
    description: &'a str,
    location: &'a str,
}

impl<'a> From<&'a FsPallet> for PalletEntry<'a> {
    fn from(pallet: &'a FsPallet) -> Self {
        Self {
            path: pallet.path(),
            version: &pallet.version,
            description: &pallet.decl.pallet.description,
            location: pallet.fs.path(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PkgEntry<'a> {
    path: &'a str,
    version: &'a str,
    pallet: Option<&'a str>,
    subdir: &'a str,
    description: &'a str,
}

impl<'a> From<&'a FsPkg> for PkgEntry<'a> {
    fn from(pkg: &'a FsPkg) -> Self {
        Self {
            path: &pkg.path,
            version: pkg.version(),
            pallet: pkg.pallet.as_ref().map(|p| p.path()),
            subdir: &pkg.pallet_subdir,
            description: &pkg.decl.package.description,
        }
    }
}

/// Execute the `ls-pallets` command.
pub fn execute_pallets(args: LsArgs, ctx: &Context) -> Result<()> {
    let pallets = ctx
        .cache
        .load_fs_pallets(&args.pattern)
        .map_err(|e| anyhow::anyhow!("Failed to list pallets matching '{}': {}", args.pattern, e))?;

    match args.format {
        OutputFormat::Json => {
            let entries: Vec<PalletEntry> = pallets.iter().map(|p| PalletEntry::from(p.as_ref())).collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for pallet in &pallets {
                println!("{}", render_line(ctx, pallet.path(), &pallet.version, &pallet.decl.pallet.description));
            }
        }
    }
    Ok(())
}

/// Execute the `ls-pkgs` command.
pub fn execute_pkgs(args: LsArgs, ctx: &Context) -> Result<()> {
    let pkgs = ctx
        .cache
        .load_fs_pkgs(&args.pattern)
        .map_err(|e| anyhow::anyhow!("Failed to list packages matching '{}': {}", args.pattern, e))?;

    match args.format {
        OutputFormat::Json => {
            let entries: Vec<PkgEntry> = pkgs.iter().map(PkgEntry::from).collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for pkg in &pkgs {
                println!("{}", render_line(ctx, &pkg.path, pkg.version(), &pkg.decl.package.description));
            }
        }
    }
    Ok(())
}

fn render_line(ctx: &Context, path: &str, version: &str, description: &str) -> String {
    let label = ctx.output.label(path, version);
    if description.is_empty() {
        label
    } else {
        format!("{}  {}", label, ctx.output.note(description))
    }
}
