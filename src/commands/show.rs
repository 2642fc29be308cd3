//! # Show-Pkg Command Implementation
//!
//! Implements the `show-pkg` subcommand, which resolves a package by path and
//! version through the cache chain and prints its declaration together with
//! where it was loaded from.

use anyhow::Result;
use clap::Args;

use palletfs::cache::PalletCache;
use palletfs::pkg::FsPkg;

use super::Context;

/// Show a package's declaration and location
#[derive(Args, Debug)]
pub struct ShowPkgArgs {
    /// Full package path, e.g. github.com/org/repo/infra/proxy
    #[arg(value_name = "PKG_PATH")]
    pub pkg_path: String,

    /// Version of the pallet providing the package
    #[arg(value_name = "VERSION")]
    pub version: String,
}

/// Execute the `show-pkg` command.
pub fn execute(args: ShowPkgArgs, ctx: &Context) -> Result<()> {
    let pkg = ctx
        .cache
        .load_fs_pkg(&args.pkg_path, &args.version)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load package {}@{}: {}",
                args.pkg_path,
                args.version,
                e
            )
        })?;
    print!("{}", render(&pkg, ctx));
    Ok(())
}

fn render(pkg: &FsPkg, ctx: &Context) -> String {
    let spec = &pkg.decl.package;
    let mut out = format!("Package: {}\n", ctx.output.label(&pkg.path, pkg.version()));
    if let Some(pallet) = &pkg.pallet {
        out.push_str(&format!(
            "Pallet: {}\n",
            ctx.output.label(pallet.path(), &pallet.version)
        ));
    }
    out.push_str(&format!("Subdirectory: {}\n", pkg.pallet_subdir));
    out.push_str(&format!("Location: {}\n", pkg.fs.path()));
    if !spec.description.is_empty() {
        out.push_str(&format!("Description: {}\n", spec.description));
    }
    if !spec.maintainers.is_empty() {
        out.push_str(&format!("Maintainers: {}\n", spec.maintainers.join(", ")));
    }
    if !spec.license.is_empty() {
        out.push_str(&format!("License: {}\n", spec.license));
    }
    if !spec.sources.is_empty() {
        out.push_str("Sources:\n");
        for source in &spec.sources {
            out.push_str(&format!("  {}\n", source));
        }
    }
    out
}
