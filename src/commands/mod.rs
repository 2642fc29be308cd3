//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `palletfs` command-line tool, one file per command.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the shared
//!   [`Context`] and performs the command's logic.
//!
//! Every command resolves pallets through the same chain: the physical cache
//! at the cache root, overlaid by any `--override` checkouts.

pub mod completions;
pub mod export;
pub mod ls;
pub mod show;
pub mod tree;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use log::info;

use palletfs::cache::{FsPalletCache, LayeredPalletCache, OverlayPalletCache, PalletOverrideCache};
use palletfs::defaults::default_cache_root;
use palletfs::fs::DirFs;
use palletfs::output::OutputConfig;
use palletfs::pallet::FsPallet;

/// State shared by every command
pub struct Context {
    pub cache: LayeredPalletCache,
    pub output: OutputConfig,
}

/// Global options selecting where pallets come from
#[derive(Debug, Default)]
pub struct CacheArgs {
    pub cache_root: Option<PathBuf>,
    pub overrides: Vec<String>,
}

impl CacheArgs {
    /// Builds the cache chain: overrides over the physical cache.
    pub fn build(self) -> Result<LayeredPalletCache> {
        let cache_root = self.cache_root.unwrap_or_else(default_cache_root);
        info!("using pallet cache at {}", cache_root.display());
        let physical = FsPalletCache::from_dir(cache_root);

        let mut overrides = PalletOverrideCache::new();
        for spec in &self.overrides {
            let (dir, versions) = parse_override(spec)?;
            let fs = Arc::new(DirFs::new(&dir));
            let pallet = FsPallet::from_fs(fs)
                .with_context(|| format!("Failed to load override pallet from {}", dir.display()))?;
            let label = versions.first().cloned().unwrap_or_default();
            info!("overriding {} with {} for {:?}", pallet.path(), dir.display(), versions);
            overrides.add_pallet(Arc::new(pallet.with_version(label)), versions);
        }

        let overlay: Arc<dyn OverlayPalletCache> = Arc::new(overrides);
        Ok(LayeredPalletCache::new(Arc::new(physical), overlay))
    }
}

/// Parses a `DIR=VERSION[,VERSION...]` override.
pub fn parse_override(spec: &str) -> Result<(PathBuf, Vec<String>)> {
    let (dir, versions) = spec
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("Invalid override '{}': expected DIR=VERSION[,VERSION...]", spec))?;
    let versions: Vec<String> = versions
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if dir.is_empty() || versions.is_empty() {
        return Err(anyhow!(
            "Invalid override '{}': expected DIR=VERSION[,VERSION...]",
            spec
        ));
    }
    Ok((PathBuf::from(dir), versions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override() {
        let (dir, versions) = parse_override("/src/repo=v1.0.0, v1.1.0").unwrap();
        assert_eq!(dir, PathBuf::from("/src/repo"));
        assert_eq!(versions, vec!["v1.0.0", "v1.1.0"]);
    }

    #[test]
    fn test_parse_override_splits_at_last_equals() {
        let (dir, versions) = parse_override("/src/a=b=dev").unwrap();
        assert_eq!(dir, PathBuf::from("/src/a=b"));
        assert_eq!(versions, vec!["dev"]);
    }

    #[test]
    fn test_parse_override_rejects_malformed() {
        assert!(parse_override("/src/repo").is_err());
        assert!(parse_override("/src/repo=").is_err());
        assert!(parse_override("=v1").is_err());
    }
}
