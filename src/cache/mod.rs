//! # Pallet Caches
//!
//! A pallet cache answers requests for a pallet or package by logical path
//! and version. Three implementations compose into a resolution chain:
//!
//! - [`FsPalletCache`] reads materialized pallets laid out as
//!   `<path>@<version>` directories beneath a root filesystem;
//! - [`PalletOverrideCache`] serves in-memory pallets pinned to an explicit
//!   set of versions, e.g. a development checkout standing in for a release;
//! - [`LayeredPalletCache`] puts a cache that can claim coverage over
//!   another one.
//!
//! ## Search patterns
//!
//! Enumeration takes a glob pattern in the crate's single dialect (`*`
//! stays within a component, `**` crosses components). Pallet patterns match
//! either the pallet path or its `path@version` label; package patterns match
//! either the package path or its `path@version/subdir` label.

mod layered;
mod override_cache;
mod physical;

pub use layered::LayeredPalletCache;
pub use override_cache::PalletOverrideCache;
pub use physical::FsPalletCache;

use std::sync::Arc;

use crate::error::Result;
use crate::pallet::FsPallet;
use crate::path::{self, Glob};
use crate::pkg::FsPkg;

/// A source of pallets and packages addressed by path and version
pub trait PalletCache: Send + Sync {
    /// Loads the pallet at `path` with the given `version`.
    fn load_fs_pallet(&self, path: &str, version: &str) -> Result<Arc<FsPallet>>;

    /// Loads every pallet matching `pattern`, sorted by path then version.
    fn load_fs_pallets(&self, pattern: &str) -> Result<Vec<Arc<FsPallet>>>;

    /// Loads the package at `pkg_path` from the pallet with the given
    /// `version`, whichever pallet contains it.
    fn load_fs_pkg(&self, pkg_path: &str, version: &str) -> Result<FsPkg>;

    /// Loads every package matching `pattern`, sorted by path then version.
    fn load_fs_pkgs(&self, pattern: &str) -> Result<Vec<FsPkg>>;
}

/// A cache that can claim authority over specific pallet versions.
///
/// A claim is not a guarantee: a claimed lookup may still fail, and a layered
/// cache reports that failure instead of trying its underlay.
pub trait OverlayPalletCache: PalletCache {
    fn includes_fs_pallet(&self, path: &str, version: &str) -> bool;

    fn includes_fs_pkg(&self, pkg_path: &str, version: &str) -> bool;
}

/// Matches a pallet against a search pattern, by path or `path@version`.
pub(crate) fn pallet_matches(glob: &Glob, path: &str, version: &str) -> bool {
    glob.matches(path) || glob.matches(&path::path_version(path, version))
}

/// Matches a package against a search pattern, by package path or by
/// `pallet_path@version/subdir`.
pub(crate) fn pkg_matches(
    glob: &Glob,
    pallet_path: &str,
    version: &str,
    subdir: &str,
) -> bool {
    glob.matches(&path::join(pallet_path, subdir))
        || glob.matches(&path::join(&path::path_version(pallet_path, version), subdir))
}
