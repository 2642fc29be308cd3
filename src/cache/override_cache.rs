//! In-memory pallets pinned to explicit versions
//!
//! An override cache stands in for released versions of a pallet with a tree
//! that was never published under them, typically a local checkout. The same
//! loaded pallet answers to every version pinned to its path; enumerations
//! report it under each matched version label.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;

use super::{pallet_matches, pkg_matches, OverlayPalletCache, PalletCache};
use crate::error::{Error, Result};
use crate::pallet::FsPallet;
use crate::path::{self, Glob};
use crate::pkg::{compare_pkgs, FsPkg};
use crate::version::sort_versions;

/// A registry of in-memory pallets, each pinned to a set of versions
#[derive(Debug, Clone, Default)]
pub struct PalletOverrideCache {
    pallets: HashMap<String, Arc<FsPallet>>,
    /// Sorted keys of `pallets`
    pallet_paths: Vec<String>,
    /// Versions per path, in precedence order
    pallet_versions: HashMap<String, Vec<String>>,
    /// Versions per path, for membership checks
    pallet_version_sets: HashMap<String, HashSet<String>>,
}

impl PalletOverrideCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cache from pallets and the versions each one answers to.
    pub fn from_pallets<I, V>(pallets: I) -> Self
    where
        I: IntoIterator<Item = (Arc<FsPallet>, V)>,
        V: IntoIterator<Item = String>,
    {
        let mut cache = Self::new();
        for (pallet, versions) in pallets {
            cache.add_pallet(pallet, versions);
        }
        cache
    }

    /// Registers `pallet` under its own path, replacing any pallet already
    /// registered there, and pins it to `versions`.
    pub fn add_pallet<V>(&mut self, pallet: Arc<FsPallet>, versions: V)
    where
        V: IntoIterator<Item = String>,
    {
        let pallet_path = pallet.path().to_string();
        if self.pallets.insert(pallet_path.clone(), pallet).is_none() {
            let at = self
                .pallet_paths
                .binary_search(&pallet_path)
                .unwrap_or_else(|at| at);
            self.pallet_paths.insert(at, pallet_path.clone());
        }
        self.set_versions(&pallet_path, versions);
    }

    /// Replaces the versions pinned to the pallet at `pallet_path`.
    pub fn set_versions<V>(&mut self, pallet_path: &str, versions: V)
    where
        V: IntoIterator<Item = String>,
    {
        let mut sorted: Vec<String> = versions.into_iter().collect();
        sort_versions(&mut sorted);
        self.pallet_version_sets
            .insert(pallet_path.to_string(), sorted.iter().cloned().collect());
        self.pallet_versions.insert(pallet_path.to_string(), sorted);
    }

    /// Paths of all registered pallets, sorted.
    pub fn pallet_paths(&self) -> &[String] {
        &self.pallet_paths
    }

    /// Versions pinned to the pallet at `pallet_path`, in precedence order.
    pub fn versions(&self, pallet_path: &str) -> &[String] {
        self.pallet_versions
            .get(pallet_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn has_version(&self, pallet_path: &str, version: &str) -> bool {
        self.pallet_version_sets
            .get(pallet_path)
            .is_some_and(|set| set.contains(version))
    }

    /// Returns `pallet` carrying `version` as its label. The tree is shared.
    fn labelled(pallet: &Arc<FsPallet>, version: &str) -> Arc<FsPallet> {
        if pallet.version == version {
            return pallet.clone();
        }
        Arc::new(pallet.as_ref().clone().with_version(version))
    }

    /// Finds the registered pallet covering `pkg_path` and the package's
    /// subdirectory within it.
    fn find_pkg_pallet(&self, pkg_path: &str) -> Option<(&Arc<FsPallet>, String)> {
        self.pallet_paths.iter().find_map(|pallet_path| {
            let subdir = if pkg_path == pallet_path.as_str() {
                path::ROOT
            } else {
                path::strip_dir_prefix(pkg_path, pallet_path)?
            };
            let pallet = self.pallets.get(pallet_path)?;
            Some((pallet, subdir.to_string()))
        })
    }
}

impl PalletCache for PalletOverrideCache {
    fn load_fs_pallet(&self, path: &str, version: &str) -> Result<Arc<FsPallet>> {
        let pallet = self
            .pallets
            .get(path)
            .ok_or_else(|| Error::not_found(format!("override for pallet {}", path)))?;
        if !self.has_version(path, version) {
            return Err(Error::not_found(format!(
                "override for pallet {}",
                path::path_version(path, version)
            )));
        }
        debug!("using override of {} for version {}", path, version);
        Ok(pallet.clone())
    }

    fn load_fs_pallets(&self, pattern: &str) -> Result<Vec<Arc<FsPallet>>> {
        let glob = Glob::new(pattern)?;
        let mut pallets = Vec::new();
        for pallet_path in &self.pallet_paths {
            let Some(pallet) = self.pallets.get(pallet_path) else {
                continue;
            };
            for version in self.versions(pallet_path) {
                if pallet_matches(&glob, pallet_path, version) {
                    pallets.push(Self::labelled(pallet, version));
                }
            }
        }
        Ok(pallets)
    }

    fn load_fs_pkg(&self, pkg_path: &str, version: &str) -> Result<FsPkg> {
        let pkg_path = path::clean(pkg_path)?;
        let (pallet, subdir) = self
            .find_pkg_pallet(&pkg_path)
            .ok_or_else(|| Error::not_found(format!("override containing package {}", pkg_path)))?;
        if !self.has_version(pallet.path(), version) {
            return Err(Error::not_found(format!(
                "override for package {}",
                path::path_version(&pkg_path, version)
            )));
        }
        Self::labelled(pallet, version).load_fs_pkg(&subdir)
    }

    fn load_fs_pkgs(&self, pattern: &str) -> Result<Vec<FsPkg>> {
        let glob = Glob::new(pattern)?;
        let mut pkgs = Vec::new();
        for pallet_path in &self.pallet_paths {
            let Some(pallet) = self.pallets.get(pallet_path) else {
                continue;
            };
            let versions = self.versions(pallet_path);
            if versions.is_empty() {
                continue;
            }
            let pallet_pkgs = pallet.load_fs_pkgs("**")?;
            for version in versions {
                let labelled = Self::labelled(pallet, version);
                for pkg in &pallet_pkgs {
                    if pkg_matches(&glob, pallet_path, version, &pkg.pallet_subdir) {
                        let mut pkg = pkg.clone();
                        let subdir = pkg.pallet_subdir.clone();
                        pkg.attach_fs_pallet(labelled.clone(), &subdir)?;
                        pkgs.push(pkg);
                    }
                }
            }
        }
        pkgs.sort_by(compare_pkgs);
        Ok(pkgs)
    }
}

impl OverlayPalletCache for PalletOverrideCache {
    fn includes_fs_pallet(&self, path: &str, version: &str) -> bool {
        self.pallets.contains_key(path) && self.has_version(path, version)
    }

    fn includes_fs_pkg(&self, pkg_path: &str, version: &str) -> bool {
        self.find_pkg_pallet(pkg_path)
            .is_some_and(|(pallet, _)| self.has_version(pallet.path(), version))
    }
}
