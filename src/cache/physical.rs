//! Pallet cache backed by a filesystem of `<path>@<version>` directories

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use super::{pallet_matches, pkg_matches, OverlayPalletCache, PalletCache};
use crate::error::{Error, Result, ResultExt};
use crate::fs::{self, DirFs, PathedFs, Walk};
use crate::pallet::{compare_pallets, FsPallet, PALLET_DECL_FILE};
use crate::path::{self, Glob};
use crate::pkg::{compare_pkgs, find_containing, FsPkg, PKG_DECL_FILE};

/// A cache of materialized pallets stored as `<path>@<version>` directories
/// beneath a root filesystem.
#[derive(Debug, Clone)]
pub struct FsPalletCache {
    root: Arc<dyn PathedFs>,
}

impl FsPalletCache {
    pub fn new(root: Arc<dyn PathedFs>) -> Self {
        Self { root }
    }

    /// Opens a cache stored in a host directory.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(DirFs::new(dir)))
    }

    pub fn root(&self) -> &Arc<dyn PathedFs> {
        &self.root
    }

    /// Checks that a pallet loaded from `dir` declares the identity its
    /// storage location implies.
    fn check_location(&self, pallet: &FsPallet, dir: &str) -> Result<()> {
        let root = self.root.path().trim_end_matches('/');
        let derived = pallet
            .fs
            .path()
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or_else(|| pallet.fs.path());
        let declared = pallet.path_version();
        if derived != declared || dir != declared {
            return Err(Error::Consistency {
                message: format!(
                    "pallet stored at {} declares itself as {}",
                    pallet.fs.path(),
                    declared
                ),
            });
        }
        Ok(())
    }

    /// Returns the subdirectories of the pallet stored in `dir` that hold a
    /// package matching `glob`. No declaration is parsed.
    fn matching_pkg_dirs(
        &self,
        glob: &Glob,
        dir: &str,
        pallet_path: &str,
        version: &str,
    ) -> Result<Vec<String>> {
        let mut subdirs = Vec::new();
        fs::walk_dir(self.root.as_ref(), dir, |name, info| {
            if !info.is_dir() {
                return Ok(Walk::Continue);
            }
            let subdir = path::strip_dir_prefix(name, dir).unwrap_or(path::ROOT);
            if pkg_matches(glob, pallet_path, version, subdir)
                && fs::exists(self.root.as_ref(), &path::join(name, PKG_DECL_FILE))?
            {
                subdirs.push(subdir.to_string());
            }
            Ok(Walk::Continue)
        })?;
        Ok(subdirs)
    }
}

impl PalletCache for FsPalletCache {
    fn load_fs_pallet(&self, path: &str, version: &str) -> Result<Arc<FsPallet>> {
        let dir = path::path_version(path, version);
        let pallet = FsPallet::load(self.root.as_ref(), &dir)
            .with_context(|| format!("couldn't load pallet {} from cache {}", dir, self.root.path()))?;
        let pallet = pallet.with_version(version);
        self.check_location(&pallet, &dir)?;
        debug!("loaded pallet {} from {}", dir, pallet.fs.path());
        Ok(Arc::new(pallet))
    }

    fn load_fs_pallets(&self, pattern: &str) -> Result<Vec<Arc<FsPallet>>> {
        let glob = Glob::new(pattern)?;
        let mut pallets = Vec::new();
        fs::walk_dir(self.root.as_ref(), path::ROOT, |name, info| {
            if !info.is_dir() {
                return Ok(Walk::Continue);
            }
            // Pallet directories never nest, so the first `@` seen on the way
            // down marks a `path@version` directory.
            let Some((pallet_path, version)) = path::split_path_version(name) else {
                return Ok(Walk::Continue);
            };
            if !pallet_matches(&glob, pallet_path, version) {
                return Ok(Walk::SkipDir);
            }
            if !fs::exists(self.root.as_ref(), &path::join(name, PALLET_DECL_FILE))? {
                debug!("skipping {}: no {}", name, PALLET_DECL_FILE);
                return Ok(Walk::SkipDir);
            }
            let pallet = FsPallet::load(self.root.as_ref(), name)?.with_version(version);
            self.check_location(&pallet, name)?;
            pallets.push(Arc::new(pallet));
            Ok(Walk::SkipDir)
        })?;
        pallets.sort_by(|a, b| compare_pallets(a, b));
        Ok(pallets)
    }

    fn load_fs_pkg(&self, pkg_path: &str, version: &str) -> Result<FsPkg> {
        let (pallet, subdir) =
            find_containing(pkg_path, |candidate| self.load_fs_pallet(candidate, version))
                .with_context(|| format!("couldn't resolve package {}@{}", pkg_path, version))?;
        pallet.load_fs_pkg(&subdir)
    }

    fn load_fs_pkgs(&self, pattern: &str) -> Result<Vec<FsPkg>> {
        let glob = Glob::new(pattern)?;
        let mut pkgs = Vec::new();
        fs::walk_dir(self.root.as_ref(), path::ROOT, |name, info| {
            if !info.is_dir() {
                return Ok(Walk::Continue);
            }
            let Some((pallet_path, version)) = path::split_path_version(name) else {
                return Ok(Walk::Continue);
            };
            if !fs::exists(self.root.as_ref(), &path::join(name, PALLET_DECL_FILE))? {
                debug!("skipping {}: no {}", name, PALLET_DECL_FILE);
                return Ok(Walk::SkipDir);
            }
            let subdirs = self.matching_pkg_dirs(&glob, name, pallet_path, version)?;
            if subdirs.is_empty() {
                return Ok(Walk::SkipDir);
            }
            let pallet = self.load_fs_pallet(pallet_path, version)?;
            for subdir in subdirs {
                pkgs.push(pallet.load_fs_pkg(&subdir)?);
            }
            Ok(Walk::SkipDir)
        })?;
        pkgs.sort_by(compare_pkgs);
        Ok(pkgs)
    }
}

impl OverlayPalletCache for FsPalletCache {
    fn includes_fs_pallet(&self, path: &str, version: &str) -> bool {
        let decl = path::join(&path::path_version(path, version), PALLET_DECL_FILE);
        match fs::exists(self.root.as_ref(), &decl) {
            Ok(found) => found,
            Err(e) => {
                debug!("couldn't check for {} in {}: {}", decl, self.root.path(), e);
                false
            }
        }
    }

    fn includes_fs_pkg(&self, pkg_path: &str, version: &str) -> bool {
        find_containing(pkg_path, |candidate| {
            if self.includes_fs_pallet(candidate, version) {
                Ok(())
            } else {
                Err(Error::not_found(path::path_version(candidate, version)))
            }
        })
        .is_ok()
    }
}
