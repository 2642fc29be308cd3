//! # Pallets
//!
//! A pallet is a versioned, Git-path-addressed tree of deployable package
//! definitions. Its root directory carries a `pallet.yml` declaration naming
//! the pallet's path and, optionally, the other pallets it imports files from.
//!
//! [`FsPallet`] pairs a parsed declaration with the filesystem the pallet was
//! loaded from. The version is not part of the declaration; whoever loads a
//! pallet by version stamps it onto the loaded object.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::{self, PathedFs, Walk};
use crate::imports::ImportDecl;
use crate::path::{self, Glob};
use crate::pkg::{self, FsPkg};
use crate::version::compare_versions;

/// Name of the declaration file marking a pallet root
pub const PALLET_DECL_FILE: &str = "pallet.yml";

/// The contents of a `pallet.yml` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PalletDecl {
    /// Version of the declaration format
    #[serde(default, rename = "version")]
    pub format_version: String,
    pub pallet: PalletSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<ImportDecl>,
}

/// Identity and metadata of a pallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PalletSpec {
    /// Git-style repository path, e.g. `github.com/org/repo`
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_file: Option<String>,
}

impl PalletDecl {
    /// Parses and validates a declaration read from `location`.
    pub fn parse(content: &[u8], location: &str) -> Result<Self> {
        let decl: PalletDecl =
            serde_yaml::from_slice(content).map_err(|e| Error::Declaration {
                path: location.to_string(),
                message: e.to_string(),
            })?;
        if decl.pallet.path.is_empty() || path::clean(&decl.pallet.path)? != decl.pallet.path {
            return Err(Error::Declaration {
                path: location.to_string(),
                message: format!("invalid pallet path {:?}", decl.pallet.path),
            });
        }
        Ok(decl)
    }
}

/// A pallet loaded from a filesystem
#[derive(Debug, Clone)]
pub struct FsPallet {
    pub decl: PalletDecl,
    /// Version the pallet was loaded as; empty when loaded without one
    pub version: String,
    /// Filesystem rooted at the pallet's root directory
    pub fs: Arc<dyn PathedFs>,
}

impl FsPallet {
    /// Loads the pallet rooted at `dir` in `fsys`.
    pub fn load(fsys: &dyn PathedFs, dir: &str) -> Result<Self> {
        let fs = fsys.sub(dir)?;
        Self::from_fs(fs)
    }

    /// Loads the pallet rooted at the root of `fs`.
    pub fn from_fs(fs: Arc<dyn PathedFs>) -> Result<Self> {
        let location = path::join(fs.path(), PALLET_DECL_FILE);
        let content = fs.read_file(PALLET_DECL_FILE)?;
        let decl = PalletDecl::parse(&content, &location)?;
        Ok(Self {
            decl,
            version: String::new(),
            fs,
        })
    }

    /// Returns this pallet with its version set.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Returns this pallet with its filesystem replaced, e.g. by a merged one.
    pub fn with_fs(mut self, fs: Arc<dyn PathedFs>) -> Self {
        self.fs = fs;
        self
    }

    pub fn path(&self) -> &str {
        &self.decl.pallet.path
    }

    /// The `path@version` label of this pallet.
    pub fn path_version(&self) -> String {
        path::path_version(self.path(), &self.version)
    }

    /// Loads the package at `subdir` of this pallet.
    pub fn load_fs_pkg(self: &Arc<Self>, subdir: &str) -> Result<FsPkg> {
        let mut pkg = pkg::load_fs_pkg(self.fs.as_ref(), subdir)?;
        pkg.attach_fs_pallet(self.clone(), subdir)?;
        Ok(pkg)
    }

    /// Loads every package of this pallet whose subdirectory matches
    /// `pattern`.
    pub fn load_fs_pkgs(self: &Arc<Self>, pattern: &str) -> Result<Vec<FsPkg>> {
        let mut pkgs = Vec::new();
        for subdir in find_decl_dirs(self.fs.as_ref(), pkg::PKG_DECL_FILE, pattern)? {
            pkgs.push(self.load_fs_pkg(&subdir)?);
        }
        Ok(pkgs)
    }
}

/// Returns the directories of `fsys` holding a file named `decl_file` whose
/// path matches `pattern`, in sorted order.
fn find_decl_dirs(
    fsys: &dyn PathedFs,
    decl_file: &str,
    pattern: &str,
) -> Result<Vec<String>> {
    let glob = Glob::new(pattern)?;
    let mut dirs = Vec::new();
    fs::walk_dir(fsys, path::ROOT, |name, info| {
        if !info.is_dir() || !glob.matches(name) {
            return Ok(Walk::Continue);
        }
        if fs::exists(fsys, &path::join(name, decl_file))? {
            dirs.push(name.to_string());
        }
        Ok(Walk::Continue)
    })?;
    dirs.sort();
    Ok(dirs)
}

/// Orders pallets by path, then by version precedence.
pub fn compare_pallets(a: &FsPallet, b: &FsPallet) -> Ordering {
    a.path()
        .cmp(b.path())
        .then_with(|| compare_versions(&a.version, &b.version))
}
