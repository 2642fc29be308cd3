//! # Packages
//!
//! A package is a single deployable unit: a subdirectory of a pallet holding
//! a `package.yml` declaration. A package's full path is its pallet's path
//! joined with the subdirectory, so the pallet containing a package path is
//! not known in advance. [`find_containing`] resolves it by walking upward.

use std::cmp::Ordering;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::PathedFs;
use crate::pallet::FsPallet;
use crate::path;
use crate::version::compare_versions;

/// Name of the declaration file marking a package directory
pub const PKG_DECL_FILE: &str = "package.yml";

/// The contents of a `package.yml` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PkgDecl {
    #[serde(default, rename = "version")]
    pub format_version: String,
    pub package: PkgSpec,
}

/// Metadata describing a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PkgSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// A package loaded from a filesystem
#[derive(Debug, Clone)]
pub struct FsPkg {
    pub decl: PkgDecl,
    /// Full package path; the pallet path joined with `pallet_subdir` once a
    /// pallet is attached
    pub path: String,
    /// Subdirectory of the package within its pallet
    pub pallet_subdir: String,
    pub fs: Arc<dyn PathedFs>,
    pub pallet: Option<Arc<FsPallet>>,
}

impl FsPkg {
    /// Attaches the pallet containing this package at `subdir`, which
    /// recomputes the package path.
    pub fn attach_fs_pallet(&mut self, pallet: Arc<FsPallet>, subdir: &str) -> Result<()> {
        let subdir = path::clean(subdir)?;
        self.path = path::join(pallet.path(), &subdir);
        self.pallet_subdir = subdir;
        self.pallet = Some(pallet);
        Ok(())
    }

    /// The version of the attached pallet, or empty when none is attached.
    pub fn version(&self) -> &str {
        self.pallet.as_ref().map(|p| p.version.as_str()).unwrap_or("")
    }

    /// The `path@version` label of this package.
    pub fn path_version(&self) -> String {
        path::path_version(&self.path, self.version())
    }
}

/// Loads the package rooted at `dir` in `fsys`, with no pallet attached.
pub fn load_fs_pkg(fsys: &dyn PathedFs, dir: &str) -> Result<FsPkg> {
    let dir = path::clean(dir)?;
    let fs = fsys.sub(&dir)?;
    let location = path::join(fs.path(), PKG_DECL_FILE);
    let content = fs.read_file(PKG_DECL_FILE)?;
    let decl: PkgDecl = serde_yaml::from_slice(&content).map_err(|e| Error::Declaration {
        path: location,
        message: e.to_string(),
    })?;
    Ok(FsPkg {
        decl,
        path: dir.clone(),
        pallet_subdir: dir,
        fs,
        pallet: None,
    })
}

/// Finds the pallet containing `pkg_path` by trying successively shorter
/// prefixes of it as the pallet path.
///
/// `load` is called with each candidate, from the full path upward; the
/// trailing component moves into the package subdirectory each time a
/// candidate is not found. Returns the first successfully loaded candidate
/// together with the accumulated subdirectory (`.` when the package is the
/// pallet root). Any other error from `load` ends the walk and is returned.
pub fn find_containing<T, F>(pkg_path: &str, mut load: F) -> Result<(T, String)>
where
    F: FnMut(&str) -> Result<T>,
{
    let pkg_path = path::clean(pkg_path)?;
    let mut candidate = pkg_path.as_str();
    let mut subdir = path::ROOT.to_string();
    loop {
        match load(candidate) {
            Ok(found) => return Ok((found, subdir)),
            Err(e) if e.is_not_found() => {
                debug!("{} is not the pallet containing {}: {}", candidate, pkg_path, e)
            }
            Err(e) => return Err(e),
        }
        if candidate == path::ROOT || !candidate.contains('/') {
            break;
        }
        subdir = path::join(path::base(candidate), &subdir);
        candidate = path::dir(candidate);
    }
    Err(Error::not_found(format!("pallet containing package {}", pkg_path)))
}

/// Orders packages by path, then by pallet version precedence.
pub fn compare_pkgs(a: &FsPkg, b: &FsPkg) -> Ordering {
    a.path
        .cmp(&b.path)
        .then_with(|| compare_versions(a.version(), b.version()))
}
