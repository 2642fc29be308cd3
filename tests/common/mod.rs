//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a fixture that lays out a pallet cache on disk, with
//! each pallet version in a `path@version` directory, plus helpers for
//! running the `palletfs` binary against it.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = CacheFixture::new().with_pallet("github.com/org/repo", "v1.0.0", "");
//!     fixture.command().arg("ls-pallets").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::decls;
    pub use super::CacheFixture;
}

/// Declaration snippets for testing.
#[allow(dead_code)]
pub mod decls {
    /// `pallet.yml` contents for a pallet at `path` with extra YAML appended.
    pub fn pallet(path: &str, extra: &str) -> String {
        format!("version: v1\npallet:\n  path: {}\n{}", path, extra)
    }

    /// `package.yml` contents with the given description.
    pub fn pkg(description: &str) -> String {
        format!(
            "version: v1\npackage:\n  description: {}\n  maintainers:\n    - ops@example.com\n",
            description
        )
    }

    /// An `imports:` section importing every file of one pallet version.
    pub fn import_all(pallet: &str, version: &str) -> String {
        format!("imports:\n  - pallet: {}\n    version: {}\n", pallet, version)
    }

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "pallet: [unclosed";
}

/// A temporary directory holding a pallet cache and, next to it, any number
/// of pallet checkouts used as overrides.
pub struct CacheFixture {
    temp_dir: assert_fs::TempDir,
}

impl CacheFixture {
    /// Create a new fixture with an empty cache.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("cache")
            .create_dir_all()
            .expect("Failed to create cache directory");
        Self { temp_dir }
    }

    /// The root of the pallet cache.
    pub fn cache_root(&self) -> PathBuf {
        self.temp_dir.path().join("cache")
    }

    /// Get the path to the temporary directory.
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add a cached pallet version whose declaration carries `extra` YAML.
    pub fn with_pallet(self, path: &str, version: &str, extra: &str) -> Self {
        let label = format!("{}@{}", path, version);
        self.with_file(&label, "pallet.yml", &decls::pallet(path, extra))
    }

    /// Add a file to a cached pallet version identified by its label.
    pub fn with_file(self, label: &str, name: &str, content: &str) -> Self {
        self.temp_dir
            .child("cache")
            .child(label)
            .child(name)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add a package to a cached pallet version identified by its label.
    #[allow(dead_code)]
    pub fn with_pkg(self, label: &str, subdir: &str, description: &str) -> Self {
        let name = format!("{}/package.yml", subdir);
        self.with_file(label, &name, &decls::pkg(description))
    }

    /// Add a pallet checkout outside the cache, returning its directory.
    #[allow(dead_code)]
    pub fn checkout(&self, dir: &str, path: &str, files: &[(&str, &str)]) -> PathBuf {
        let root = self.temp_dir.child("checkouts").child(dir);
        root.child("pallet.yml")
            .write_str(&decls::pallet(path, ""))
            .expect("Failed to write pallet declaration");
        for (name, content) in files {
            root.child(name)
                .write_str(content)
                .expect("Failed to write checkout file");
        }
        root.path().to_path_buf()
    }

    /// Create a command for the `palletfs` binary reading this fixture's
    /// cache.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("palletfs");
        cmd.env_remove("PALLETFS_CACHE")
            .env("NO_COLOR", "1")
            .current_dir(self.temp_dir.path())
            .arg("--cache-root")
            .arg(self.cache_root());
        cmd
    }
}

impl Default for CacheFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_lays_out_labelled_dirs() {
        let fixture = CacheFixture::new().with_pallet("github.com/org/repo", "v1.0.0", "");
        assert!(fixture
            .cache_root()
            .join("github.com/org/repo@v1.0.0/pallet.yml")
            .exists());
    }

    #[test]
    fn test_decls_are_valid_yaml() {
        for decl in [
            decls::pallet("github.com/org/repo", &decls::import_all("github.com/org/base", "v1")),
            decls::pkg("a package"),
        ] {
            serde_yaml::from_str::<serde_yaml::Value>(&decl).expect("Declaration should be valid YAML");
        }
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(decls::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
