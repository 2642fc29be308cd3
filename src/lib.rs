//! # palletfs
//!
//! This library is the resolution core of a deployment-packaging tool. It
//! assembles versioned, Git-addressed collections of package definitions
//! ("pallets") into trees that can be read or exported like any other
//! filesystem, overlaying files imported from other pallets without copying
//! them.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//! use palletfs::cache::{FsPalletCache, PalletCache};
//! use palletfs::fs::{MemoryFs, PathedFs};
//!
//! let mut store = MemoryFs::with_path("/cache");
//! store
//!     .add_file_string("github.com/org/base@v1.0.0/pallet.yml", "pallet:\n  path: github.com/org/base\n")
//!     .unwrap();
//! store
//!     .add_file_string("github.com/org/base@v1.0.0/infra/proxy/package.yml", "package: {}\n")
//!     .unwrap();
//!
//! let cache = FsPalletCache::new(Arc::new(store));
//! let pallet = cache.load_fs_pallet("github.com/org/base", "v1.0.0").unwrap();
//! assert_eq!(pallet.version, "v1.0.0");
//!
//! let pkg = cache.load_fs_pkg("github.com/org/base/infra/proxy", "v1.0.0").unwrap();
//! assert_eq!(pkg.pallet_subdir, "infra/proxy");
//! assert_eq!(pkg.fs.path(), "/cache/github.com/org/base@v1.0.0/infra/proxy");
//! ```
//!
//! ## Core Concepts
//!
//! - **Pathed filesystems (`fs`)**: the [`fs::PathedFs`] contract every tree
//!   is read through, with the optional [`fs::ReadLinkFs`] capability, and
//!   the host-backed [`fs::DirFs`] and in-memory [`fs::MemoryFs`].
//! - **Merge filesystem (`mergefs`)**: an overlay tree merged with files
//!   imported by reference.
//! - **Pallets and packages (`pallet`, `pkg`)**: declarations and loading.
//! - **Imports (`imports`)**: turning a pallet's `imports:` into a merge
//!   filesystem.
//! - **Caches (`cache`)**: physical, override and layered caches resolving
//!   a path and version to a loaded pallet or package.
//! - **Export (`export`)**: writing a tree to a host directory.

pub mod cache;
pub mod defaults;
pub mod error;
pub mod export;
pub mod fs;
pub mod imports;
pub mod mergefs;
pub mod output;
pub mod pallet;
pub mod path;
pub mod pkg;
pub mod version;

#[cfg(test)]
mod path_proptest;
