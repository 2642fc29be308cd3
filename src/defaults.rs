//! Default values for palletfs configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Environment variable overriding the cache root
pub const CACHE_ROOT_ENV: &str = "PALLETFS_CACHE";

/// Search pattern matching every pallet or package
pub const DEFAULT_PATTERN: &str = "**";

/// Returns the default cache root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/palletfs` (XDG Base Directory)
/// - macOS: `~/Library/Caches/palletfs`
/// - Windows: `{FOLDERID_LocalAppData}\palletfs`
///
/// Falls back to `.palletfs-cache` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by the `--cache-root` CLI flag or the
/// `PALLETFS_CACHE` environment variable.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("palletfs"))
        .unwrap_or_else(|| PathBuf::from(".palletfs-cache"))
}
