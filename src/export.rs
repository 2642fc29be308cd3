//! Exporting a filesystem to disk
//!
//! Materializes any [`PathedFs`], typically a pallet's merged filesystem,
//! into a host directory.
//!
//! ## Process
//!
//! 1.  **Walk**: entries are visited in pre-order, sorted by name, with
//!     link-aware metadata where the filesystem offers it.
//!
//! 2.  **Directories** are created recursively.
//!
//! 3.  **Symlinks** are recreated with their original target. Reading a link
//!     requires the [`ReadLinkFs`](crate::fs::ReadLinkFs) capability.
//!
//! 4.  **Files** are written with their permission bits, unless an override
//!     mode is given.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::fs::{walk_dir, FileInfo, PathedFs, Walk};
use crate::path;

/// Writes every entry of `fsys` beneath the host directory `dest`.
///
/// Regular files keep the permission bits reported by `fsys` unless
/// `mode_override` is set.
pub fn export_fs(fsys: &dyn PathedFs, dest: &Path, mode_override: Option<u32>) -> Result<()> {
    fs::create_dir_all(dest).map_err(|e| host_error(dest, e))?;
    walk_dir(fsys, path::ROOT, |name, info| {
        if name == path::ROOT {
            return Ok(Walk::Continue);
        }
        let target = host_path(dest, name);
        if info.is_dir() {
            fs::create_dir_all(&target).map_err(|e| host_error(&target, e))?;
        } else if info.is_symlink() {
            export_symlink(fsys, name, &target)?;
        } else {
            export_file(fsys, name, info, &target, mode_override)?;
        }
        Ok(Walk::Continue)
    })?;
    debug!("exported {} to {}", fsys.path(), dest.display());
    Ok(())
}

fn host_path(dest: &Path, name: &str) -> PathBuf {
    let mut target = dest.to_path_buf();
    target.extend(name.split('/'));
    target
}

fn host_error(target: &Path, source: std::io::Error) -> Error {
    Error::FsIo {
        path: target.display().to_string(),
        source,
    }
}

fn export_file(
    fsys: &dyn PathedFs,
    name: &str,
    info: &FileInfo,
    target: &Path,
    mode_override: Option<u32>,
) -> Result<()> {
    let content = fsys.read_file(name)?;
    fs::write(target, content).map_err(|e| host_error(target, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = mode_override.unwrap_or(info.permissions);
        fs::set_permissions(target, fs::Permissions::from_mode(mode))
            .map_err(|e| host_error(target, e))?;
    }
    #[cfg(not(unix))]
    let _ = (info, mode_override);

    Ok(())
}

fn export_symlink(fsys: &dyn PathedFs, name: &str, target: &Path) -> Result<()> {
    let link_fs = fsys.as_read_link().ok_or_else(|| Error::Unsupported {
        capability: "reading symlinks".to_string(),
        path: path::join(fsys.path(), name),
    })?;
    let link = link_fs.read_link(name)?;
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target).map_err(|e| host_error(target, e))?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&link, target).map_err(|e| host_error(target, e))
    }
    #[cfg(not(unix))]
    {
        let _ = link;
        Err(Error::Unsupported {
            capability: "creating symlinks".to_string(),
            path: target.display().to_string(),
        })
    }
}
