//! # Pathed Filesystems
//!
//! Every tree-like data source in palletfs implements [`PathedFs`]: it knows
//! its own root path, can open, stat and list files relative to that root,
//! and can produce a restricted view rooted at a subdirectory. Filesystems
//! which can read symbolic links without following them additionally
//! implement [`ReadLinkFs`], and advertise it through
//! [`PathedFs::as_read_link`]. Callers must query for the capability rather
//! than assume it.
//!
//! ## Implementations
//!
//! - [`DirFs`]: a directory on the host.
//! - [`MemoryFs`]: an in-memory file map.
//! - [`crate::mergefs::MergeFs`]: an overlay merged with imported files.
//!
//! Names passed to every operation are slash-separated paths relative to the
//! filesystem root; `.` names the root itself.

mod dir;
mod memory;

pub use dir::DirFs;
pub use memory::{File, MemoryFs};

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::path::{self, Glob};

/// The kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
}

/// Metadata for a file, directory, or symlink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name of the entry (`.` for a filesystem root)
    pub name: String,
    /// Size in bytes; zero for directories
    pub size: u64,
    pub kind: FileKind,
    /// Permission bits, e.g. `0o644`
    pub permissions: u32,
    pub modified: SystemTime,
}

impl FileInfo {
    /// Metadata for a directory that exists only virtually.
    pub fn synthetic_dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            size: 0,
            kind: FileKind::Dir,
            permissions: 0o755,
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }

    /// Returns a copy of this metadata under a different base name.
    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

/// A single entry returned by [`PathedFs::read_dir`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub info: FileInfo,
}

impl DirEntry {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn is_dir(&self) -> bool {
        self.info.is_dir()
    }
}

impl From<FileInfo> for DirEntry {
    fn from(info: FileInfo) -> Self {
        Self { info }
    }
}

/// An open file handle.
///
/// Reading a handle opened on a directory fails.
pub trait FsFile: Read + Send + fmt::Debug {
    fn stat(&self) -> Result<FileInfo>;
}

/// A filesystem rooted at a known path.
pub trait PathedFs: Send + Sync + fmt::Debug {
    /// The path of this filesystem's root, e.g. a host directory or a
    /// `path@version` location inside a cache.
    fn path(&self) -> &str;

    fn open(&self, name: &str) -> Result<Box<dyn FsFile>>;

    /// Returns metadata for `name`, following a final symlink.
    fn stat(&self, name: &str) -> Result<FileInfo>;

    /// Lists `name`, sorted by entry name.
    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>>;

    fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    /// Returns a view rooted at the subdirectory `dir`, whose
    /// [`path`](PathedFs::path) is this filesystem's path joined with `dir`.
    fn sub(&self, dir: &str) -> Result<Arc<dyn PathedFs>>;

    /// Capability query for reading symlinks without following them.
    fn as_read_link(&self) -> Option<&dyn ReadLinkFs> {
        None
    }
}

/// Optional capability: read symbolic links without following them.
pub trait ReadLinkFs: PathedFs {
    /// Returns the target of the symlink at `name`.
    fn read_link(&self, name: &str) -> Result<String>;

    /// Returns metadata for `name` without following a final symlink.
    fn stat_link(&self, name: &str) -> Result<FileInfo>;
}

/// Returns link-aware metadata when the filesystem supports it, and
/// ordinary metadata otherwise.
pub fn stat_maybe_link(fsys: &dyn PathedFs, name: &str) -> Result<FileInfo> {
    match fsys.as_read_link() {
        Some(rl) => rl.stat_link(name),
        None => fsys.stat(name),
    }
}

/// A file handle over bytes already in memory.
#[derive(Debug)]
pub struct BytesFile {
    info: FileInfo,
    cursor: std::io::Cursor<Vec<u8>>,
}

impl BytesFile {
    pub fn new(info: FileInfo, content: Vec<u8>) -> Self {
        Self {
            info,
            cursor: std::io::Cursor::new(content),
        }
    }
}

impl Read for BytesFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl FsFile for BytesFile {
    fn stat(&self) -> Result<FileInfo> {
        Ok(self.info.clone())
    }
}

/// A handle opened on a directory. It can be stat'ed but not read.
#[derive(Debug)]
pub struct DirHandle {
    info: FileInfo,
}

impl DirHandle {
    pub fn new(info: FileInfo) -> Self {
        Self { info }
    }
}

impl Read for DirHandle {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other(format!(
            "{} is a directory",
            self.info.name
        )))
    }
}

impl FsFile for DirHandle {
    fn stat(&self) -> Result<FileInfo> {
        Ok(self.info.clone())
    }
}

/// What a [`walk_dir`] visitor wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// Do not descend into the directory just visited.
    SkipDir,
}

/// Walks the tree rooted at `root` in pre-order, visiting entries in name
/// order.
///
/// The visitor receives the path of each entry relative to the filesystem
/// (not to `root`) and its link-aware metadata. Symlinks to directories are
/// not followed.
pub fn walk_dir<F>(fsys: &dyn PathedFs, root: &str, mut visit: F) -> Result<()>
where
    F: FnMut(&str, &FileInfo) -> Result<Walk>,
{
    let root = path::clean(root)?;
    let info = stat_maybe_link(fsys, &root)?;
    walk_entry(fsys, &root, &info, &mut visit)
}

fn walk_entry<F>(fsys: &dyn PathedFs, name: &str, info: &FileInfo, visit: &mut F) -> Result<()>
where
    F: FnMut(&str, &FileInfo) -> Result<Walk>,
{
    if visit(name, info)? == Walk::SkipDir || !info.is_dir() {
        return Ok(());
    }
    for entry in fsys.read_dir(name)? {
        let child = path::join(name, entry.name());
        walk_entry(fsys, &child, &entry.info, visit)?;
    }
    Ok(())
}

/// Returns every path in `fsys` matching a doublestar `pattern`, sorted.
pub fn glob(fsys: &dyn PathedFs, pattern: &str) -> Result<Vec<String>> {
    let matcher = Glob::new(pattern)?;
    let mut matches = Vec::new();
    walk_dir(fsys, path::ROOT, |name, _| {
        if name != path::ROOT && matcher.matches(name) {
            matches.push(name.to_string());
        }
        Ok(Walk::Continue)
    })?;
    matches.sort();
    Ok(matches)
}

/// Reports whether `name` exists in `fsys`, distinguishing not-found from
/// other failures.
pub fn exists(fsys: &dyn PathedFs, name: &str) -> Result<bool> {
    match fsys.stat(name) {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

pub(crate) fn not_a_dir(fs_path: &str, name: &str) -> Error {
    Error::FsIo {
        path: path::join(fs_path, name),
        source: std::io::Error::other("not a directory"),
    }
}

pub(crate) fn is_a_dir(fs_path: &str, name: &str) -> Error {
    Error::FsIo {
        path: path::join(fs_path, name),
        source: std::io::Error::other("is a directory"),
    }
}
