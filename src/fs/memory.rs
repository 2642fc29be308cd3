//! In-memory filesystem implementation

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::SystemTime;

use super::{BytesFile, DirEntry, DirHandle, FileInfo, FileKind, FsFile, PathedFs, ReadLinkFs};
use crate::error::{Error, Result};
use crate::path;

const MAX_LINK_HOPS: usize = 40;

/// Represents a file with content and metadata
#[derive(Debug, Clone)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// File permissions (simplified as u32)
    pub permissions: u32,
    /// File modification time
    pub modified_time: SystemTime,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            permissions: 0o644,
            modified_time: SystemTime::now(),
        }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// In-memory filesystem.
///
/// Directories exist when added explicitly or when implied by the path of
/// any file or symlink beneath them.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    root: String,
    files: BTreeMap<String, File>,
    links: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
}

impl MemoryFs {
    /// Create a new empty filesystem with an empty root path
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty filesystem reporting `root` as its path
    pub fn with_path(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Add or update a file
    pub fn add_file<P: AsRef<str>>(&mut self, path: P, file: File) -> Result<()> {
        let path = entry_path(path.as_ref())?;
        self.links.remove(&path);
        self.files.insert(path, file);
        Ok(())
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<str>>(&mut self, path: P, content: &str) -> Result<()> {
        self.add_file(path, File::from_string(content))
    }

    /// Add an empty directory
    pub fn add_dir<P: AsRef<str>>(&mut self, path: P) -> Result<()> {
        let path = entry_path(path.as_ref())?;
        self.dirs.insert(path);
        Ok(())
    }

    /// Add a symlink at `path` pointing at `target`
    pub fn add_symlink<P: AsRef<str>>(&mut self, path: P, target: &str) -> Result<()> {
        let path = entry_path(path.as_ref())?;
        self.files.remove(&path);
        self.links.insert(path, target.to_string());
        Ok(())
    }

    fn is_dir(&self, name: &str) -> bool {
        if name == path::ROOT || self.dirs.contains(name) {
            return true;
        }
        let prefix = format!("{}/", name);
        has_key_with_prefix(self.files.keys(), &prefix)
            || has_key_with_prefix(self.links.keys(), &prefix)
            || has_key_with_prefix(self.dirs.iter(), &prefix)
    }

    fn lstat(&self, name: &str) -> Result<FileInfo> {
        let base = path::base(name);
        if let Some(file) = self.files.get(name) {
            return Ok(FileInfo {
                name: base.to_string(),
                size: file.size() as u64,
                kind: FileKind::File,
                permissions: file.permissions,
                modified: file.modified_time,
            });
        }
        if let Some(target) = self.links.get(name) {
            return Ok(FileInfo {
                name: base.to_string(),
                size: target.len() as u64,
                kind: FileKind::Symlink,
                permissions: 0o777,
                modified: SystemTime::UNIX_EPOCH,
            });
        }
        if self.is_dir(name) {
            return Ok(FileInfo::synthetic_dir(base));
        }
        Err(Error::not_found(path::join(&self.root, name)))
    }

    /// Follows symlinks until reaching a non-link path.
    fn resolve(&self, name: &str) -> Result<String> {
        let mut current = name.to_string();
        for _ in 0..MAX_LINK_HOPS {
            match self.links.get(&current) {
                Some(target) => {
                    current = path::clean(&path::join(path::dir(&current), target))?;
                }
                None => return Ok(current),
            }
        }
        Err(Error::Path {
            message: format!("too many levels of symlinks at {}", name),
        })
    }
}

fn entry_path(name: &str) -> Result<String> {
    let cleaned = path::clean(name)?;
    if cleaned == path::ROOT {
        return Err(Error::Path {
            message: "cannot replace the filesystem root".to_string(),
        });
    }
    Ok(cleaned)
}

fn has_key_with_prefix<'a>(mut keys: impl Iterator<Item = &'a String>, prefix: &str) -> bool {
    keys.any(|k| k.starts_with(prefix))
}

fn rekey<V: Clone>(map: &BTreeMap<String, V>, dir: &str) -> BTreeMap<String, V> {
    map.iter()
        .filter_map(|(k, v)| {
            path::strip_dir_prefix(k, dir).map(|rel| (rel.to_string(), v.clone()))
        })
        .collect()
}

impl PathedFs for MemoryFs {
    fn path(&self) -> &str {
        &self.root
    }

    fn open(&self, name: &str) -> Result<Box<dyn FsFile>> {
        let info = self.stat(name)?;
        if info.is_dir() {
            return Ok(Box::new(DirHandle::new(info)));
        }
        let content = self.read_file(name)?;
        Ok(Box::new(BytesFile::new(info, content)))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        let name = path::clean(name)?;
        let resolved = self.resolve(&name)?;
        Ok(self.lstat(&resolved)?.renamed(path::base(&name)))
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        let name = self.resolve(&path::clean(name)?)?;
        let info = self.lstat(&name)?;
        if !info.is_dir() {
            return Err(super::not_a_dir(&self.root, &name));
        }

        let mut children: BTreeMap<String, FileInfo> = BTreeMap::new();
        let keys = self
            .files
            .keys()
            .chain(self.links.keys())
            .chain(self.dirs.iter());
        for key in keys {
            let Some(rel) = path::strip_dir_prefix(key, &name) else {
                continue;
            };
            let child = rel.split('/').next().unwrap_or(rel);
            if children.contains_key(child) {
                continue;
            }
            let info = self.lstat(&path::join(&name, child))?;
            children.insert(child.to_string(), info);
        }
        Ok(children.into_values().map(DirEntry::from).collect())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let name = self.resolve(&path::clean(name)?)?;
        match self.files.get(&name) {
            Some(file) => Ok(file.content.clone()),
            None if self.is_dir(&name) => Err(super::is_a_dir(&self.root, &name)),
            None => Err(Error::not_found(path::join(&self.root, &name))),
        }
    }

    fn sub(&self, dir: &str) -> Result<Arc<dyn PathedFs>> {
        let dir = path::clean(dir)?;
        if !self.lstat(&dir)?.is_dir() {
            return Err(super::not_a_dir(&self.root, &dir));
        }
        Ok(Arc::new(MemoryFs {
            root: path::join(&self.root, &dir),
            files: rekey(&self.files, &dir),
            links: rekey(&self.links, &dir),
            dirs: self
                .dirs
                .iter()
                .filter_map(|d| path::strip_dir_prefix(d, &dir).map(str::to_string))
                .collect(),
        }))
    }

    fn as_read_link(&self) -> Option<&dyn ReadLinkFs> {
        Some(self)
    }
}

impl ReadLinkFs for MemoryFs {
    fn read_link(&self, name: &str) -> Result<String> {
        let name = path::clean(name)?;
        match self.links.get(&name) {
            Some(target) => Ok(target.clone()),
            None => {
                self.lstat(&name)?;
                Err(Error::FsIo {
                    path: path::join(&self.root, &name),
                    source: std::io::Error::other("not a symlink"),
                })
            }
        }
    }

    fn stat_link(&self, name: &str) -> Result<FileInfo> {
        self.lstat(&path::clean(name)?)
    }
}
