//! Host directory filesystem

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::{DirEntry, DirHandle, FileInfo, FileKind, FsFile, PathedFs, ReadLinkFs};
use crate::error::{Error, Result};
use crate::path;

/// A [`PathedFs`] backed by a directory on the host.
///
/// The logical path of the root is the host path rendered with `/`
/// separators. Names are resolved relative to the root and may not escape it.
#[derive(Debug, Clone)]
pub struct DirFs {
    host_root: PathBuf,
    path: String,
}

impl DirFs {
    pub fn new(host_root: impl Into<PathBuf>) -> Self {
        let host_root = host_root.into();
        let path = host_path_to_slash(&host_root);
        Self { host_root, path }
    }

    /// The host directory this filesystem is rooted at.
    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    fn host_path(&self, name: &str) -> Result<(String, PathBuf)> {
        let name = path::clean(name)?;
        let mut host = self.host_root.clone();
        if name != path::ROOT {
            host.extend(name.split('/'));
        }
        Ok((name, host))
    }

    fn logical(&self, name: &str) -> String {
        path::join(&self.path, name)
    }
}

fn host_path_to_slash(p: &Path) -> String {
    let rendered = p.to_string_lossy();
    let slashed = if std::path::MAIN_SEPARATOR == '/' {
        rendered.into_owned()
    } else {
        rendered.replace(std::path::MAIN_SEPARATOR, "/")
    };
    match slashed.trim_end_matches('/') {
        "" if slashed.starts_with('/') => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn file_info(name: &str, metadata: &fs::Metadata) -> FileInfo {
    let kind = if metadata.file_type().is_symlink() {
        FileKind::Symlink
    } else if metadata.is_dir() {
        FileKind::Dir
    } else {
        FileKind::File
    };
    FileInfo {
        name: name.to_string(),
        size: if kind == FileKind::Dir { 0 } else { metadata.len() },
        kind,
        permissions: permissions(metadata),
        modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    }
}

#[cfg(unix)]
fn permissions(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permissions(metadata: &fs::Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

/// An open host file.
#[derive(Debug)]
struct HostFile {
    info: FileInfo,
    file: fs::File,
}

impl Read for HostFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl FsFile for HostFile {
    fn stat(&self) -> Result<FileInfo> {
        Ok(self.info.clone())
    }
}

impl PathedFs for DirFs {
    fn path(&self) -> &str {
        &self.path
    }

    fn open(&self, name: &str) -> Result<Box<dyn FsFile>> {
        let info = self.stat(name)?;
        if info.is_dir() {
            return Ok(Box::new(DirHandle::new(info)));
        }
        let (name, host) = self.host_path(name)?;
        let file = fs::File::open(&host).map_err(|e| Error::from_io(self.logical(&name), e))?;
        Ok(Box::new(HostFile { info, file }))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        let (name, host) = self.host_path(name)?;
        let metadata = fs::metadata(&host).map_err(|e| Error::from_io(self.logical(&name), e))?;
        Ok(file_info(path::base(&name), &metadata))
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        let (name, host) = self.host_path(name)?;
        let logical = self.logical(&name);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&host).map_err(|e| Error::from_io(logical.clone(), e))? {
            let entry = entry.map_err(|e| Error::from_io(logical.clone(), e))?;
            let child = entry.file_name().to_string_lossy().into_owned();
            let metadata = fs::symlink_metadata(entry.path())
                .map_err(|e| Error::from_io(path::join(&logical, &child), e))?;
            entries.push(DirEntry::from(file_info(&child, &metadata)));
        }
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let (name, host) = self.host_path(name)?;
        if host.is_dir() {
            return Err(super::is_a_dir(&self.path, &name));
        }
        fs::read(&host).map_err(|e| Error::from_io(self.logical(&name), e))
    }

    fn sub(&self, dir: &str) -> Result<Arc<dyn PathedFs>> {
        let (dir, host) = self.host_path(dir)?;
        if !self.stat(&dir)?.is_dir() {
            return Err(super::not_a_dir(&self.path, &dir));
        }
        Ok(Arc::new(DirFs {
            host_root: host,
            path: self.logical(&dir),
        }))
    }

    fn as_read_link(&self) -> Option<&dyn ReadLinkFs> {
        Some(self)
    }
}

impl ReadLinkFs for DirFs {
    fn read_link(&self, name: &str) -> Result<String> {
        let (name, host) = self.host_path(name)?;
        let target = fs::read_link(&host).map_err(|e| Error::from_io(self.logical(&name), e))?;
        Ok(host_path_to_slash(&target))
    }

    fn stat_link(&self, name: &str) -> Result<FileInfo> {
        let (name, host) = self.host_path(name)?;
        let metadata =
            fs::symlink_metadata(&host).map_err(|e| Error::from_io(self.logical(&name), e))?;
        Ok(file_info(path::base(&name), &metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, DirFs) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/b")).unwrap();
        fs::write(temp.path().join("a/b/c.txt"), "c").unwrap();
        fs::write(temp.path().join("top.txt"), "top").unwrap();
        let dir_fs = DirFs::new(temp.path());
        (temp, dir_fs)
    }

    #[test]
    fn test_stat_and_read() {
        let (_temp, fs) = fixture();
        assert!(fs.stat(".").unwrap().is_dir());
        assert!(fs.stat("a/b").unwrap().is_dir());
        let info = fs.stat("a/b/c.txt").unwrap();
        assert!(info.is_file());
        assert_eq!(info.name, "c.txt");
        assert_eq!(info.size, 1);
        assert_eq!(fs.read_file("top.txt").unwrap(), b"top");
    }

    #[test]
    fn test_missing_is_not_found() {
        let (_temp, fs) = fixture();
        assert!(fs.stat("missing").unwrap_err().is_not_found());
        assert!(fs.read_file("a/missing.txt").unwrap_err().is_not_found());
        assert!(fs.read_dir("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_escape_rejected() {
        let (_temp, fs) = fixture();
        let err = fs.stat("../outside").unwrap_err();
        assert!(matches!(err, Error::Path { .. }));
    }

    #[test]
    fn test_read_dir_sorted() {
        let (_temp, fs) = fixture();
        let names: Vec<_> = fs
            .read_dir(".")
            .unwrap()
            .into_iter()
            .map(|e| e.info.name)
            .collect();
        assert_eq!(names, vec!["a", "top.txt"]);
    }

    #[test]
    fn test_sub_path_invariant() {
        let (_temp, fs) = fixture();
        let sub = fs.sub("a/b").unwrap();
        assert_eq!(sub.path(), format!("{}/a/b", fs.path()));
        assert_eq!(sub.read_file("c.txt").unwrap(), b"c");
    }

    #[test]
    fn test_trailing_separator_trimmed_from_path() {
        let (temp, fs) = fixture();
        let slashed = DirFs::new(format!("{}/", temp.path().display()));
        assert_eq!(slashed.path(), fs.path());
        assert_eq!(
            slashed.sub("a/b").unwrap().path(),
            fs.sub("a/b").unwrap().path()
        );
        assert_eq!(DirFs::new("/").path(), "/");
    }

    #[test]
    fn test_dir_and_file_misuse_errors() {
        let (_temp, fs) = fixture();
        assert!(fs.read_file("a").is_err());
        assert!(fs.sub("top.txt").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed_by_stat_link() {
        let (temp, fs) = fixture();
        std::os::unix::fs::symlink("top.txt", temp.path().join("link")).unwrap();
        assert_eq!(fs.read_link("link").unwrap(), "top.txt");
        assert!(fs.stat_link("link").unwrap().is_symlink());
        assert!(fs.stat("link").unwrap().is_file());
        let entries = fs.read_dir(".").unwrap();
        let link = entries.iter().find(|e| e.name() == "link").unwrap();
        assert!(link.info.is_symlink());
    }
}
