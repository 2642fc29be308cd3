//! # Merge Filesystem
//!
//! [`MergeFs`] presents one authoritative *overlay* filesystem merged with a
//! set of files imported by reference from other filesystems, without copying
//! them. Each import is a [`FileRef`] naming, for a target path, the source
//! filesystem, the path inside it, and the provenance chain that led there.
//!
//! ## Resolution
//!
//! Every operation on a name first asks the overlay. Whatever the overlay
//! answers wins, except a not-found, which falls back to:
//!
//! 1. an *implied directory*: an ancestor of some import target which the
//!    overlay lacks. It is synthesized with fixed metadata (directory,
//!    `0755`, size zero, `UNIX_EPOCH`);
//! 2. an *underlay reference*: the operation is delegated to the referenced
//!    filesystem, and failures are wrapped with the provenance chain;
//! 3. otherwise not-found.
//!
//! Precedence is decided per exact path. An overlay directory does not hide
//! imports beneath it from lookups, and no content is merged below the level
//! of whole files.
//!
//! ## Listings
//!
//! `read_dir` unions overlay entries, entries for references matching
//! `name/*`, and implied directories whose parent is `name`. Names are
//! deduplicated with the first source winning in that order, and the result
//! is sorted by name.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::Arc;

use glob::Pattern;

use crate::error::{Error, Result, ResultExt};
use crate::fs::{
    self, stat_maybe_link, DirEntry, DirHandle, FileInfo, FsFile, MemoryFs, PathedFs, ReadLinkFs,
};
use crate::path::{self, Glob};

/// A reference from a target path to a file in another filesystem.
#[derive(Debug, Clone)]
pub struct FileRef {
    /// Provenance labels, outermost first (e.g. `path@version` of each pallet
    /// the file was imported through).
    pub sources: Vec<String>,
    pub fs: Arc<dyn PathedFs>,
    /// Path of the file inside `fs`
    pub path: String,
}

impl FileRef {
    pub fn new(sources: Vec<String>, fs: Arc<dyn PathedFs>, path: impl Into<String>) -> Self {
        Self {
            sources,
            fs,
            path: path.into(),
        }
    }

    /// Describes where this reference points, for error messages.
    pub fn describe(&self) -> String {
        format!(
            "imported from {} ({})",
            self.sources.join(" -> "),
            path::join(self.fs.path(), &self.path)
        )
    }
}

/// What a name resolves to once the overlay has reported not-found.
enum Fallback<'a> {
    Implied,
    Underlay(&'a FileRef),
}

/// A read-only filesystem merging an overlay with imported file references.
#[derive(Debug)]
pub struct MergeFs {
    overlay: Arc<dyn PathedFs>,
    underlay_refs: BTreeMap<String, FileRef>,
    implied_dirs: BTreeSet<String>,
    read_link_capable: bool,
}

impl MergeFs {
    /// Builds a merge filesystem from a snapshot of `overlay` and an import
    /// map of target path to reference.
    ///
    /// Targets are cleaned. The implied directories are computed here by
    /// asking the overlay about every ancestor of every target.
    pub fn new(
        overlay: Arc<dyn PathedFs>,
        underlay_refs: BTreeMap<String, FileRef>,
    ) -> Result<Self> {
        let mut refs = BTreeMap::new();
        for (target, file_ref) in underlay_refs {
            let cleaned = path::clean(&target)?;
            if cleaned == path::ROOT {
                return Err(Error::Path {
                    message: "an import cannot target the filesystem root".to_string(),
                });
            }
            refs.insert(cleaned, file_ref);
        }

        let implied_dirs = compute_implied_dirs(overlay.as_ref(), &refs)?;
        let read_link_capable = overlay.as_read_link().is_some()
            && refs.values().all(|r| r.fs.as_read_link().is_some());

        Ok(Self {
            overlay,
            underlay_refs: refs,
            implied_dirs,
            read_link_capable,
        })
    }

    /// All import references, including those shadowed by the overlay.
    pub fn underlay_refs(&self) -> &BTreeMap<String, FileRef> {
        &self.underlay_refs
    }

    pub fn implied_dirs(&self) -> &BTreeSet<String> {
        &self.implied_dirs
    }

    /// Returns the references whose targets are not shadowed by the overlay:
    /// the files which must be copied in to materialize this tree.
    pub fn list_imports(&self) -> Result<BTreeMap<String, FileRef>> {
        let mut imports = BTreeMap::new();
        for (target, file_ref) in &self.underlay_refs {
            match self.overlay.stat(target) {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    imports.insert(target.clone(), file_ref.clone());
                }
                Err(e) => return Err(self.overlay_error(e, "stat", target)),
            }
        }
        Ok(imports)
    }

    fn overlay_error(&self, e: Error, op: &str, name: &str) -> Error {
        e.context(format!(
            "couldn't {} {} in overlay {}",
            op,
            name,
            self.overlay.path()
        ))
    }

    fn underlay_error(e: Error, op: &str, name: &str, file_ref: &FileRef) -> Error {
        e.context(format!("couldn't {} {}, {}", op, name, file_ref.describe()))
    }

    /// Resolves a name the overlay does not have.
    fn fallback(&self, name: &str) -> Result<Fallback<'_>> {
        if self.implied_dirs.contains(name) {
            return Ok(Fallback::Implied);
        }
        match self.underlay_refs.get(name) {
            Some(file_ref) => Ok(Fallback::Underlay(file_ref)),
            None => Err(Error::not_found(path::join(self.path(), name))),
        }
    }

    fn read_link_overlay(&self, name: &str) -> Result<&dyn ReadLinkFs> {
        self.overlay.as_read_link().ok_or_else(|| Error::Unsupported {
            capability: "reading symlinks".to_string(),
            path: path::join(self.overlay.path(), name),
        })
    }
}

fn compute_implied_dirs(
    overlay: &dyn PathedFs,
    refs: &BTreeMap<String, FileRef>,
) -> Result<BTreeSet<String>> {
    let mut implied = BTreeSet::new();
    let mut present = BTreeSet::new();
    for target in refs.keys() {
        let mut dir = path::dir(target);
        while dir != path::ROOT {
            if !implied.contains(dir) && !present.contains(dir) {
                if fs::exists(overlay, dir)? {
                    present.insert(dir.to_string());
                } else {
                    implied.insert(dir.to_string());
                }
            }
            dir = path::dir(dir);
        }
    }
    Ok(implied)
}

/// A file opened through a reference, reporting the target's base name.
#[derive(Debug)]
struct RenamedFile {
    name: String,
    inner: Box<dyn FsFile>,
}

impl Read for RenamedFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl FsFile for RenamedFile {
    fn stat(&self) -> Result<FileInfo> {
        Ok(self.inner.stat()?.renamed(&self.name))
    }
}

impl PathedFs for MergeFs {
    fn path(&self) -> &str {
        self.overlay.path()
    }

    fn open(&self, name: &str) -> Result<Box<dyn FsFile>> {
        let name = path::clean(name)?;
        match self.overlay.open(&name) {
            Ok(file) => Ok(file),
            Err(e) if e.is_not_found() => match self.fallback(&name)? {
                Fallback::Implied => Ok(Box::new(DirHandle::new(FileInfo::synthetic_dir(
                    path::base(&name),
                )))),
                Fallback::Underlay(file_ref) => {
                    let inner = file_ref
                        .fs
                        .open(&file_ref.path)
                        .map_err(|e| Self::underlay_error(e, "open", &name, file_ref))?;
                    Ok(Box::new(RenamedFile {
                        name: path::base(&name).to_string(),
                        inner,
                    }))
                }
            },
            Err(e) => Err(self.overlay_error(e, "open", &name)),
        }
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        let name = path::clean(name)?;
        match self.overlay.stat(&name) {
            Ok(info) => Ok(info),
            Err(e) if e.is_not_found() => match self.fallback(&name)? {
                Fallback::Implied => Ok(FileInfo::synthetic_dir(path::base(&name))),
                Fallback::Underlay(file_ref) => file_ref
                    .fs
                    .stat(&file_ref.path)
                    .map(|info| info.renamed(path::base(&name)))
                    .map_err(|e| Self::underlay_error(e, "stat", &name, file_ref)),
            },
            Err(e) => Err(self.overlay_error(e, "stat", &name)),
        }
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        let name = path::clean(name)?;
        let mut entries: BTreeMap<String, DirEntry> = BTreeMap::new();

        match self.overlay.read_dir(&name) {
            Ok(overlay_entries) => {
                for entry in overlay_entries {
                    entries.entry(entry.name().to_string()).or_insert(entry);
                }
            }
            Err(e) if e.is_not_found() => match self.fallback(&name)? {
                Fallback::Implied => {}
                Fallback::Underlay(_) => {
                    return Err(fs::not_a_dir(self.path(), &name));
                }
            },
            Err(e) => return Err(self.overlay_error(e, "read directory", &name)),
        }

        let pattern = if name == path::ROOT {
            "*".to_string()
        } else {
            format!("{}/*", Pattern::escape(&name))
        };
        let children = Glob::new(&pattern)?;
        for (target, file_ref) in &self.underlay_refs {
            if !children.matches(target) {
                continue;
            }
            let base = path::base(target);
            if entries.contains_key(base) {
                continue;
            }
            let info = stat_maybe_link(file_ref.fs.as_ref(), &file_ref.path)
                .map_err(|e| Self::underlay_error(e, "stat", target, file_ref))?;
            entries.insert(base.to_string(), DirEntry::from(info.renamed(base)));
        }

        for dir in &self.implied_dirs {
            if path::dir(dir) != name {
                continue;
            }
            let base = path::base(dir);
            entries
                .entry(base.to_string())
                .or_insert_with(|| DirEntry::from(FileInfo::synthetic_dir(base)));
        }

        Ok(entries.into_values().collect())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let name = path::clean(name)?;
        match self.overlay.read_file(&name) {
            Ok(content) => Ok(content),
            Err(e) if e.is_not_found() => match self.fallback(&name)? {
                Fallback::Implied => Err(fs::is_a_dir(self.path(), &name)),
                Fallback::Underlay(file_ref) => file_ref
                    .fs
                    .read_file(&file_ref.path)
                    .map_err(|e| Self::underlay_error(e, "read", &name, file_ref)),
            },
            Err(e) => Err(self.overlay_error(e, "read", &name)),
        }
    }

    fn sub(&self, dir: &str) -> Result<Arc<dyn PathedFs>> {
        let dir = path::clean(dir)?;
        if dir == path::ROOT {
            return Ok(Arc::new(MergeFs::new(
                self.overlay.clone(),
                self.underlay_refs.clone(),
            )?));
        }
        if !self.stat(&dir)?.is_dir() {
            return Err(fs::not_a_dir(self.path(), &dir));
        }

        let overlay: Arc<dyn PathedFs> = match self.overlay.sub(&dir) {
            Ok(sub) => sub,
            Err(e) if e.is_not_found() => {
                Arc::new(MemoryFs::with_path(path::join(self.overlay.path(), &dir)))
            }
            Err(e) => return Err(self.overlay_error(e, "open subdirectory", &dir)),
        };
        let refs = self
            .underlay_refs
            .iter()
            .filter_map(|(target, file_ref)| {
                path::strip_dir_prefix(target, &dir).map(|rel| (rel.to_string(), file_ref.clone()))
            })
            .collect();
        Ok(Arc::new(MergeFs::new(overlay, refs)?))
    }

    fn as_read_link(&self) -> Option<&dyn ReadLinkFs> {
        if self.read_link_capable {
            Some(self)
        } else {
            None
        }
    }
}

impl ReadLinkFs for MergeFs {
    fn read_link(&self, name: &str) -> Result<String> {
        let name = path::clean(name)?;
        match self.read_link_overlay(&name)?.read_link(&name) {
            Ok(target) => Ok(target),
            Err(e) if e.is_not_found() => match self.fallback(&name)? {
                Fallback::Implied => Err(Error::FsIo {
                    path: path::join(self.path(), &name),
                    source: std::io::Error::other("not a symlink"),
                }),
                Fallback::Underlay(file_ref) => {
                    let rl = file_ref.fs.as_read_link().ok_or_else(|| Error::Unsupported {
                        capability: "reading symlinks".to_string(),
                        path: path::join(file_ref.fs.path(), &file_ref.path),
                    })?;
                    rl.read_link(&file_ref.path)
                        .map_err(|e| Self::underlay_error(e, "read link", &name, file_ref))
                }
            },
            Err(e) => Err(self.overlay_error(e, "read link", &name)),
        }
    }

    fn stat_link(&self, name: &str) -> Result<FileInfo> {
        let name = path::clean(name)?;
        match self.read_link_overlay(&name)?.stat_link(&name) {
            Ok(info) => Ok(info),
            Err(e) if e.is_not_found() => match self.fallback(&name)? {
                Fallback::Implied => Ok(FileInfo::synthetic_dir(path::base(&name))),
                Fallback::Underlay(file_ref) => {
                    let rl = file_ref.fs.as_read_link().ok_or_else(|| Error::Unsupported {
                        capability: "reading symlinks".to_string(),
                        path: path::join(file_ref.fs.path(), &file_ref.path),
                    })?;
                    rl.stat_link(&file_ref.path)
                        .map(|info| info.renamed(path::base(&name)))
                        .with_context(|| format!("couldn't lstat {}, {}", name, file_ref.describe()))
                }
            },
            Err(e) => Err(self.overlay_error(e, "lstat", &name)),
        }
    }
}
