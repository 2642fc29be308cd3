//! Logical path utilities for palletfs
//!
//! All paths inside the library are slash-separated logical paths. A
//! filesystem-relative path is never absolute; the root of a filesystem is
//! written `.`. Host separators only appear at the [`crate::fs::DirFs`]
//! boundary.

use crate::error::{Error, Result};
use glob::{MatchOptions, Pattern};

/// The logical name of a filesystem's root.
pub const ROOT: &str = ".";

/// Match options for the doublestar dialect used everywhere in palletfs:
/// `*` and `?` never cross a `/`, while a `**` component does.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled doublestar glob pattern, for matching many paths.
#[derive(Debug, Clone)]
pub struct Glob(Pattern);

impl Glob {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self(Pattern::new(pattern)?))
    }

    pub fn matches(&self, path: &str) -> bool {
        self.0.matches_with(path, MATCH_OPTIONS)
    }
}

/// Cleans a filesystem-relative path.
///
/// Empty components and `.` are dropped, `..` removes the previous component,
/// and a leading `/` is treated as the filesystem root. The root itself
/// cleans to `"."`. A path that escapes the root is rejected.
pub fn clean(name: &str) -> Result<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in name.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::Path {
                        message: format!("path {:?} escapes its root", name),
                    });
                }
            }
            _ => parts.push(part),
        }
    }
    if parts.is_empty() {
        Ok(ROOT.to_string())
    } else {
        Ok(parts.join("/"))
    }
}

/// Joins two logical paths, treating `.` and the empty string as identity.
pub fn join(base: &str, name: &str) -> String {
    match (base, name) {
        ("" | ROOT, n) => n.to_string(),
        (b, "" | ROOT) => b.to_string(),
        (b, n) => format!("{}/{}", b.trim_end_matches('/'), n),
    }
}

/// Returns the parent of a cleaned relative path, or `"."` at the top level.
pub fn dir(name: &str) -> &str {
    match name.rfind('/') {
        Some(i) => &name[..i],
        None => ROOT,
    }
}

/// Returns the final component of a cleaned path.
pub fn base(name: &str) -> &str {
    match name.rfind('/') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

/// Returns `name` relative to `prefix` if `name` lies strictly beneath it.
pub fn strip_dir_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix == ROOT {
        return if name == ROOT { None } else { Some(name) };
    }
    name.strip_prefix(prefix)?.strip_prefix('/')
}

/// Reports whether `name` equals `prefix` or lies beneath it.
pub fn is_within(name: &str, prefix: &str) -> bool {
    prefix == ROOT || name == prefix || strip_dir_prefix(name, prefix).is_some()
}

/// Splits a `path@version` string at its last `@`.
pub fn split_path_version(s: &str) -> Option<(&str, &str)> {
    let (path, version) = s.rsplit_once('@')?;
    if path.is_empty() || version.is_empty() {
        return None;
    }
    Some((path, version))
}

/// Formats a `path@version` string.
pub fn path_version(path: &str, version: &str) -> String {
    format!("{}@{}", path, version)
}
