//! # Version Ordering
//!
//! Pallet versions are opaque strings: usually a tag like `v1.2.3`, sometimes
//! a computed pseudo-version such as `v0.0.0-20240101120000-abcdef123456`.
//! Both forms are valid semantic versions once the leading `v` is stripped,
//! so they are ordered by semver precedence. Anything that does not parse
//! sorts after every semantic version, lexically among themselves, so that
//! ordering stays total and deterministic.

use std::cmp::Ordering;

use semver::Version;

/// Parse a version string, with or without a leading `v`, as semver
pub fn parse_version(version: &str) -> Option<Version> {
    let version_str = version.strip_prefix('v').unwrap_or(version);
    Version::parse(version_str).ok()
}

/// Compare two version strings by semver precedence
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sorts and deduplicates a list of versions in precedence order
pub fn sort_versions(versions: &mut Vec<String>) {
    versions.sort_by(|a, b| compare_versions(a, b));
    versions.dedup();
}
