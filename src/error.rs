//! # Error Handling
//!
//! This module defines the centralized error type for `palletfs`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! mode of the filesystem and cache layers.
//!
//! ## Taxonomy
//!
//! - **Not-found** (`NotFound`, or any `io::Error` of kind `NotFound`): the
//!   requested path, pallet, version, or package does not exist in the queried
//!   source. This is the only condition that triggers overlay-to-underlay
//!   fallback, in both [`crate::mergefs::MergeFs`] and
//!   [`crate::cache::LayeredPalletCache`].
//! - **Consistency violation** (`Consistency`): a loaded object's declared
//!   identity disagrees with where it was loaded from. Always fatal.
//! - **Capability unsupported** (`Unsupported`): a filesystem lacks the
//!   optional symlink-read capability at a point where it is required.
//! - **I/O failure** (`FsIo`, `Io`): any other read or stat error.
//!
//! Layers add context with [`Error::context`], which wraps the error in a
//! `Context` variant. [`Error::is_not_found`] sees through any number of
//! such wrappers, so context never changes fallback behavior.

use std::io;

use thiserror::Error;

/// Main error type for palletfs operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested path, pallet, version, or package does not exist.
    #[error("{what} not found")]
    NotFound { what: String },

    /// A loaded object's own identity disagrees with its storage location.
    #[error("Consistency violation: {message}")]
    Consistency { message: String },

    /// A filesystem does not implement a capability needed by the caller.
    #[error("{path}: filesystem does not support {capability}")]
    Unsupported { capability: String, path: String },

    /// An I/O error tied to a specific logical or physical path.
    #[error("I/O error on {path}: {source}")]
    FsIo {
        path: String,
        #[source]
        source: io::Error,
    },

    /// An error wrapped with resolution context (path, layer, provenance).
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// An operation was attempted on a cache that is not present.
    #[error("Cache operation error: {layer} cache is absent")]
    CacheAbsent { layer: String },

    /// A circular chain of pallet imports was detected.
    #[error("Cycle detected in pallet imports: {cycle}")]
    CycleDetected { cycle: String },

    /// A pallet or package declaration is malformed.
    #[error("Declaration error in {path}: {message}")]
    Declaration { path: String, message: String },

    /// A logical path is malformed (absolute, escapes its root, ...).
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Builds a not-found error for the given description.
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound { what: what.into() }
    }

    /// Converts an `io::Error` on `path`, keeping not-found distinguishable.
    pub fn from_io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Error::NotFound { what: path }
        } else {
            Error::FsIo { path, source }
        }
    }

    /// Wraps this error with additional resolution context.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Reports whether this error, after unwrapping context, means not-found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Context { source, .. } => source.is_not_found(),
            Error::FsIo { source, .. } | Error::Io(source) => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// Reports whether this error, after unwrapping context, is a
    /// consistency violation.
    pub fn is_consistency(&self) -> bool {
        match self {
            Error::Consistency { .. } => true,
            Error::Context { source, .. } => source.is_consistency(),
            _ => false,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Extension for attaching context to results, mirroring [`Error::context`].
pub trait ResultExt<T> {
    /// Wraps the error, if any, with context computed lazily.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
