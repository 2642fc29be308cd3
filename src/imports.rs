//! # Pallet Imports
//!
//! A pallet may import files from other pallets by listing them under
//! `imports:` in its `pallet.yml`. Importing never copies anything: the
//! importing pallet's own tree becomes the overlay of a [`MergeFs`], and each
//! imported file becomes a [`FileRef`] into the required pallet's filesystem.
//!
//! Each import names a required pallet by path and version and an optional
//! list of modifiers, applied in order:
//!
//! - `add` maps every file at or beneath `source` to the same relative
//!   location beneath `target` (which defaults to `source`);
//! - `remove` drops every file accumulated so far at or beneath `target`.
//!
//! An import without modifiers adds the whole required pallet, except its
//! `pallet.yml`. Required pallets are merged recursively, so a file imported
//! through several pallets keeps its whole provenance chain.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::cache::PalletCache;
use crate::error::{Error, Result, ResultExt};
use crate::fs::{self, PathedFs, Walk};
use crate::mergefs::{FileRef, MergeFs};
use crate::pallet::{FsPallet, PALLET_DECL_FILE};
use crate::path;

/// One entry of the `imports:` list in a `pallet.yml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImportDecl {
    /// Path of the required pallet
    pub pallet: String,
    /// Version of the required pallet
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<ImportModifier>,
}

/// A step transforming the set of files imported from one pallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ImportModifier {
    Add {
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    Remove {
        target: String,
    },
}

/// A pallet after import resolution, with the imports that remain visible.
struct Merged {
    pallet: FsPallet,
    visible: BTreeMap<String, FileRef>,
}

/// Resolves the imports of `pallet`, loading required pallets from `cache`.
///
/// Returns the pallet with its filesystem replaced by a [`MergeFs`]; a pallet
/// without imports is returned unchanged.
pub fn merge_fs_pallet(pallet: &FsPallet, cache: &dyn PalletCache) -> Result<FsPallet> {
    Ok(merge_fs_pallet_imports(pallet, cache)?.0)
}

/// Like [`merge_fs_pallet`], also returning the imported files that remain
/// visible through the overlay, keyed by target path.
pub fn merge_fs_pallet_imports(
    pallet: &FsPallet,
    cache: &dyn PalletCache,
) -> Result<(FsPallet, BTreeMap<String, FileRef>)> {
    let merged = merge_with_chain(pallet, cache, &mut Vec::new())?;
    Ok((merged.pallet, merged.visible))
}

fn merge_with_chain(
    pallet: &FsPallet,
    cache: &dyn PalletCache,
    chain: &mut Vec<String>,
) -> Result<Merged> {
    if pallet.decl.imports.is_empty() {
        return Ok(Merged {
            pallet: pallet.clone(),
            visible: BTreeMap::new(),
        });
    }

    let label = pallet.path_version();
    if chain.contains(&label) {
        let mut cycle = chain.clone();
        cycle.push(label);
        return Err(Error::CycleDetected {
            cycle: cycle.join(" -> "),
        });
    }

    chain.push(label);
    let refs = evaluate_imports(pallet, cache, chain);
    chain.pop();

    let merged = MergeFs::new(pallet.fs.clone(), refs?)?;
    let visible = merged.list_imports()?;
    Ok(Merged {
        pallet: pallet.clone().with_fs(Arc::new(merged)),
        visible,
    })
}

fn evaluate_imports(
    pallet: &FsPallet,
    cache: &dyn PalletCache,
    chain: &mut Vec<String>,
) -> Result<BTreeMap<String, FileRef>> {
    let mut refs: BTreeMap<String, FileRef> = BTreeMap::new();
    for import in &pallet.decl.imports {
        let label = path::path_version(&import.pallet, &import.version);
        let required = cache
            .load_fs_pallet(&import.pallet, &import.version)
            .with_context(|| {
                format!(
                    "couldn't load pallet {} required by {}",
                    label,
                    pallet.path_version()
                )
            })?;
        let merged = merge_with_chain(&required, cache, chain)
            .with_context(|| format!("couldn't merge imports of {}", label))?;
        let files = list_files(merged.pallet.fs.as_ref())?;
        debug!("{} offers {} files to {}", label, files.len(), pallet.path());

        let resolve = |file: &str| -> FileRef {
            match merged.visible.get(file) {
                Some(inner) => {
                    let mut sources = vec![label.clone()];
                    sources.extend(inner.sources.iter().cloned());
                    FileRef::new(sources, inner.fs.clone(), inner.path.clone())
                }
                None => FileRef::new(vec![label.clone()], required.fs.clone(), file),
            }
        };

        let default_modifiers = [ImportModifier::Add {
            source: path::ROOT.to_string(),
            target: None,
        }];
        let modifiers = if import.modifiers.is_empty() {
            &default_modifiers[..]
        } else {
            &import.modifiers[..]
        };

        let mut imported: BTreeMap<String, FileRef> = BTreeMap::new();
        for modifier in modifiers {
            match modifier {
                ImportModifier::Add { source, target } => {
                    let source = path::clean(source)?;
                    let target = path::clean(target.as_deref().unwrap_or(&source))?;
                    let mut matched = false;
                    for file in files.iter().filter(|f| path::is_within(f, &source)) {
                        if source == path::ROOT && file == PALLET_DECL_FILE {
                            continue;
                        }
                        let rel = path::strip_dir_prefix(file, &source).unwrap_or(path::ROOT);
                        let dest = path::join(&target, rel);
                        if dest == path::ROOT {
                            return Err(Error::Path {
                                message: format!(
                                    "import of {} from {} targets the pallet root",
                                    file, label
                                ),
                            });
                        }
                        imported.insert(dest, resolve(file.as_str()));
                        matched = true;
                    }
                    if !matched {
                        return Err(Error::not_found(format!("{} in pallet {}", source, label))
                            .context(format!("couldn't import into {}", pallet.path_version())));
                    }
                }
                ImportModifier::Remove { target } => {
                    let target = path::clean(target)?;
                    imported.retain(|dest, _| !path::is_within(dest, &target));
                }
            }
        }

        for (dest, file_ref) in imported {
            if let Some(previous) = refs.get(&dest) {
                warn!(
                    "{} imported from {} replaces the copy {}",
                    dest,
                    label,
                    previous.describe()
                );
            }
            refs.insert(dest, file_ref);
        }
    }
    Ok(refs)
}

/// Lists every non-directory entry of `fsys`, sorted.
fn list_files(fsys: &dyn PathedFs) -> Result<Vec<String>> {
    let mut files = Vec::new();
    fs::walk_dir(fsys, path::ROOT, |name, info| {
        if !info.is_dir() {
            files.push(name.to_string());
        }
        Ok(Walk::Continue)
    })?;
    Ok(files)
}
