//! Composition of an overlay cache over an underlay cache

use std::sync::Arc;

use log::debug;

use super::{OverlayPalletCache, PalletCache};
use crate::error::{Error, Result, ResultExt};
use crate::pallet::{compare_pallets, FsPallet};
use crate::pkg::{compare_pkgs, FsPkg};

/// A cache consulting `overlay` for what it claims and `underlay` for
/// everything else.
///
/// Either layer may be absent. Lookups that need an absent layer fail with
/// [`Error::CacheAbsent`]; an absent overlay claims nothing.
#[derive(Clone, Default)]
pub struct LayeredPalletCache {
    pub underlay: Option<Arc<dyn PalletCache>>,
    pub overlay: Option<Arc<dyn OverlayPalletCache>>,
}

impl std::fmt::Debug for LayeredPalletCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredPalletCache")
            .field("underlay", &self.underlay.is_some())
            .field("overlay", &self.overlay.is_some())
            .finish()
    }
}

impl LayeredPalletCache {
    pub fn new(underlay: Arc<dyn PalletCache>, overlay: Arc<dyn OverlayPalletCache>) -> Self {
        Self {
            underlay: Some(underlay),
            overlay: Some(overlay),
        }
    }

    fn underlay(&self) -> Result<&dyn PalletCache> {
        self.underlay.as_deref().ok_or_else(|| Error::CacheAbsent {
            layer: "underlay".to_string(),
        })
    }

    /// The overlay, if it claims `path@version`.
    fn claiming_pallet(&self, path: &str, version: &str) -> Option<&dyn OverlayPalletCache> {
        self.overlay
            .as_deref()
            .filter(|overlay| overlay.includes_fs_pallet(path, version))
    }

    fn claiming_pkg(&self, pkg_path: &str, version: &str) -> Option<&dyn OverlayPalletCache> {
        self.overlay
            .as_deref()
            .filter(|overlay| overlay.includes_fs_pkg(pkg_path, version))
    }
}

impl PalletCache for LayeredPalletCache {
    fn load_fs_pallet(&self, path: &str, version: &str) -> Result<Arc<FsPallet>> {
        if let Some(overlay) = self.claiming_pallet(path, version) {
            debug!("overlay claims pallet {}@{}", path, version);
            return overlay
                .load_fs_pallet(path, version)
                .with_context(|| format!("couldn't load pallet {}@{} from overlay", path, version));
        }
        self.underlay()?
            .load_fs_pallet(path, version)
            .with_context(|| format!("couldn't load pallet {}@{} from underlay", path, version))
    }

    fn load_fs_pallets(&self, pattern: &str) -> Result<Vec<Arc<FsPallet>>> {
        let underlay = self.underlay()?;
        let mut pallets = match self.overlay.as_deref() {
            Some(overlay) => overlay
                .load_fs_pallets(pattern)
                .with_context(|| format!("couldn't list pallets matching {} in overlay", pattern))?,
            None => Vec::new(),
        };
        for pallet in underlay
            .load_fs_pallets(pattern)
            .with_context(|| format!("couldn't list pallets matching {} in underlay", pattern))?
        {
            if self.claiming_pallet(pallet.path(), &pallet.version).is_none() {
                pallets.push(pallet);
            }
        }
        pallets.sort_by(|a, b| compare_pallets(a, b));
        Ok(pallets)
    }

    fn load_fs_pkg(&self, pkg_path: &str, version: &str) -> Result<FsPkg> {
        if let Some(overlay) = self.claiming_pkg(pkg_path, version) {
            debug!("overlay claims package {}@{}", pkg_path, version);
            return overlay
                .load_fs_pkg(pkg_path, version)
                .with_context(|| format!("couldn't load package {}@{} from overlay", pkg_path, version));
        }
        self.underlay()?
            .load_fs_pkg(pkg_path, version)
            .with_context(|| format!("couldn't load package {}@{} from underlay", pkg_path, version))
    }

    fn load_fs_pkgs(&self, pattern: &str) -> Result<Vec<FsPkg>> {
        let underlay = self.underlay()?;
        let mut pkgs = match self.overlay.as_deref() {
            Some(overlay) => overlay
                .load_fs_pkgs(pattern)
                .with_context(|| format!("couldn't list packages matching {} in overlay", pattern))?,
            None => Vec::new(),
        };
        for pkg in underlay
            .load_fs_pkgs(pattern)
            .with_context(|| format!("couldn't list packages matching {} in underlay", pattern))?
        {
            if self.claiming_pkg(&pkg.path, pkg.version()).is_none() {
                pkgs.push(pkg);
            }
        }
        pkgs.sort_by(compare_pkgs);
        Ok(pkgs)
    }
}
