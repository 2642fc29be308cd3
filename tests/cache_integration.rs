//! Integration tests for resolving pallets from an on-disk cache.
//!
//! These tests lay out a real cache directory, resolve pallets and packages
//! through the physical, override, and layered caches, and export merged
//! trees back to disk.

mod common;

use std::fs;
use std::sync::Arc;

use common::prelude::*;
use palletfs::cache::{FsPalletCache, LayeredPalletCache, PalletCache, PalletOverrideCache};
use palletfs::export::export_fs;
use palletfs::fs::{DirFs, PathedFs};
use palletfs::imports::{merge_fs_pallet, merge_fs_pallet_imports};
use palletfs::pallet::FsPallet;

fn labels(pallets: &[Arc<FsPallet>]) -> Vec<String> {
    pallets.iter().map(|p| p.path_version()).collect()
}

#[test]
fn test_physical_cache_lists_and_loads_versions() {
    let fixture = CacheFixture::new()
        .with_pallet("github.com/org/repo", "v1.10.0", "")
        .with_pallet("github.com/org/repo", "v1.2.0", "")
        .with_pallet("github.com/org/base", "v0.1.0", "");
    let cache = FsPalletCache::from_dir(fixture.cache_root());

    let all = cache.load_fs_pallets("**").unwrap();
    assert_eq!(
        labels(&all),
        vec![
            "github.com/org/base@v0.1.0",
            "github.com/org/repo@v1.2.0",
            "github.com/org/repo@v1.10.0",
        ]
    );

    let pallet = cache.load_fs_pallet("github.com/org/repo", "v1.2.0").unwrap();
    assert_eq!(pallet.version, "v1.2.0");
    assert!(pallet.fs.path().ends_with("github.com/org/repo@v1.2.0"));

    let err = cache.load_fs_pallet("github.com/org/repo", "v9.9.9").unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);
}

#[test]
fn test_physical_cache_patterns_match_path_or_label() {
    let fixture = CacheFixture::new()
        .with_pallet("github.com/org/repo", "v1.0.0", "")
        .with_pallet("github.com/org/repo", "v2.0.0", "")
        .with_pallet("gitlab.com/other/repo", "v1.0.0", "");
    let cache = FsPalletCache::from_dir(fixture.cache_root());

    let by_path = cache.load_fs_pallets("github.com/org/*").unwrap();
    assert_eq!(by_path.len(), 2);

    let by_label = cache.load_fs_pallets("github.com/org/repo@v2.*").unwrap();
    assert_eq!(labels(&by_label), vec!["github.com/org/repo@v2.0.0"]);
}

#[test]
fn test_physical_cache_rejects_misplaced_pallet() {
    let fixture = CacheFixture::new().with_file(
        "github.com/org/repo@v1.0.0",
        "pallet.yml",
        &decls::pallet("github.com/org/elsewhere", ""),
    );
    let cache = FsPalletCache::from_dir(fixture.cache_root());

    let err = cache.load_fs_pallet("github.com/org/repo", "v1.0.0").unwrap_err();
    assert!(err.is_consistency(), "unexpected error: {}", err);
}

#[test]
fn test_physical_cache_root_with_trailing_slash() {
    let fixture = CacheFixture::new()
        .with_pallet("github.com/org/repo", "v1.0.0", "")
        .with_pkg("github.com/org/repo@v1.0.0", "infra/proxy", "Reverse proxy");
    let cache = FsPalletCache::from_dir(format!("{}/", fixture.cache_root().display()));

    let pallet = cache.load_fs_pallet("github.com/org/repo", "v1.0.0").unwrap();
    assert!(!pallet.fs.path().contains("//"), "{}", pallet.fs.path());
    assert_eq!(labels(&cache.load_fs_pallets("**").unwrap()), vec!["github.com/org/repo@v1.0.0"]);
    let pkg = cache
        .load_fs_pkg("github.com/org/repo/infra/proxy", "v1.0.0")
        .unwrap();
    assert_eq!(pkg.pallet_subdir, "infra/proxy");
}

#[test]
fn test_physical_cache_resolves_packages() {
    let fixture = CacheFixture::new()
        .with_pallet("github.com/org/repo", "v1.0.0", "")
        .with_pkg("github.com/org/repo@v1.0.0", "infra/proxy", "Reverse proxy")
        .with_pkg("github.com/org/repo@v1.0.0", "apps/web", "Web frontend");
    let cache = FsPalletCache::from_dir(fixture.cache_root());

    let pkg = cache
        .load_fs_pkg("github.com/org/repo/infra/proxy", "v1.0.0")
        .unwrap();
    assert_eq!(pkg.path, "github.com/org/repo/infra/proxy");
    assert_eq!(pkg.pallet_subdir, "infra/proxy");
    assert_eq!(pkg.version(), "v1.0.0");
    assert_eq!(pkg.decl.package.description, "Reverse proxy");

    let pkgs = cache.load_fs_pkgs("github.com/org/repo/**").unwrap();
    let paths: Vec<&str> = pkgs.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["github.com/org/repo/apps/web", "github.com/org/repo/infra/proxy"]
    );

    let err = cache
        .load_fs_pkg("github.com/org/repo/infra/missing", "v1.0.0")
        .unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);
}

#[test]
fn test_override_shadows_cached_versions() {
    let fixture = CacheFixture::new()
        .with_pallet("github.com/org/repo", "v1.0.0", "")
        .with_file("github.com/org/repo@v1.0.0", "README.md", "cached")
        .with_pallet("github.com/org/repo", "v2.0.0", "")
        .with_file("github.com/org/repo@v2.0.0", "README.md", "cached");
    let checkout = fixture.checkout("repo", "github.com/org/repo", &[("README.md", "local")]);

    let local = FsPallet::from_fs(Arc::new(DirFs::new(&checkout)))
        .unwrap()
        .with_version("v2.0.0");
    let overrides = PalletOverrideCache::from_pallets([(Arc::new(local), vec!["v2.0.0".to_string()])]);
    let cache = LayeredPalletCache::new(
        Arc::new(FsPalletCache::from_dir(fixture.cache_root())),
        Arc::new(overrides),
    );

    let v2 = cache.load_fs_pallet("github.com/org/repo", "v2.0.0").unwrap();
    assert_eq!(v2.fs.read_file("README.md").unwrap(), b"local");

    let v1 = cache.load_fs_pallet("github.com/org/repo", "v1.0.0").unwrap();
    assert_eq!(v1.fs.read_file("README.md").unwrap(), b"cached");

    let all = cache.load_fs_pallets("github.com/org/repo").unwrap();
    assert_eq!(
        labels(&all),
        vec!["github.com/org/repo@v1.0.0", "github.com/org/repo@v2.0.0"]
    );
    assert_eq!(all[1].fs.path(), v2.fs.path());
}

#[test]
fn test_merged_pallet_exports_imported_files() {
    let fixture = CacheFixture::new()
        .with_pallet("github.com/org/base", "v1.0.0", "")
        .with_file("github.com/org/base@v1.0.0", "deploy/web.yml", "image: web")
        .with_file("github.com/org/base@v1.0.0", "README.md", "base readme")
        .with_pallet(
            "github.com/org/app",
            "v1.0.0",
            &decls::import_all("github.com/org/base", "v1.0.0"),
        )
        .with_file("github.com/org/app@v1.0.0", "README.md", "app readme");
    let cache = FsPalletCache::from_dir(fixture.cache_root());

    let app = cache.load_fs_pallet("github.com/org/app", "v1.0.0").unwrap();
    let (merged, imports) = merge_fs_pallet_imports(&app, &cache).unwrap();
    assert!(imports.contains_key("deploy/web.yml"));
    assert!(!imports.contains_key("README.md"));
    assert_eq!(imports["deploy/web.yml"].sources, vec!["github.com/org/base@v1.0.0"]);

    let dest = TempDir::new().unwrap();
    let out = dest.path().join("out");
    export_fs(merged.fs.as_ref(), &out, None).unwrap();

    assert_eq!(fs::read_to_string(out.join("deploy/web.yml")).unwrap(), "image: web");
    assert_eq!(fs::read_to_string(out.join("README.md")).unwrap(), "app readme");
    let decl = fs::read_to_string(out.join("pallet.yml")).unwrap();
    assert!(decl.contains("github.com/org/app"));
}

#[test]
fn test_merge_fails_on_missing_import() {
    let fixture = CacheFixture::new().with_pallet(
        "github.com/org/app",
        "v1.0.0",
        &decls::import_all("github.com/org/base", "v3.0.0"),
    );
    let cache = FsPalletCache::from_dir(fixture.cache_root());

    let app = cache.load_fs_pallet("github.com/org/app", "v1.0.0").unwrap();
    let err = merge_fs_pallet(&app, &cache).unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);
    assert!(err.to_string().contains("github.com/org/base@v3.0.0"));
}
