//! End-to-end tests for the `palletfs export` command.

mod common;
use common::prelude::*;

#[test]
fn test_export_writes_merged_tree() {
    let fixture = CacheFixture::new()
        .with_pallet("github.com/org/base", "v1.0.0", "")
        .with_file("github.com/org/base@v1.0.0", "deploy/web.yml", "image: web")
        .with_pallet(
            "github.com/org/app",
            "v1.0.0",
            &decls::import_all("github.com/org/base", "v1.0.0"),
        )
        .with_file("github.com/org/app@v1.0.0", "README.md", "app");
    let dest = TempDir::new().unwrap();

    fixture
        .command()
        .arg("export")
        .arg("github.com/org/app")
        .arg("v1.0.0")
        .arg(dest.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported github.com/org/app@v1.0.0"));

    dest.child("README.md").assert("app");
    dest.child("deploy/web.yml").assert("image: web");
    dest.child("pallet.yml")
        .assert(predicate::str::contains("github.com/org/app"));
}

#[test]
fn test_export_with_override_checkout() {
    let fixture = CacheFixture::new()
        .with_pallet("github.com/org/app", "v1.0.0", "")
        .with_file("github.com/org/app@v1.0.0", "README.md", "cached");
    let checkout = fixture.checkout("app", "github.com/org/app", &[("README.md", "local")]);
    let dest = TempDir::new().unwrap();

    fixture
        .command()
        .arg("export")
        .arg("github.com/org/app")
        .arg("v1.0.0")
        .arg(dest.path())
        .arg("--override")
        .arg(format!("{}=v1.0.0", checkout.display()))
        .assert()
        .success();

    dest.child("README.md").assert("local");
}

#[cfg(unix)]
#[test]
fn test_export_mode_override() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = CacheFixture::new()
        .with_pallet("github.com/org/app", "v1.0.0", "")
        .with_file("github.com/org/app@v1.0.0", "bin/run.sh", "#!/bin/sh\n");
    let dest = TempDir::new().unwrap();

    fixture
        .command()
        .arg("export")
        .arg("github.com/org/app")
        .arg("v1.0.0")
        .arg(dest.path())
        .arg("--mode")
        .arg("755")
        .assert()
        .success();

    let mode = std::fs::metadata(dest.path().join("bin/run.sh"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[test]
fn test_export_missing_pallet() {
    let dest = TempDir::new().unwrap();

    CacheFixture::new()
        .command()
        .arg("export")
        .arg("github.com/org/missing")
        .arg("v1.0.0")
        .arg(dest.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Failed to load pallet github.com/org/missing@v1.0.0",
        ));
}

#[test]
fn test_export_rejects_bad_mode() {
    let dest = TempDir::new().unwrap();

    CacheFixture::new()
        .command()
        .arg("export")
        .arg("github.com/org/app")
        .arg("v1.0.0")
        .arg(dest.path())
        .arg("--mode")
        .arg("rwx")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not an octal permission mode"));
}
