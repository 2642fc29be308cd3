//! Property-based tests for path handling and merge filesystem views.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::fs::{MemoryFs, PathedFs};
    use crate::mergefs::{FileRef, MergeFs};
    use crate::path::{clean, join, split_path_version, Glob};
    use proptest::prelude::*;

    fn glob_match(pattern: &str, path: &str) -> bool {
        Glob::new(pattern).unwrap().matches(path)
    }

    fn component() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,6}"
    }

    fn rel_path() -> impl Strategy<Value = String> {
        prop::collection::vec(component(), 1..4).prop_map(|parts| parts.join("/"))
    }

    // ============================================================================
    // clean / join property tests
    // ============================================================================

    proptest! {
        /// Property: cleaning is idempotent
        #[test]
        fn clean_is_idempotent(input in "[a-z./]{0,24}") {
            if let Ok(once) = clean(&input) {
                prop_assert_eq!(clean(&once).unwrap(), once);
            }
        }

        /// Property: a cleaned path never starts with `/` nor contains `..`
        #[test]
        fn clean_output_is_relative(input in "[a-z./]{0,24}") {
            if let Ok(cleaned) = clean(&input) {
                prop_assert!(!cleaned.starts_with('/'));
                prop_assert!(!cleaned.split('/').any(|c| c == ".."));
            }
        }

        /// Property: joining a clean relative path onto the root is identity
        #[test]
        fn join_root_is_identity(path in rel_path()) {
            prop_assert_eq!(join(".", &path), path.clone());
            prop_assert_eq!(join(&path, "."), path);
        }

        /// Property: `path@version` labels split back into their parts
        #[test]
        fn path_version_round_trips(path in rel_path(), version in "v[0-9]\\.[0-9]\\.[0-9]") {
            let label = format!("{}@{}", path, version);
            prop_assert_eq!(split_path_version(&label), Some((path.as_str(), version.as_str())));
        }
    }

    // ============================================================================
    // glob dialect property tests
    // ============================================================================

    proptest! {
        /// Property: `*` matches a single component and never crosses `/`
        #[test]
        fn glob_star_stays_within_component(path in rel_path()) {
            let single = !path.contains('/');
            prop_assert_eq!(glob_match("*", &path), single);
        }

        /// Property: `**` matches every path
        #[test]
        fn glob_double_star_matches_all(path in rel_path()) {
            prop_assert!(glob_match("**", &path));
        }

        /// Property: a literal pattern matches exactly itself
        #[test]
        fn glob_exact_match_works(path in rel_path()) {
            prop_assert!(glob_match(&path, &path));
            let other = format!("{}x", path);
            prop_assert!(!glob_match(&path, &other));
        }
    }

    // ============================================================================
    // MergeFs sub-tree fidelity
    // ============================================================================

    proptest! {
        /// Property: reading through `sub(dir)` agrees with reading the full
        /// path on the merged filesystem.
        #[test]
        fn merge_sub_matches_full_paths(
            overlay_files in prop::collection::btree_set(rel_path(), 0..6),
            imported in prop::collection::btree_set(rel_path(), 1..6),
            dir in component(),
        ) {
            // A file may not also be the parent of another file.
            let all: Vec<&String> = overlay_files.iter().chain(imported.iter()).collect();
            prop_assume!(!all.iter().any(|a| all.iter().any(|b| b.starts_with(&format!("{}/", a)))));

            let mut overlay = MemoryFs::with_path("/overlay");
            for name in &overlay_files {
                overlay.add_file_string(format!("{}/{}", dir, name), "overlay").unwrap();
            }
            let mut source = MemoryFs::with_path("/source");
            for name in &imported {
                source.add_file_string(name, &format!("source:{}", name)).unwrap();
            }
            let source: Arc<dyn PathedFs> = Arc::new(source);
            let refs: BTreeMap<String, FileRef> = imported
                .iter()
                .map(|name| {
                    let file_ref = FileRef::new(vec!["p@v1".to_string()], source.clone(), name.clone());
                    (format!("{}/{}", dir, name), file_ref)
                })
                .collect();

            let merged = MergeFs::new(Arc::new(overlay), refs).unwrap();
            let sub = merged.sub(&dir).unwrap();
            for name in imported.iter().chain(overlay_files.iter()) {
                let full = merged.read_file(&format!("{}/{}", dir, name));
                let local = sub.read_file(name);
                match (full, local) {
                    (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
                    (Err(_), Err(_)) => {}
                    (a, b) => prop_assert!(false, "diverged on {}: {:?} vs {:?}", name, a.is_ok(), b.is_ok()),
                }
            }
            let full_listing: Vec<String> = merged
                .read_dir(&dir)
                .unwrap()
                .iter()
                .map(|e| e.name().to_string())
                .collect();
            let sub_listing: Vec<String> = sub
                .read_dir(".")
                .unwrap()
                .iter()
                .map(|e| e.name().to_string())
                .collect();
            prop_assert_eq!(full_listing, sub_listing);
        }
    }
}
