// SPDX-License-Identifier: AGPL-3.0-or-later

//! Recursive directory discovery.
//!
//! Walks a project root with an include/exclude globset (walkdir-based
//! traversal). Follows symlinks, resolving each directory to its canonical
//! path before descent and tracking already-visited canonical directories so
//! two different symlinks aliasing the same external directory only
//! contribute its files once, not twice under two different relative paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::classifier;

/// Default recursion depth cap.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Recursively enumerates every non-ignored, non-binary regular file under
/// `root`. Directories matching the classifier's ignore predicate (default
/// deny-list plus `extra_ignore_globs`) are pruned before descent; read/
/// permission errors on a directory are swallowed and the walk continues.
pub fn scan(root: &Path, max_depth: usize, extra_ignore_globs: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, max_depth, extra_ignore_globs, |path| out.push(path.to_path_buf()));
    out
}

/// Same traversal as [`scan`], but only counts matches; never reads file
/// contents.
pub fn count_files(root: &Path, max_depth: usize, extra_ignore_globs: &[String]) -> usize {
    let mut count = 0usize;
    walk(root, max_depth, extra_ignore_globs, |_| count += 1);
    count
}

fn walk(root: &Path, max_depth: usize, extra_ignore_globs: &[String], mut on_file: impl FnMut(&Path)) {
    let globset = classifier::build_ignore_globset(extra_ignore_globs).ok();
    let default_segments = classifier::default_ignore_segments();
    let mut visited_dirs: HashSet<PathBuf> = HashSet::new();

    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(true)
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if classifier::is_ignored_with(relative, &default_segments, globset.as_ref()) {
                return false;
            }
            if entry.file_type().is_dir() {
                return match std::fs::canonicalize(entry.path()) {
                    // Directory already visited under a different relative
                    // path (symlink cycle or two symlinks aliasing the same
                    // target): prune without descending a second time.
                    Ok(canonical) => visited_dirs.insert(canonical),
                    Err(_) => false,
                };
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            // Permission error, broken symlink, or a detected symlink loop:
            // skip this entry and keep walking the rest of the tree.
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if classifier::is_binary(path) {
            continue;
        }
        on_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_source_files_and_skips_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.ts"), "export const a = 1;").unwrap();
        fs::write(dir.path().join("logo.png"), "binary").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/pkg.js"), "// pkg").unwrap();

        let files = scan(dir.path(), DEFAULT_MAX_DEPTH, &[]);
        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();

        assert!(names.contains(&"a.ts".to_string()));
        assert!(!names.contains(&"logo.png".to_string()));
        assert!(!names.contains(&"pkg.js".to_string()));
    }

    #[test]
    fn test_scan_respects_extra_ignore_globs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.ts"), "export const a = 1;").unwrap();
        fs::write(dir.path().join("a.generated.ts"), "export const b = 1;").unwrap();

        let files = scan(dir.path(), DEFAULT_MAX_DEPTH, &["*.generated.ts".to_string()]);
        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();

        assert!(names.contains(&"a.ts".to_string()));
        assert!(!names.contains(&"a.generated.ts".to_string()));
    }

    #[test]
    fn test_count_files_matches_scan_len() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rs"), "pub fn a() {}").unwrap();
        fs::write(dir.path().join("b.rs"), "pub fn b() {}").unwrap();
        assert_eq!(count_files(dir.path(), DEFAULT_MAX_DEPTH, &[]), scan(dir.path(), DEFAULT_MAX_DEPTH, &[]).len());
    }

    #[test]
    fn test_respects_max_depth() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c/d/e/f/g/h/i/j/k");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("deep.rs"), "pub fn deep() {}").unwrap();

        let files = scan(dir.path(), 3, &[]);
        assert!(files.is_empty());
    }

    #[test]
    fn test_swallows_unreadable_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rs"), "pub fn a() {}").unwrap();
        // A non-existent nested root should just yield nothing, not panic.
        let files = scan(&dir.path().join("missing"), DEFAULT_MAX_DEPTH, &[]);
        assert!(files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_self_loop_visited_once() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("f.rs"), "pub fn f() {}").unwrap();
        let link = sub.join("loop");
        std::os::unix::fs::symlink(&sub, &link).unwrap();

        // Must terminate (not hang) and find f.rs exactly once despite the cycle.
        let files = scan(dir.path(), DEFAULT_MAX_DEPTH, &[]);
        let count = files
            .iter()
            .filter(|p| p.file_name().map(|n| n == "f.rs").unwrap_or(false))
            .count();
        assert_eq!(count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_two_symlinks_aliasing_same_target_visited_once() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("shared.rs"), "pub fn shared() {}").unwrap();

        let aliases = dir.path().join("aliases");
        fs::create_dir(&aliases).unwrap();
        std::os::unix::fs::symlink(&target, aliases.join("link_a")).unwrap();
        std::os::unix::fs::symlink(&target, aliases.join("link_b")).unwrap();

        let files = scan(dir.path(), DEFAULT_MAX_DEPTH, &[]);
        let count = files
            .iter()
            .filter(|p| p.file_name().map(|n| n == "shared.rs").unwrap_or(false))
            .count();
        assert_eq!(count, 1, "shared.rs should be indexed once despite two aliasing symlinks");
    }
}
