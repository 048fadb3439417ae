//! End-to-end coverage of build/update/query over a synthetic project tree.

use std::fs;

use tempfile::TempDir;

use symdex::manager::IndexManager;
use symdex::types::IndexingLimits;

fn write(dir: &TempDir, rel: &str, content: &str) {
    let path = dir.path().join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_s1_typescript_exported_function() {
    let dir = TempDir::new().unwrap();
    write(&dir, "src/a.ts", "export function greet(name: string): string { return name; }\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();

    let symbols = manager.query().get_file_symbols("src/a.ts").await.unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "greet");
    assert!(symbols[0].exported);

    let results = manager.query().search_symbols("greet", 10).await.unwrap();
    assert_eq!(results[0].score, 100);
}

#[tokio::test]
async fn test_s2_python_class_and_constant() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.py", "class User:\n  pass\n\nMAX_SIZE = 1000\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();

    let symbols = manager.query().get_file_symbols("app.py").await.unwrap();
    let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"User"));
    assert!(names.contains(&"MAX_SIZE"));
}

#[tokio::test]
async fn test_s3_go_struct_and_interface() {
    let dir = TempDir::new().unwrap();
    write(&dir, "m.go", "type User struct {\n  Name string\n}\ntype Reader interface {\n  Read() error\n}\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();

    let symbols = manager.query().get_file_symbols("m.go").await.unwrap();
    assert_eq!(symbols.len(), 2);
    assert!(symbols.iter().any(|s| s.name == "User"));
    assert!(symbols.iter().any(|s| s.name == "Reader"));
}

#[tokio::test]
async fn test_s4_case_insensitive_substring_search() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.ts", "export function greet() {}\nexport class Greeter {}\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();

    let results = manager.query().search_symbols("gre", 10).await.unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert!(names.contains(&"greet"));
    assert!(names.contains(&"Greeter"));
    assert!(results.iter().all(|r| r.score == 70));
}

#[tokio::test]
async fn test_s5_incremental_update() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.ts", "export function a() {}\n");
    write(&dir, "b.ts", "export function b() {}\n");
    write(&dir, "c.ts", "export function c() {}\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();

    std::thread::sleep(std::time::Duration::from_millis(10));
    write(&dir, "b.ts", "export function b2() {}\n");
    fs::remove_file(dir.path().join("c.ts")).unwrap();
    write(&dir, "d.ts", "export function d() {}\n");

    let delta = manager.update_index(None, IndexingLimits::default(), &[], 2).await.unwrap();
    assert_eq!(delta.total_files, 2);
    assert_eq!(delta.files_deleted, 1);

    let mut files = manager.query().find_files("", 100).await.unwrap();
    files.sort();
    assert_eq!(files, vec!["a.ts".to_string(), "b.ts".to_string(), "d.ts".to_string()]);

    let b_symbols = manager.query().get_file_symbols("b.ts").await.unwrap();
    assert_eq!(b_symbols[0].name, "b2");
}

#[tokio::test]
async fn test_s6_size_boundary() {
    let dir = TempDir::new().unwrap();
    let mut limits = IndexingLimits::default();
    limits.max_bytes = 100;

    write(&dir, "ok.rs", &"x".repeat(90));
    write(&dir, "toobig.rs", &"x".repeat(200));

    let manager = IndexManager::open(dir.path()).unwrap();
    let result = manager.build_index(None, limits, &[], 2).await.unwrap();

    assert_eq!(result.total_files, 1);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].reason.as_str(), "size");
}

#[tokio::test]
async fn test_find_files_by_name_exact_or_suffix() {
    let dir = TempDir::new().unwrap();
    write(&dir, "src/util.ts", "export const util = 1;\n");
    write(&dir, "util.ts", "export const util = 1;\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();

    let mut results = manager.query().find_files_by_name("util.ts", 10).await.unwrap();
    results.sort();
    assert_eq!(results, vec!["src/util.ts".to_string(), "util.ts".to_string()]);
}

#[tokio::test]
async fn test_find_importers_reverse_lookup() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.ts", "import { Config } from './config';\nexport function a() {}\n");
    write(&dir, "config.ts", "export class Config {}\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();

    let importers = manager.query().find_importers("config").await.unwrap();
    assert_eq!(importers, vec!["a.ts".to_string()]);
}

#[tokio::test]
async fn test_stats_reflects_build() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.ts", "export function a() {}\n");
    write(&dir, "b.py", "def b():\n  pass\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();

    let stats = manager.query().get_stats().await.unwrap();
    assert_eq!(stats.total_files, 2);
    assert!(stats.languages.contains_key("TypeScript"));
    assert!(stats.languages.contains_key("Python"));
}

#[tokio::test]
async fn test_rebuild_on_unchanged_tree_yields_same_row_count() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.ts", "export function a() {}\n");
    write(&dir, "b.ts", "export function b() {}\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    let first = manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();
    let second = manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();

    assert_eq!(first.total_files, second.total_files);
    assert_eq!(manager.query().find_files("", 100).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_load_reports_has_data() {
    let dir = TempDir::new().unwrap();
    let manager = IndexManager::open(dir.path()).unwrap();
    assert!(!manager.load().await.unwrap());

    write(&dir, "a.rs", "pub fn a() {}\n");
    manager.build_index(None, IndexingLimits::default(), &[], 2).await.unwrap();
    assert!(manager.load().await.unwrap());
}

#[tokio::test]
async fn test_build_index_excludes_files_matched_only_by_extra_glob() {
    let dir = TempDir::new().unwrap();
    write(&dir, "src/a.ts", "export function a() {}\n");
    write(&dir, "src/a.snap.ts", "export function snapA() {}\n");

    let manager = IndexManager::open(dir.path()).unwrap();
    let extra_globs = vec!["*.snap.ts".to_string()];
    manager.build_index(None, IndexingLimits::default(), &extra_globs, 2).await.unwrap();

    let files = manager.query().find_files("", 100).await.unwrap();
    assert_eq!(files, vec!["src/a.ts".to_string()]);

    let symbols = manager.query().search_symbols("snapA", 10).await.unwrap();
    assert!(symbols.is_empty());
}
