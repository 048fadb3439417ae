// SPDX-License-Identifier: AGPL-3.0-or-later

//! Read-only query surface.
//!
//! Thin wrapper over [`crate::store::Store`]: every method here is a direct
//! pass-through to a store query, with no extra logic beyond holding the
//! read-borrow.

use std::path::Path;

use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::{Store, StoredSymbol, SymbolSearchResult};
use crate::types::IndexStats;

/// Default result cap used when a caller does not specify a `limit`.
pub const DEFAULT_LIMIT: usize = 50;

/// Read-only query surface over a project's store. Shares the same
/// `Mutex<Store>` the manager writes through, so queries never race a
/// concurrent batch commit.
pub struct QuerySurface<'a> {
    store: &'a Mutex<Store>,
}

impl<'a> QuerySurface<'a> {
    pub fn new(store: &'a Mutex<Store>) -> Self {
        Self { store }
    }

    /// Scored symbol search: base score 100/90/70/50, ordered by
    /// `(score DESC, exported DESC, name ASC)`, truncated to `limit`.
    pub async fn search_symbols(&self, query: &str, limit: usize) -> Result<Vec<SymbolSearchResult>, StoreError> {
        let store = self.store.lock().await;
        store.search_symbols(query, limit)
    }

    /// Case-insensitive substring match on file path.
    pub async fn find_files(&self, substr: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let store = self.store.lock().await;
        store.find_files(substr, limit)
    }

    /// UNIX shell-glob match on file path.
    pub async fn glob_files(&self, pattern: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let store = self.store.lock().await;
        store.glob_files(pattern, limit)
    }

    /// Exact filename match or `/name` suffix match.
    pub async fn find_files_by_name(&self, name: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let store = self.store.lock().await;
        store.find_files_by_name(name, limit)
    }

    /// Symbols of a single file, ordered by `start_line`.
    pub async fn get_file_symbols(&self, path: &str) -> Result<Vec<StoredSymbol>, StoreError> {
        let store = self.store.lock().await;
        store.get_file_symbols(path)
    }

    /// Distinct paths of files whose import list contains `module_substr`.
    pub async fn find_importers(&self, module_substr: &str) -> Result<Vec<String>, StoreError> {
        let store = self.store.lock().await;
        store.find_importers(module_substr)
    }

    /// Whole-store summary: file/symbol counts, total size, language
    /// histogram, last-indexed timestamp.
    pub async fn get_stats(&self) -> Result<IndexStats, StoreError> {
        let store = self.store.lock().await;
        store.get_stats()
    }
}

/// Opens a project's store read-only-in-practice and returns a stats
/// snapshot, or the zeroed default if the project has never been indexed.
/// Used by callers (e.g. the CLI's `stats` subcommand) that do not already
/// hold an [`crate::manager::IndexManager`].
pub async fn stats_for_project(project_root: &Path) -> Result<IndexStats, StoreError> {
    let db_path = crate::locator::file_for(project_root)?;
    if !db_path.exists() {
        return Ok(IndexStats::default());
    }
    let store = Store::open(&db_path)?;
    store.get_stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::SymbolKind;
    use crate::types::{FileRecord, PersistedSymbol};
    use std::collections::HashMap;

    fn sample_record() -> FileRecord {
        FileRecord {
            path: "a.ts".to_string(),
            absolute_path: "/proj/a.ts".to_string(),
            size_bytes: 10,
            mtime_ms: 1.0,
            content_hash: "hash".to_string(),
            language: Some("TypeScript".to_string()),
            line_count: 1,
            symbols: vec![PersistedSymbol {
                name: "greet".to_string(),
                kind: SymbolKind::Function,
                start_line: 1,
                end_line: None,
                signature: None,
                exported: true,
            }],
            imports: vec!["./config".to_string()],
            exports: vec!["greet".to_string()],
        }
    }

    #[tokio::test]
    async fn test_query_surface_delegates_to_store() {
        let mut store = Store::open_in_memory().unwrap();
        let mut batch = HashMap::new();
        batch.insert("a.ts".to_string(), sample_record());
        store.insert_batch(&batch).unwrap();
        let store = Mutex::new(store);

        let query = QuerySurface::new(&store);
        let results = query.search_symbols("greet", 10).await.unwrap();
        assert_eq!(results[0].name, "greet");

        let files = query.find_files("a.ts", 10).await.unwrap();
        assert_eq!(files, vec!["a.ts".to_string()]);

        let importers = query.find_importers("config").await.unwrap();
        assert_eq!(importers, vec!["a.ts".to_string()]);
    }

    #[tokio::test]
    async fn test_stats_for_project_returns_default_when_unindexed() {
        let dir = tempfile::TempDir::new().unwrap();
        let stats = stats_for_project(dir.path()).await.unwrap();
        assert_eq!(stats.total_files, 0);
    }
}
