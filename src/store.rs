// SPDX-License-Identifier: AGPL-3.0-or-later

//! SQLite-backed index store.
//!
//! Transactional persistence over SQLite: file records, symbols, imports,
//! exports, and a scalar metadata map. Single-writer/multi-reader: the
//! index manager holds the writer, the query surface reads the same
//! handle.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::extractor::SymbolKind;
use crate::types::{FileRecord, IndexStats};

/// One row of the "previously indexed" set returned by [`Store::get_all_files`],
/// the input to the incremental-update diff in `manager`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousFile {
    pub path: String,
    pub absolute_path: String,
    pub mtime_ms: f64,
    pub content_hash: String,
}

/// One stored symbol, as returned by [`Store::get_file_symbols`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: u32,
    pub end_line: Option<u32>,
    pub signature: Option<String>,
    pub exported: bool,
}

/// One scored match from [`Store::search_symbols`]. Carries the
/// base score and the `exported` flag separately so callers may apply their
/// own presentation-layer boost rather than the store guessing one.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSearchResult {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: Option<u32>,
    pub signature: Option<String>,
    pub exported: bool,
    pub score: i32,
}

/// The persisted index for one project. Wraps a single SQLite connection;
/// callers needing concurrent read/write access share this behind a
/// `tokio::sync::Mutex` (see [`crate::manager`]).
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if absent) the store at `db_path`, running schema
    /// creation idempotently.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open(e.to_string()))?;
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    /// Opens an in-memory store, used by tests that don't need durability.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT UNIQUE NOT NULL,
                absolute_path TEXT NOT NULL,
                size INTEGER NOT NULL,
                mtime_real REAL NOT NULL,
                hash TEXT NOT NULL,
                language TEXT,
                lines INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS symbols (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                line INTEGER NOT NULL,
                end_line INTEGER,
                signature TEXT,
                exported INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS imports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                module TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS exports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
            CREATE INDEX IF NOT EXISTS idx_symbols_file_id ON symbols(file_id);
            CREATE INDEX IF NOT EXISTS idx_symbols_type ON symbols(type);
            CREATE INDEX IF NOT EXISTS idx_symbols_exported ON symbols(exported);
            CREATE INDEX IF NOT EXISTS idx_imports_module ON imports(module);
            CREATE INDEX IF NOT EXISTS idx_files_path ON files(path);
            CREATE INDEX IF NOT EXISTS idx_files_language ON files(language);
            "#,
            )
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Atomically replaces the rows for every `(path, record)` pair: deletes
    /// any prior row for `path` (cascading to its symbols/imports/exports),
    /// then inserts the new record and its children. All pairs share one
    /// transaction; any failure rolls back the whole batch.
    pub fn insert_batch(&mut self, records: &HashMap<String, FileRecord>) -> Result<(), StoreError> {
        let tx = self.conn.transaction().map_err(|e| StoreError::Transaction(e.to_string()))?;

        for (path, record) in records {
            tx.execute("DELETE FROM files WHERE path = ?1", params![path])
                .map_err(|e| StoreError::Transaction(e.to_string()))?;

            tx.execute(
                "INSERT INTO files (path, absolute_path, size, mtime_real, hash, language, lines)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.path,
                    record.absolute_path,
                    record.size_bytes as i64,
                    record.mtime_ms,
                    record.content_hash,
                    record.language,
                    record.line_count as i64,
                ],
            )
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

            let file_id = tx.last_insert_rowid();

            {
                let mut stmt = tx
                    .prepare_cached(
                        "INSERT INTO symbols (file_id, name, type, line, end_line, signature, exported)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    )
                    .map_err(|e| StoreError::Transaction(e.to_string()))?;
                for sym in &record.symbols {
                    stmt.execute(params![
                        file_id,
                        sym.name,
                        sym.kind.as_str(),
                        sym.start_line,
                        sym.end_line,
                        sym.signature,
                        sym.exported as i32,
                    ])
                    .map_err(|e| StoreError::Transaction(e.to_string()))?;
                }
            }

            {
                let mut stmt = tx
                    .prepare_cached("INSERT INTO imports (file_id, module) VALUES (?1, ?2)")
                    .map_err(|e| StoreError::Transaction(e.to_string()))?;
                for module in &record.imports {
                    stmt.execute(params![file_id, module]).map_err(|e| StoreError::Transaction(e.to_string()))?;
                }
            }

            {
                let mut stmt = tx
                    .prepare_cached("INSERT INTO exports (file_id, name) VALUES (?1, ?2)")
                    .map_err(|e| StoreError::Transaction(e.to_string()))?;
                for name in &record.exports {
                    stmt.execute(params![file_id, name]).map_err(|e| StoreError::Transaction(e.to_string()))?;
                }
            }
        }

        tx.commit().map_err(|e| StoreError::Transaction(e.to_string()))?;
        Ok(())
    }

    /// Deletes the row for `path` and cascades to its dependents.
    pub fn delete_file(&self, path: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(())
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// The authoritative "previously indexed" set consumed by `update_index`'s diff.
    pub fn get_all_files(&self) -> Result<Vec<PreviousFile>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT path, absolute_path, mtime_real, hash FROM files")?;
        let rows = stmt.query_map([], |row| {
            Ok(PreviousFile {
                path: row.get(0)?,
                absolute_path: row.get(1)?,
                mtime_ms: row.get(2)?,
                content_hash: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_all_paths(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT path FROM files ORDER BY path ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn has_data(&self) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Symbol search scoring: exact case-sensitive match scores
    /// 100, case-insensitive exact 90, case-insensitive prefix 70, plain
    /// case-insensitive substring 50. Results are filtered to names
    /// containing `query` case-insensitively and ordered by
    /// `(score DESC, exported DESC, name ASC)`.
    pub fn search_symbols(&self, query: &str, limit: usize) -> Result<Vec<SymbolSearchResult>, StoreError> {
        let like_pattern = format!("%{}%", escape_like(query));
        let mut stmt = self.conn.prepare(
            "SELECT s.name, s.type, f.path, s.line, s.end_line, s.signature, s.exported
             FROM symbols s JOIN files f ON s.file_id = f.id
             WHERE LOWER(s.name) LIKE LOWER(?1) ESCAPE '\\'",
        )?;
        let query_lower = query.to_lowercase();
        let rows = stmt.query_map(params![like_pattern], |row| {
            let name: String = row.get(0)?;
            let kind_str: String = row.get(1)?;
            let file_path: String = row.get(2)?;
            let start_line: u32 = row.get(3)?;
            let end_line: Option<u32> = row.get(4)?;
            let signature: Option<String> = row.get(5)?;
            let exported: bool = row.get::<_, i64>(6)? != 0;
            Ok((name, kind_str, file_path, start_line, end_line, signature, exported))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (name, kind_str, file_path, start_line, end_line, signature, exported) = row?;
            let name_lower = name.to_lowercase();
            let score = if name == query {
                100
            } else if name_lower == query_lower {
                90
            } else if name_lower.starts_with(&query_lower) {
                70
            } else if name_lower.contains(&query_lower) {
                50
            } else {
                continue;
            };
            let kind = SymbolKind::from_str(&kind_str).unwrap_or(SymbolKind::Variable);
            results.push(SymbolSearchResult { name, kind, file_path, start_line, end_line, signature, exported, score });
        }

        results.sort_by(|a, b| {
            b.score.cmp(&a.score).then(b.exported.cmp(&a.exported)).then(a.name.cmp(&b.name))
        });
        results.truncate(limit);
        Ok(results)
    }

    /// Case-insensitive substring match on `path`, ordered ascending.
    pub fn find_files(&self, substr: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let pattern = format!("%{}%", escape_like(substr));
        let mut stmt = self.conn.prepare(
            "SELECT path FROM files WHERE LOWER(path) LIKE LOWER(?1) ESCAPE '\\' ORDER BY path ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![pattern, limit as i64], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// UNIX shell-glob match on `path`, delegated to SQLite's native `GLOB`
    /// operator (`*`, `?`, `[...]`, case-sensitive).
    pub fn glob_files(&self, pattern: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT path FROM files WHERE path GLOB ?1 ORDER BY path ASC LIMIT ?2")?;
        let rows = stmt.query_map(params![pattern, limit as i64], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Exact `path == name` or `path` ending with `/name`.
    pub fn find_files_by_name(&self, name: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let suffix_pattern = format!("%/{}", escape_like(name));
        let mut stmt = self.conn.prepare(
            "SELECT path FROM files WHERE path = ?1 OR path LIKE ?2 ESCAPE '\\' ORDER BY path ASC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![name, suffix_pattern, limit as i64], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Symbols of a single file, in declaration (`start_line`) order.
    pub fn get_file_symbols(&self, path: &str) -> Result<Vec<StoredSymbol>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.name, s.type, s.line, s.end_line, s.signature, s.exported
             FROM symbols s JOIN files f ON s.file_id = f.id
             WHERE f.path = ?1
             ORDER BY s.line ASC",
        )?;
        let rows = stmt.query_map(params![path], |row| {
            let kind_str: String = row.get(1)?;
            Ok(StoredSymbol {
                name: row.get(0)?,
                kind: SymbolKind::from_str(&kind_str).unwrap_or(SymbolKind::Variable),
                start_line: row.get(2)?,
                end_line: row.get(3)?,
                signature: row.get(4)?,
                exported: row.get::<_, i64>(5)? != 0,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Distinct paths of files whose any import contains `module_substr`.
    pub fn find_importers(&self, module_substr: &str) -> Result<Vec<String>, StoreError> {
        let pattern = format!("%{}%", escape_like(module_substr));
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT f.path FROM imports i JOIN files f ON i.file_id = f.id
             WHERE LOWER(i.module) LIKE LOWER(?1) ESCAPE '\\' ORDER BY f.path ASC",
        )?;
        let rows = stmt.query_map(params![pattern], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// `total_files`/`total_symbols`/`indexed_at` come from the metadata map;
    /// `total_size`/`languages` are computed live over the current rows.
    pub fn get_stats(&self) -> Result<IndexStats, StoreError> {
        let total_files: u64 = self
            .get_metadata("total_files")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let total_symbols: u64 = self
            .get_metadata("total_symbols")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let indexed_at: i64 = self.get_metadata("indexed_at")?.and_then(|v| v.parse().ok()).unwrap_or(0);

        let total_size: i64 = self.conn.query_row("SELECT COALESCE(SUM(size), 0) FROM files", [], |row| row.get(0))?;

        let mut stmt = self
            .conn
            .prepare("SELECT language, COUNT(*) FROM files WHERE language IS NOT NULL GROUP BY language")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?;
        let mut languages = HashMap::new();
        for row in rows {
            let (lang, count) = row?;
            languages.insert(lang, count);
        }

        Ok(IndexStats { total_files, total_symbols, total_size: total_size as u64, languages, indexed_at })
    }
}

/// Escapes `%`, `_`, and the escape character itself for a SQLite `LIKE ...
/// ESCAPE '\'` clause, so substring queries containing those characters are
/// matched literally rather than as wildcards.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '%' || c == '_' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
