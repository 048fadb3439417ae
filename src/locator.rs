// SPDX-License-Identifier: AGPL-3.0-or-later

//! Project-to-index-directory mapping.
//!
//! Maps a project root path to a stable on-disk index directory under the
//! user's home directory, keyed by a hash of the canonicalized root so
//! concurrent projects never collide.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::StoreError;

/// Fixed hidden directory name under the user's home directory.
pub const VENDOR_DIR: &str = ".symdex";

const INDEXES_DIR: &str = "indexes";
const STORE_FILE: &str = "index.db";

/// A project previously indexed under the indexes root, as reported by [`list_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectEntry {
    pub root: String,
    pub id: String,
    pub indexed_at_ms: i64,
}

/// First 16 hex chars of SHA-256(absolute root path), used as the project id.
pub fn project_id(root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(root.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// Root under which all project index directories live: `<home>/<vendor-dir>/indexes/`.
pub fn indexes_root() -> Result<PathBuf, StoreError> {
    let home = dirs::home_dir()
        .ok_or_else(|| StoreError::Open("could not resolve home directory".to_string()))?;
    Ok(home.join(VENDOR_DIR).join(INDEXES_DIR))
}

/// The on-disk index directory for a project root: `<indexes-root>/<project-id>/`.
///
/// Does not create the directory; `Store::open` creates the parent lazily on first write.
pub fn dir_for(root: &Path) -> Result<PathBuf, StoreError> {
    Ok(indexes_root()?.join(project_id(root)))
}

/// The store file path for a project root: `<index-dir>/index.db`.
pub fn file_for(root: &Path) -> Result<PathBuf, StoreError> {
    Ok(dir_for(root)?.join(STORE_FILE))
}

/// Removes the entire index directory for a project root, if it exists.
pub fn delete(root: &Path) -> Result<(), StoreError> {
    let dir = dir_for(root)?;
    if dir.exists() {
        fs::remove_dir_all(&dir).map_err(|e| StoreError::Open(e.to_string()))?;
    }
    Ok(())
}

/// Lists every project previously indexed under the indexes root.
///
/// Reads the `project_root` and `indexed_at` metadata rows from every store
/// found; unreadable or schema-invalid stores are silently skipped.
pub fn list_all() -> Result<Vec<ProjectEntry>, StoreError> {
    let root = indexes_root()?;
    let mut out = Vec::new();
    let entries = match fs::read_dir(&root) {
        Ok(e) => e,
        Err(_) => return Ok(out),
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let id = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        let db_path = path.join(STORE_FILE);
        if !db_path.exists() {
            continue;
        }
        if let Some((project_root, indexed_at_ms)) = read_metadata_pair(&db_path) {
            out.push(ProjectEntry { root: project_root, id, indexed_at_ms });
        }
    }
    Ok(out)
}

fn read_metadata_pair(db_path: &Path) -> Option<(String, i64)> {
    let conn = rusqlite::Connection::open(db_path).ok()?;
    let root: String = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'project_root'",
            [],
            |row| row.get(0),
        )
        .ok()?;
    let indexed_at: String = conn
        .query_row("SELECT value FROM metadata WHERE key = 'indexed_at'", [], |row| row.get(0))
        .ok()?;
    let indexed_at_ms = indexed_at.parse().ok()?;
    Some((root, indexed_at_ms))
}
