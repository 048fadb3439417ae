// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared data-model types threaded between the file indexer, scheduler,
//! store, and index manager.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::extractor::SymbolKind;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Falls back to 0 on a clock set before 1970, which never happens in
/// practice but keeps this infallible for callers.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A fully-indexed file, ready to be persisted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub absolute_path: String,
    pub size_bytes: u64,
    pub mtime_ms: f64,
    pub content_hash: String,
    pub language: Option<String>,
    pub line_count: u32,
    pub symbols: Vec<PersistedSymbol>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
}

/// A symbol as attached to a [`FileRecord`], prior to row insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: u32,
    pub end_line: Option<u32>,
    pub signature: Option<String>,
    pub exported: bool,
}

/// Why a file was skipped or only partially indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningReason {
    Size,
    Lines,
    LineLength,
    Timeout,
    RegexTimeout,
    Error,
}

impl WarningReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningReason::Size => "size",
            WarningReason::Lines => "lines",
            WarningReason::LineLength => "line-length",
            WarningReason::Timeout => "timeout",
            WarningReason::RegexTimeout => "regex-timeout",
            WarningReason::Error => "error",
        }
    }
}

/// One skipped-or-degraded file, surfaced to the caller at the end of a session.
#[derive(Debug, Clone)]
pub struct IndexWarning {
    pub relative_path: String,
    pub reason: WarningReason,
    pub details: String,
    pub timestamp_ms: i64,
}

/// Per-file gates applied before a file is read and extracted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexingLimits {
    pub max_bytes: u64,
    pub max_lines: u32,
    pub max_line_chars: u32,
    pub file_deadline_ms: u64,
    pub skip_on_error: bool,
}

impl Default for IndexingLimits {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            max_lines: 10_000,
            max_line_chars: 10_000,
            file_deadline_ms: 5_000,
            skip_on_error: true,
        }
    }
}

/// Coarse phase reported through [`ProgressCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Scanning,
    Indexing,
    Calculating,
    Saving,
}

impl ProgressPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressPhase::Scanning => "scanning",
            ProgressPhase::Indexing => "indexing",
            ProgressPhase::Calculating => "calculating",
            ProgressPhase::Saving => "saving",
        }
    }
}

/// A single progress tick, delivered to the caller-supplied callback.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub current: usize,
    pub total: usize,
    pub current_file: Option<String>,
    pub message: Option<String>,
}

/// Caller-supplied progress observer. Invoked synchronously; a panicking
/// callback must never abort an indexing session (see [`crate::manager`]).
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Snapshot of the whole store's contents, as returned by `store::get_stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_files: u64,
    pub total_symbols: u64,
    pub total_size: u64,
    pub languages: HashMap<String, u64>,
    pub indexed_at: i64,
}

/// Outcome of one `build_index` or `update_index` call.
#[derive(Debug, Clone, Default)]
pub struct SessionResult {
    pub total_files: u64,
    pub total_symbols: u64,
    pub total_size: u64,
    pub languages: HashMap<String, u64>,
    pub duration_ms: u64,
    pub warnings: Vec<IndexWarning>,
    pub files_deleted: u64,
}
