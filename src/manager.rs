// SPDX-License-Identifier: AGPL-3.0-or-later

//! Index build/update orchestration.
//!
//! Orchestrates the full build, incremental update, and single-file refresh
//! sessions: directory discovery feeds the concurrency scheduler, which runs
//! the per-file indexing pipeline and hands completed records to the store
//! in batches.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::file_indexer;
use crate::locator;
use crate::scheduler;
use crate::store::Store;
use crate::types::{
    now_ms, FileRecord, IndexWarning, IndexingLimits, ProgressCallback, ProgressEvent, ProgressPhase,
    SessionResult,
};
use crate::walker;

/// Records are flushed to the store every 50 completed files.
const BATCH_SIZE: usize = 50;

/// Owns the store handle for one project and exposes the build/update/refresh
/// operations. The store is the only shared mutable resource; all writes
/// serialize through its mutex.
pub struct IndexManager {
    project_root: PathBuf,
    store: Mutex<Store>,
}

fn emit(cb: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = cb {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(event)));
    }
}

/// Running totals for a build/update session, updated as each file completes
/// so the full record set never needs to stay resident in memory.
#[derive(Default)]
struct Tally {
    total_files: u64,
    total_symbols: u64,
    total_size: u64,
    languages: HashMap<String, u64>,
}

impl Tally {
    fn record(&mut self, record: &FileRecord) {
        self.total_files += 1;
        self.total_symbols += record.symbols.len() as u64;
        self.total_size += record.size_bytes;
        if let Some(lang) = &record.language {
            *self.languages.entry(lang.clone()).or_insert(0) += 1;
        }
    }
}

impl IndexManager {
    /// Opens (creating if absent) the on-disk store for `project_root`.
    pub fn open(project_root: &Path) -> Result<Self, StoreError> {
        let db_path = locator::file_for(project_root)?;
        let store = Store::open(&db_path)?;
        Ok(Self { project_root: project_root.to_path_buf(), store: Mutex::new(store) })
    }

    /// Opens the store and reports whether it already has data.
    pub async fn load(&self) -> Result<bool, StoreError> {
        let store = self.store.lock().await;
        store.has_data()
    }

    /// A read-only query surface over this manager's store.
    pub fn query(&self) -> crate::query::QuerySurface<'_> {
        crate::query::QuerySurface::new(&self.store)
    }

    /// Full rebuild: scans the whole tree and (re)indexes every file,
    /// replacing the entire metadata summary.
    pub async fn build_index(
        &self,
        progress: Option<ProgressCallback>,
        limits: IndexingLimits,
        extra_ignore_globs: &[String],
        workers: usize,
    ) -> Result<SessionResult, StoreError> {
        let started = now_ms();
        emit(&progress, ProgressEvent { phase: ProgressPhase::Scanning, current: 0, total: 0, current_file: None, message: None });

        let files = walker::scan(&self.project_root, walker::DEFAULT_MAX_DEPTH, extra_ignore_globs);
        let total = files.len();
        emit(&progress, ProgressEvent { phase: ProgressPhase::Indexing, current: 0, total, current_file: None, message: None });

        let (tally, warnings) = self.index_paths(files, limits, workers, &progress, total).await;

        emit(&progress, ProgressEvent { phase: ProgressPhase::Saving, current: total, total, current_file: None, message: None });
        self.finalize_summary(started, tally, warnings, 0).await
    }

    /// Incremental update: diffs the current tree against the previously
    /// recorded file set, deletes vanished files, and re-indexes only the
    /// added/modified ones.
    pub async fn update_index(
        &self,
        progress: Option<ProgressCallback>,
        limits: IndexingLimits,
        extra_ignore_globs: &[String],
        workers: usize,
    ) -> Result<SessionResult, StoreError> {
        let started = now_ms();
        emit(&progress, ProgressEvent { phase: ProgressPhase::Scanning, current: 0, total: 0, current_file: None, message: None });

        let previous = {
            let store = self.store.lock().await;
            store.get_all_files()?
        };
        let previous_by_path: HashMap<String, (f64, String)> =
            previous.into_iter().map(|f| (f.path, (f.mtime_ms, f.content_hash))).collect();

        let current_abs = walker::scan(&self.project_root, walker::DEFAULT_MAX_DEPTH, extra_ignore_globs);
        let mut current_by_path: HashMap<String, PathBuf> = HashMap::new();
        for abs in &current_abs {
            let rel = abs.strip_prefix(&self.project_root).unwrap_or(abs).to_string_lossy().replace('\\', "/");
            current_by_path.insert(rel, abs.clone());
        }

        let previous_paths: HashSet<&String> = previous_by_path.keys().collect();
        let current_paths: HashSet<&String> = current_by_path.keys().collect();

        let deleted: Vec<String> = previous_paths.difference(&current_paths).map(|s| s.to_string()).collect();
        let added: Vec<String> = current_paths.difference(&previous_paths).map(|s| s.to_string()).collect();

        let mut modified = Vec::new();
        for path in previous_paths.intersection(&current_paths) {
            let (prev_mtime, prev_hash) = &previous_by_path[*path];
            let abs = &current_by_path[*path];
            if file_indexer::has_changed(abs, *prev_mtime, prev_hash).await {
                modified.push((*path).to_string());
            }
        }

        {
            let store = self.store.lock().await;
            for path in &deleted {
                store.delete_file(path)?;
            }
        }

        let to_index: Vec<PathBuf> = added.iter().chain(modified.iter()).map(|p| current_by_path[p].clone()).collect();
        let total = to_index.len();
        emit(&progress, ProgressEvent { phase: ProgressPhase::Indexing, current: 0, total, current_file: None, message: None });

        let (tally, warnings) = self.index_paths(to_index, limits, workers, &progress, total).await;

        emit(&progress, ProgressEvent { phase: ProgressPhase::Saving, current: total, total, current_file: None, message: None });

        {
            let store = self.store.lock().await;
            store.set_metadata("project_root", &self.project_root.to_string_lossy())?;
            store.set_metadata("indexed_at", &now_ms().to_string())?;
        }

        self.finalize_summary(started, tally, warnings, deleted.len() as u64).await
    }

    /// Single-file refresh: re-runs the per-file indexing pipeline on `abs_path` and inserts the result
    /// as a one-entry batch. Failures are logged, never propagated.
    pub async fn index_file(&self, abs_path: &Path, limits: IndexingLimits) {
        let outcome = file_indexer::index_file(abs_path, &self.project_root, limits).await;
        for warning in &outcome.warnings {
            tracing::warn!(file = %warning.relative_path, reason = warning.reason.as_str(), "{}", warning.details);
        }
        if let Some(record) = outcome.record {
            let mut batch = HashMap::new();
            batch.insert(record.path.clone(), record);
            let mut store = self.store.lock().await;
            if let Err(e) = store.insert_batch(&batch) {
                tracing::warn!(error = %e, "failed to persist single-file refresh");
            }
        }
    }

    /// Runs the scheduler over `files`, flushing completed records to the
    /// store every [`BATCH_SIZE`] (plus a residual flush once the scheduler
    /// drains), and emitting a progress tick per completion. Returns running
    /// totals rather than the records themselves, so the whole file tree is
    /// never held in memory at once.
    async fn index_paths(
        &self,
        files: Vec<PathBuf>,
        limits: IndexingLimits,
        workers: usize,
        progress: &Option<ProgressCallback>,
        total: usize,
    ) -> (Tally, Vec<IndexWarning>) {
        let mut warnings = Vec::<IndexWarning>::new();
        let mut tally = Tally::default();
        let mut pending: HashMap<String, FileRecord> = HashMap::new();
        let mut indexed = 0usize;

        scheduler::run(files, &self.project_root, limits, workers, |path, outcome| {
            for warning in &outcome.warnings {
                tracing::warn!(file = %warning.relative_path, reason = warning.reason.as_str(), "{}", warning.details);
            }
            warnings.extend(outcome.warnings);
            if let Some(record) = outcome.record {
                tally.record(&record);
                pending.insert(record.path.clone(), record);
            }
            indexed += 1;
            emit(progress, ProgressEvent {
                phase: ProgressPhase::Indexing,
                current: indexed,
                total,
                current_file: Some(path.to_string_lossy().to_string()),
                message: None,
            });

            async {
                if pending.len() >= BATCH_SIZE {
                    self.flush_batch(&mut pending).await;
                }
            }
        })
        .await;

        self.flush_batch(&mut pending).await;
        (tally, warnings)
    }

    /// Inserts and clears `pending` if non-empty, as its own transaction, so
    /// a failure partway through a build leaves earlier batches durably
    /// committed.
    async fn flush_batch(&self, pending: &mut HashMap<String, FileRecord>) {
        if pending.is_empty() {
            return;
        }
        let mut store = self.store.lock().await;
        if let Err(e) = store.insert_batch(pending) {
            tracing::warn!(error = %e, "batch insert failed; already-committed batches remain");
        }
        pending.clear();
    }

    async fn finalize_summary(
        &self,
        started: i64,
        tally: Tally,
        warnings: Vec<IndexWarning>,
        files_deleted: u64,
    ) -> Result<SessionResult, StoreError> {
        let store = self.store.lock().await;
        store.set_metadata("project_root", &self.project_root.to_string_lossy())?;
        store.set_metadata("indexed_at", &now_ms().to_string())?;
        store.set_metadata("total_files", &tally.total_files.to_string())?;
        store.set_metadata("total_symbols", &tally.total_symbols.to_string())?;
        store.set_metadata("schema_version", "1")?;

        let duration_ms = (now_ms() - started).max(0) as u64;
        Ok(SessionResult {
            total_files: tally.total_files,
            total_symbols: tally.total_symbols,
            total_size: tally.total_size,
            languages: tally.languages,
            duration_ms,
            warnings,
            files_deleted,
        })
    }
}
