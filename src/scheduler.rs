// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bounded-parallel task scheduling.
//!
//! Launches file-indexing tasks with at most `workers` in flight at once,
//! using `tokio::task::JoinSet`: tasks are launched in list order, and
//! whenever `workers` are outstanding the scheduler waits on any one
//! in-flight task completing before launching the next. Completion order
//! across files is unspecified. After the file list is exhausted, every
//! remaining in-flight task is drained before returning.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::file_indexer::{self, FileIndexOutcome};
use crate::types::IndexingLimits;

/// Runs [`file_indexer::index_file`] over every path in `files`, at most
/// `workers` concurrently. `on_outcome` is awaited once per file, in
/// whatever order tasks actually complete (not necessarily `files` order),
/// one call at a time — it may itself drive async work (e.g. an incremental
/// store flush) between completions.
pub async fn run<F, Fut>(
    files: Vec<PathBuf>,
    project_root: &Path,
    limits: IndexingLimits,
    workers: usize,
    mut on_outcome: F,
) where
    F: FnMut(PathBuf, FileIndexOutcome) -> Fut,
    Fut: Future<Output = ()>,
{
    let workers = workers.max(1);
    let project_root: Arc<PathBuf> = Arc::new(project_root.to_path_buf());
    let mut queue = files.into_iter();
    let mut in_flight: JoinSet<(PathBuf, FileIndexOutcome)> = JoinSet::new();

    let spawn_next = |set: &mut JoinSet<(PathBuf, FileIndexOutcome)>, queue: &mut std::vec::IntoIter<PathBuf>| {
        if let Some(path) = queue.next() {
            let root = Arc::clone(&project_root);
            set.spawn(async move {
                let outcome = file_indexer::index_file(&path, &root, limits).await;
                (path, outcome)
            });
            true
        } else {
            false
        }
    };

    for _ in 0..workers {
        if !spawn_next(&mut in_flight, &mut queue) {
            break;
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        match joined {
            Ok((path, outcome)) => on_outcome(path, outcome).await,
            // A panicking task is treated as a silently-dropped file: the
            // deadline/catch_unwind machinery inside index_file already
            // converts extractor panics into warnings, so reaching this
            // arm means the task itself was aborted (e.g. runtime shutdown).
            Err(_) => {}
        }
        spawn_next(&mut in_flight, &mut queue);
    }
}
