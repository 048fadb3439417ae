// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-file indexing pipeline.
//!
//! Applies the ordered per-file gates to a single path: ignore/binary
//! classification, size, UTF-8 decoding, line-count and line-length limits,
//! content hashing, and symbol extraction — all under a per-file deadline so
//! one pathological file cannot stall a whole session.

use std::path::Path;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::classifier;
use crate::extractor;
use crate::types::{
    now_ms, FileRecord, IndexWarning, IndexingLimits, PersistedSymbol, WarningReason,
};

/// Result of indexing a single file: at most one of a record or a set of
/// warnings explaining why it was skipped (a file can also produce warnings
/// and still yield a record, e.g. an extractor hiccup on an otherwise valid file).
#[derive(Debug, Default)]
pub struct FileIndexOutcome {
    pub record: Option<FileRecord>,
    pub warnings: Vec<IndexWarning>,
}

fn make_warning(relative_path: &str, reason: WarningReason, details: impl Into<String>) -> IndexWarning {
    IndexWarning {
        relative_path: relative_path.to_string(),
        reason,
        details: details.into(),
        timestamp_ms: now_ms(),
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

fn mtime_ms_of(metadata: &std::fs::Metadata) -> f64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or_else(|| now_ms() as f64)
}

/// Indexes one file under `limits.file_deadline_ms`. Never panics; every
/// failure path returns `record: None` plus an explanatory warning (unless
/// the file was simply ignored or binary, which is silent by design — see
/// the classifier).
pub async fn index_file(abs_path: &Path, project_root: &Path, limits: IndexingLimits) -> FileIndexOutcome {
    let relative_str = abs_path
        .strip_prefix(project_root)
        .unwrap_or(abs_path)
        .to_string_lossy()
        .replace('\\', "/");

    let deadline = Duration::from_millis(limits.file_deadline_ms);
    let work = index_file_inner(abs_path, relative_str.clone(), limits);
    tokio::pin!(work);

    // A soft warning logged at the 2s mark is purely observational; it never
    // changes the outcome, only gives an operator a hint before the hard deadline lands.
    if limits.file_deadline_ms > 2_000 {
        let soft = tokio::time::sleep(Duration::from_secs(2));
        tokio::pin!(soft);
        tokio::select! {
            outcome = &mut work => return outcome,
            _ = &mut soft => {
                tracing::warn!(file = %relative_str, "indexing still in progress after 2s");
            }
        }
    }

    let hard = tokio::time::sleep(deadline.saturating_sub(Duration::from_secs(
        if limits.file_deadline_ms > 2_000 { 2 } else { 0 },
    )));
    tokio::pin!(hard);
    tokio::select! {
        outcome = &mut work => outcome,
        _ = &mut hard => FileIndexOutcome {
            record: None,
            warnings: vec![make_warning(
                &relative_str,
                WarningReason::Timeout,
                format!("exceeded {}ms deadline", limits.file_deadline_ms),
            )],
        },
    }
}

async fn index_file_inner(abs_path: &Path, relative_str: String, limits: IndexingLimits) -> FileIndexOutcome {
    let mut warnings = Vec::new();
    let relative_path = Path::new(&relative_str);

    if classifier::is_ignored(relative_path) || classifier::is_binary(abs_path) {
        return FileIndexOutcome { record: None, warnings };
    }

    let metadata = match tokio::fs::metadata(abs_path).await {
        Ok(m) => m,
        Err(e) => {
            warnings.push(make_warning(&relative_str, WarningReason::Error, e.to_string()));
            return FileIndexOutcome { record: None, warnings };
        }
    };
    if !metadata.is_file() {
        return FileIndexOutcome { record: None, warnings };
    }

    let size_bytes = metadata.len();
    if size_bytes > limits.max_bytes {
        warnings.push(make_warning(
            &relative_str,
            WarningReason::Size,
            format!("{} bytes exceeds limit of {} bytes", size_bytes, limits.max_bytes),
        ));
        return FileIndexOutcome { record: None, warnings };
    }

    let bytes = match tokio::fs::read(abs_path).await {
        Ok(b) => b,
        Err(e) => {
            warnings.push(make_warning(&relative_str, WarningReason::Error, e.to_string()));
            return FileIndexOutcome { record: None, warnings };
        }
    };
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warnings.push(make_warning(&relative_str, WarningReason::Error, format!("not valid utf-8: {e}")));
            return FileIndexOutcome { record: None, warnings };
        }
    };

    let line_count = content.lines().count() as u32;
    if line_count > limits.max_lines {
        warnings.push(make_warning(
            &relative_str,
            WarningReason::Lines,
            format!("{} lines exceeds limit of {}", line_count, limits.max_lines),
        ));
        return FileIndexOutcome { record: None, warnings };
    }
    if let Some(longest) = content.lines().map(|l| l.chars().count()).max() {
        if longest as u32 > limits.max_line_chars {
            warnings.push(make_warning(
                &relative_str,
                WarningReason::LineLength,
                format!("line of {} chars exceeds limit of {}", longest, limits.max_line_chars),
            ));
            return FileIndexOutcome { record: None, warnings };
        }
    }

    let language = classifier::language_of(abs_path);
    let mut symbols = Vec::new();
    let mut imports = Vec::new();
    let mut exports = Vec::new();

    if let Some(tag) = language.and_then(|l| l.extractor_tag()) {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| extractor::extract(&content, tag))) {
            Ok(result) => {
                symbols = result
                    .symbols
                    .into_iter()
                    .map(|s| PersistedSymbol {
                        name: s.name,
                        kind: s.kind,
                        start_line: s.start_line,
                        end_line: None,
                        signature: Some(s.signature),
                        exported: s.exported,
                    })
                    .collect();
                imports = result.imports;
                exports = result.exports;
            }
            Err(_) => {
                warnings.push(make_warning(&relative_str, WarningReason::RegexTimeout, "extraction failed on this file"));
            }
        }
    }

    let record = FileRecord {
        path: relative_str,
        absolute_path: abs_path.to_string_lossy().to_string(),
        size_bytes,
        mtime_ms: mtime_ms_of(&metadata),
        content_hash: content_hash(&content),
        language: language.map(|l| l.as_str().to_string()),
        line_count,
        symbols,
        imports,
        exports,
    };

    FileIndexOutcome { record: Some(record), warnings }
}

/// True if the file at `abs_path` differs from the last-recorded mtime/hash
/// pair. Checks mtime first (cheap) and only rehashes on a mismatch.
pub async fn has_changed(abs_path: &Path, last_mtime_ms: f64, last_hash: &str) -> bool {
    let metadata = match tokio::fs::metadata(abs_path).await {
        Ok(m) => m,
        Err(_) => return true,
    };
    if (mtime_ms_of(&metadata) - last_mtime_ms).abs() < f64::EPSILON {
        return false;
    }
    match tokio::fs::read(abs_path).await {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(content) => content_hash(&content) != last_hash,
            Err(_) => true,
        },
        Err(_) => true,
    }
}
