// SPDX-License-Identifier: AGPL-3.0-or-later

//! Layered configuration.
//!
//! Layered resolution of the overridable settings: `IndexingLimits`, the
//! vendor-dir literal (test-isolation override only), and extra
//! ignore-segment globs appended to the closed default list. Precedence,
//! lowest to highest: built-in defaults < global file
//! (`<home>/<vendor-dir>/config.json`) < workspace file
//! (`<project-root>/.<vendor-dir-name>.json`) < explicit overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::locator;
use crate::types::IndexingLimits;

/// One layer of on-disk configuration. Every field is optional so a file
/// may override only what it cares about; absent fields fall through to
/// the next-lower layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub max_bytes: Option<u64>,
    #[serde(default)]
    pub max_lines: Option<u32>,
    #[serde(default)]
    pub max_line_chars: Option<u32>,
    #[serde(default)]
    pub file_deadline_ms: Option<u64>,
    #[serde(default)]
    pub skip_on_error: Option<bool>,
    /// Test-only override for the vendor directory name; never read from a
    /// real user's config in production use.
    #[serde(default)]
    pub vendor_dir: Option<String>,
    /// Extra ignore globs, appended to (never replacing) the built-in list.
    #[serde(default)]
    pub extra_ignore_globs: Vec<String>,
}

/// Explicit, highest-precedence overrides a caller supplies directly (e.g.
/// parsed CLI flags). Every field is optional for the same reason as
/// [`ConfigFile`].
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_bytes: Option<u64>,
    pub max_lines: Option<u32>,
    pub max_line_chars: Option<u32>,
    pub file_deadline_ms: Option<u64>,
    pub skip_on_error: Option<bool>,
    pub workers: Option<usize>,
}

/// Fully resolved configuration, ready for `manager`/`walker` to consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub limits: IndexingLimits,
    pub extra_ignore_globs: Vec<String>,
    pub workers: usize,
}

fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(locator::VENDOR_DIR).join("config.json"))
}

fn workspace_config_path(project_root: &Path) -> PathBuf {
    project_root.join(format!(".{}.json", locator::VENDOR_DIR.trim_start_matches('.')))
}

fn read_layer(path: &Path) -> Result<ConfigFile, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let parsed: ConfigFile = serde_json::from_str(&contents)
                .map_err(|e| ConfigError::InvalidFormat(format!("{}: {}", path.display(), e)))?;
            validate_layer(path, &parsed)?;
            Ok(parsed)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(e.into()),
    }
}

/// Rejects a layer with a zero value for any limit field — zero cannot express
/// "unlimited" here (see [`crate::types::IndexingLimits`]'s field meanings) and
/// would silently cause every file to fail its gate.
fn validate_layer(path: &Path, layer: &ConfigFile) -> Result<(), ConfigError> {
    let zero = |field: &str| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("must be greater than 0 (in {})", path.display()),
    };
    if layer.max_bytes == Some(0) {
        return Err(zero("max_bytes"));
    }
    if layer.max_lines == Some(0) {
        return Err(zero("max_lines"));
    }
    if layer.max_line_chars == Some(0) {
        return Err(zero("max_line_chars"));
    }
    if layer.file_deadline_ms == Some(0) {
        return Err(zero("file_deadline_ms"));
    }
    Ok(())
}

fn apply_layer(limits: &mut IndexingLimits, extra_globs: &mut Vec<String>, layer: &ConfigFile) {
    if let Some(v) = layer.max_bytes {
        limits.max_bytes = v;
    }
    if let Some(v) = layer.max_lines {
        limits.max_lines = v;
    }
    if let Some(v) = layer.max_line_chars {
        limits.max_line_chars = v;
    }
    if let Some(v) = layer.file_deadline_ms {
        limits.file_deadline_ms = v;
    }
    if let Some(v) = layer.skip_on_error {
        limits.skip_on_error = v;
    }
    extra_globs.extend(layer.extra_ignore_globs.iter().cloned());
}

/// Resolves the layered configuration for `project_root`: built-in defaults,
/// then the global file, then the workspace file, then `overrides`. Missing
/// files at any layer are not an error; a malformed file surfaces as
/// [`ConfigError::InvalidFormat`].
pub fn resolve(project_root: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig, ConfigError> {
    let mut limits = IndexingLimits::default();
    let mut extra_ignore_globs = Vec::new();

    if let Some(global_path) = global_config_path() {
        let layer = read_layer(&global_path)?;
        apply_layer(&mut limits, &mut extra_ignore_globs, &layer);
    }

    let workspace_path = workspace_config_path(project_root);
    let layer = read_layer(&workspace_path)?;
    apply_layer(&mut limits, &mut extra_ignore_globs, &layer);

    if let Some(v) = overrides.max_bytes {
        limits.max_bytes = v;
    }
    if let Some(v) = overrides.max_lines {
        limits.max_lines = v;
    }
    if let Some(v) = overrides.max_line_chars {
        limits.max_line_chars = v;
    }
    if let Some(v) = overrides.file_deadline_ms {
        limits.file_deadline_ms = v;
    }
    if let Some(v) = overrides.skip_on_error {
        limits.skip_on_error = v;
    }

    let workers = overrides.workers.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4));

    Ok(ResolvedConfig { limits, extra_ignore_globs, workers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_no_files_present() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve(dir.path(), &ConfigOverrides::default()).unwrap();
        assert_eq!(resolved.limits, IndexingLimits::default());
        assert!(resolved.extra_ignore_globs.is_empty());
        assert!(resolved.workers >= 1);
    }

    #[test]
    fn test_workspace_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            workspace_config_path(dir.path()),
            r#"{"max_bytes": 2048, "extra_ignore_globs": ["*.generated.ts"]}"#,
        )
        .unwrap();

        let resolved = resolve(dir.path(), &ConfigOverrides::default()).unwrap();
        assert_eq!(resolved.limits.max_bytes, 2048);
        assert_eq!(resolved.extra_ignore_globs, vec!["*.generated.ts".to_string()]);
    }

    #[test]
    fn test_explicit_overrides_beat_workspace_file() {
        let dir = TempDir::new().unwrap();
        fs::write(workspace_config_path(dir.path()), r#"{"max_bytes": 2048}"#).unwrap();

        let overrides = ConfigOverrides { max_bytes: Some(99), ..Default::default() };
        let resolved = resolve(dir.path(), &overrides).unwrap();
        assert_eq!(resolved.limits.max_bytes, 99);
    }

    #[test]
    fn test_malformed_workspace_file_is_invalid_format() {
        let dir = TempDir::new().unwrap();
        fs::write(workspace_config_path(dir.path()), "{not json").unwrap();

        let err = resolve(dir.path(), &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat(_)));
    }

    #[test]
    fn test_zero_max_bytes_is_invalid_value() {
        let dir = TempDir::new().unwrap();
        fs::write(workspace_config_path(dir.path()), r#"{"max_bytes": 0}"#).unwrap();

        let err = resolve(dir.path(), &ConfigOverrides::default()).unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "max_bytes"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }
}
