// SPDX-License-Identifier: AGPL-3.0-or-later

//! File classification.
//!
//! Decides, per path, whether a file should be ignored, is binary, or what
//! source language tag it carries. Pure, stateless, no I/O beyond the caller
//! supplying a path.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;

use crate::locator::VENDOR_DIR;

/// Closed set of language tags the extractor may recognize, plus
/// recognized-but-unsupported text tags that still count as "known, not binary".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Go,
    Rust,
    Java,
    Ruby,
    C,
    Cpp,
    CSharp,
    Php,
    Swift,
    Kotlin,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "TypeScript",
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Go => "Go",
            Language::Rust => "Rust",
            Language::Java => "Java",
            Language::Ruby => "Ruby",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::CSharp => "C#",
            Language::Php => "PHP",
            Language::Swift => "Swift",
            Language::Kotlin => "Kotlin",
        }
    }

    /// The lower-case tag the symbol extractor keys its pattern bundles by.
    /// Only the five required bundles return `Some`; the rest are recognized
    /// text languages with no extraction bundle.
    pub fn extractor_tag(&self) -> Option<&'static str> {
        match self {
            Language::TypeScript => Some("typescript"),
            Language::JavaScript => Some("javascript"),
            Language::Python => Some("python"),
            Language::Go => Some("go"),
            Language::Rust => Some("rust"),
            _ => None,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" | "pyi" => Some(Language::Python),
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            "java" => Some(Language::Java),
            "rb" => Some(Language::Ruby),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" => Some(Language::Cpp),
            "cs" => Some(Language::CSharp),
            "php" => Some(Language::Php),
            "swift" => Some(Language::Swift),
            "kt" | "kts" => Some(Language::Kotlin),
            _ => None,
        }
    }
}

/// Closed set of binary extensions (lowercase, no leading dot).
static BINARY_EXTENSIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "png", "jpg", "jpeg", "gif", "bmp", "ico", "svg", "webp", "pdf", "zip", "tar", "gz",
        "rar", "7z", "exe", "dll", "so", "dylib", "wasm", "bin", "dat", "db", "sqlite", "doc",
        "docx", "xls", "xlsx", "ppt", "pptx", "mp3", "mp4", "wav", "avi", "mov", "mkv", "flac",
        "ogg", "ttf", "otf", "woff", "woff2", "eot",
    ]
});

/// Default deny-list of path segments (name-exact or `*`-glob). `<vendor-dir>`
/// is substituted with the actual literal so a project never indexes its own
/// index directory.
pub fn default_ignore_segments() -> Vec<String> {
    vec![
        "node_modules",
        ".git",
        "dist",
        "build",
        "coverage",
        ".next",
        ".nuxt",
        ".cache",
        VENDOR_DIR,
        "vendor",
        "target",
        "bin",
        "obj",
        "__pycache__",
        ".venv",
        "venv",
        ".pytest_cache",
        ".mypy_cache",
        ".tox",
        ".eggs",
        "*.egg-info",
        ".DS_Store",
        "thumbs.db",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|s| s.to_lowercase())
}

/// Minimal glob match: `*` matches any run of non-separator characters;
/// everything else must match literally. Case-sensitive, single-segment only.
fn segment_glob_match(pattern: &str, segment: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == segment;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = segment;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !rest.starts_with(part) {
                return false;
            }
            rest = &rest[part.len()..];
        } else if i == parts.len() - 1 {
            if !rest.ends_with(part) {
                return false;
            }
        } else {
            match rest.find(part) {
                Some(idx) => rest = &rest[idx + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// Compiles a user-supplied list of extra ignore globs (config's
/// `extra_ignore_globs`) into a matchable set. An empty list compiles to an
/// empty, always-non-matching set rather than `None`, so callers don't need
/// to special-case "no extra globs".
pub fn build_ignore_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

/// True if any path segment of `relative_path` equals or glob-matches any
/// segment in `ignore_segments`, or if `extra_globs` matches the full
/// relative path or its file name.
pub fn is_ignored_with(relative_path: &Path, ignore_segments: &[String], extra_globs: Option<&GlobSet>) -> bool {
    let segment_hit = relative_path.components().any(|comp| {
        let seg = comp.as_os_str().to_string_lossy();
        ignore_segments.iter().any(|pat| segment_glob_match(pat, &seg))
    });
    if segment_hit {
        return true;
    }
    match extra_globs {
        Some(globset) if !globset.is_empty() => {
            globset.is_match(relative_path)
                || relative_path.file_name().map(|name| globset.is_match(Path::new(name))).unwrap_or(false)
        }
        _ => false,
    }
}

/// `is_ignored` using the default deny-list and no extra globs.
pub fn is_ignored(relative_path: &Path) -> bool {
    is_ignored_with(relative_path, &default_ignore_segments(), None)
}

/// True if the path's extension is in the closed binary-extension set.
pub fn is_binary(path: &Path) -> bool {
    match extension_of(path) {
        Some(ext) => BINARY_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Maps a path's extension to a language tag. `None` means "unknown but text".
pub fn language_of(path: &Path) -> Option<Language> {
    extension_of(path).and_then(|ext| Language::from_extension(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ignored_exact_segment() {
        assert!(is_ignored(Path::new("src/node_modules/pkg/index.js")));
        assert!(is_ignored(Path::new("node_modules/pkg/index.js")));
        assert!(!is_ignored(Path::new("src/lib/index.js")));
    }

    #[test]
    fn test_is_ignored_glob_segment() {
        assert!(is_ignored(Path::new("pkg/mything.egg-info/PKG-INFO")));
        assert!(!is_ignored(Path::new("pkg/egg-infoish/PKG-INFO")));
    }

    #[test]
    fn test_extra_globs_match_nested_file_name() {
        let globset = build_ignore_globset(&["*.generated.ts".to_string()]).unwrap();
        assert!(is_ignored_with(Path::new("src/api/client.generated.ts"), &[], Some(&globset)));
        assert!(!is_ignored_with(Path::new("src/api/client.ts"), &[], Some(&globset)));
    }

    #[test]
    fn test_no_extra_globs_is_no_op() {
        assert!(!is_ignored_with(Path::new("src/lib/index.js"), &[], None));
    }

    #[test]
    fn test_is_ignored_vendor_dir() {
        assert!(is_ignored(Path::new(".symdex/indexes/abc/index.db")));
    }

    #[test]
    fn test_is_binary_extensions() {
        assert!(is_binary(Path::new("logo.PNG")));
        assert!(is_binary(Path::new("archive.zip")));
        assert!(!is_binary(Path::new("main.rs")));
    }

    #[test]
    fn test_language_of_required_bundles() {
        assert_eq!(language_of(Path::new("a.ts")), Some(Language::TypeScript));
        assert_eq!(language_of(Path::new("a.tsx")), Some(Language::TypeScript));
        assert_eq!(language_of(Path::new("a.js")), Some(Language::JavaScript));
        assert_eq!(language_of(Path::new("a.py")), Some(Language::Python));
        assert_eq!(language_of(Path::new("a.go")), Some(Language::Go));
        assert_eq!(language_of(Path::new("a.rs")), Some(Language::Rust));
    }

    #[test]
    fn test_language_of_unknown_extension_is_none() {
        assert_eq!(language_of(Path::new("a.xyz")), None);
    }

    #[test]
    fn test_extractor_tag_only_for_required_five() {
        assert_eq!(Language::Java.extractor_tag(), None);
        assert_eq!(Language::Rust.extractor_tag(), Some("rust"));
    }
}
