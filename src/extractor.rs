// SPDX-License-Identifier: AGPL-3.0-or-later

//! Symbol extraction.
//!
//! Regex-anchored, not a parser: each of the five supported language tags
//! (typescript, javascript, python, go, rust) carries a flat, data-driven
//! table of `{pattern, kind, implies_exported}` rows. Adding a construct to a
//! language means adding a table row, not new control flow.

use once_cell::sync::Lazy;
use regex::Regex;

/// The recognized symbol kinds. No `Struct`/`Trait`/`Enum` — those
/// map onto the closest member of this closed set at extraction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Type,
    Variable,
    Constant,
    Method,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Method => "method",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "function" => Some(SymbolKind::Function),
            "class" => Some(SymbolKind::Class),
            "interface" => Some(SymbolKind::Interface),
            "type" => Some(SymbolKind::Type),
            "variable" => Some(SymbolKind::Variable),
            "constant" => Some(SymbolKind::Constant),
            "method" => Some(SymbolKind::Method),
            _ => None,
        }
    }
}

/// One extracted declaration, before it is attached to a file record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: u32,
    pub signature: String,
    pub exported: bool,
}

/// Output of a single extraction pass: symbols in source order, plus
/// deduplicated import and export string sets (in first-seen order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractResult {
    pub symbols: Vec<ExtractedSymbol>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
}

struct PatternRule {
    pattern: Regex,
    kind: SymbolKind,
    implies_exported: bool,
}

struct ImportRule {
    pattern: Regex,
}

struct ExportListRule {
    pattern: Regex,
}

struct LanguageBundle {
    symbol_rules: Vec<PatternRule>,
    import_rules: Vec<ImportRule>,
    export_list_rules: Vec<ExportListRule>,
}

fn rule(pattern: &str, kind: SymbolKind, implies_exported: bool) -> PatternRule {
    PatternRule { pattern: Regex::new(pattern).expect("static pattern must compile"), kind, implies_exported }
}

fn import_rule(pattern: &str) -> ImportRule {
    ImportRule { pattern: Regex::new(pattern).expect("static pattern must compile") }
}

fn export_list_rule(pattern: &str) -> ExportListRule {
    ExportListRule { pattern: Regex::new(pattern).expect("static pattern must compile") }
}

static TYPESCRIPT_BUNDLE: Lazy<LanguageBundle> = Lazy::new(|| LanguageBundle {
    symbol_rules: vec![
        rule(r"^(export\s+)?(default\s+)?(async\s+)?function\s+(\w+)\s*\([^)]*\)(?:\s*:\s*[^{;]+)?\s*\{", SymbolKind::Function, true),
        rule(r"^(export\s+)?(default\s+)?(abstract\s+)?class\s+(\w+)", SymbolKind::Class, true),
        rule(r"^(export\s+)?interface\s+(\w+)", SymbolKind::Interface, true),
        rule(r"^(export\s+)?type\s+(\w+)\s*(?:<[^>]*>)?\s*=", SymbolKind::Type, true),
        rule(r"^(export\s+)?enum\s+(\w+)", SymbolKind::Type, true),
        rule(r"^(export\s+)?const\s+(\w+)\s*[:=]", SymbolKind::Constant, true),
        rule(r"^(export\s+)?let\s+(\w+)\s*[:=]", SymbolKind::Variable, true),
        rule(r"^\s+(?:public\s+|private\s+|protected\s+|static\s+|async\s+)*(\w+)\s*\([^)]*\)\s*(?::\s*[^{;]+)?\s*\{", SymbolKind::Method, false),
    ],
    import_rules: vec![
        import_rule(r#"^import\s+[\s\S]*?\bfrom\s+['"]([^'"]+)['"]"#),
        import_rule(r#"^import\s+['"]([^'"]+)['"]"#),
    ],
    export_list_rules: vec![export_list_rule(r"^export\s*\{\s*([^}]+)\s*\}")],
});

static JAVASCRIPT_BUNDLE: Lazy<LanguageBundle> = Lazy::new(|| LanguageBundle {
    symbol_rules: vec![
        rule(r"^(export\s+)?(default\s+)?(async\s+)?function\s+(\w+)\s*\([^)]*\)\s*\{", SymbolKind::Function, true),
        rule(r"^(export\s+)?(default\s+)?class\s+(\w+)", SymbolKind::Class, true),
        rule(r"^(export\s+)?const\s+(\w+)\s*=", SymbolKind::Constant, true),
        rule(r"^(export\s+)?let\s+(\w+)\s*=", SymbolKind::Variable, true),
        rule(r"^\s+(?:static\s+|async\s+)*(\w+)\s*\([^)]*\)\s*\{", SymbolKind::Method, false),
    ],
    import_rules: vec![
        import_rule(r#"^import\s+[\s\S]*?\bfrom\s+['"]([^'"]+)['"]"#),
        import_rule(r#"^import\s+['"]([^'"]+)['"]"#),
        import_rule(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#),
    ],
    export_list_rules: vec![export_list_rule(r"^export\s*\{\s*([^}]+)\s*\}")],
});

static PYTHON_BUNDLE: Lazy<LanguageBundle> = Lazy::new(|| LanguageBundle {
    symbol_rules: vec![
        rule(r"^def\s+(\w+)\s*\(", SymbolKind::Function, false),
        rule(r"^class\s+(\w+)", SymbolKind::Class, false),
        rule(r"^([A-Z][A-Z0-9_]*)\s*(?::\s*[^=]+)?=", SymbolKind::Constant, false),
        rule(r"^\s+def\s+(\w+)\s*\(", SymbolKind::Method, false),
        rule(r"^([a-z_]\w*)\s*(?::\s*[^=]+)?=", SymbolKind::Variable, false),
    ],
    import_rules: vec![
        import_rule(r"^from\s+(\S+)\s+import"),
        import_rule(r"^import\s+(.+)$"),
    ],
    export_list_rules: vec![],
});

static GO_BUNDLE: Lazy<LanguageBundle> = Lazy::new(|| LanguageBundle {
    symbol_rules: vec![
        rule(r"^func\s+(?:\([^)]*\)\s*)?(\w+)\s*\(", SymbolKind::Function, false),
        rule(r"^type\s+(\w+)\s+interface\s*\{", SymbolKind::Interface, false),
        rule(r"^type\s+(\w+)\s+struct\s*\{", SymbolKind::Type, false),
        rule(r"^type\s+(\w+)\s+", SymbolKind::Type, false),
        rule(r"^const\s+(\w+)\s*=", SymbolKind::Constant, false),
        rule(r"^var\s+(\w+)\s+", SymbolKind::Variable, false),
    ],
    import_rules: vec![
        import_rule(r#"^import\s+"([^"]+)""#),
        import_rule(r#"^\s*"([^"]+)"$"#),
    ],
    export_list_rules: vec![],
});

static RUST_BUNDLE: Lazy<LanguageBundle> = Lazy::new(|| LanguageBundle {
    symbol_rules: vec![
        rule(r"^(pub(?:\([^)]*\))?\s+)?(async\s+)?fn\s+(\w+)", SymbolKind::Function, true),
        rule(r"^(pub(?:\([^)]*\))?\s+)?struct\s+(\w+)", SymbolKind::Class, true),
        rule(r"^(pub(?:\([^)]*\))?\s+)?enum\s+(\w+)", SymbolKind::Class, true),
        rule(r"^(pub(?:\([^)]*\))?\s+)?trait\s+(\w+)", SymbolKind::Interface, true),
        rule(r"^(pub(?:\([^)]*\))?\s+)?type\s+(\w+)", SymbolKind::Type, true),
        rule(r"^(pub(?:\([^)]*\))?\s+)?const\s+(\w+)", SymbolKind::Constant, true),
        rule(r"^(pub(?:\([^)]*\))?\s+)?static\s+(?:mut\s+)?(\w+)", SymbolKind::Variable, true),
        rule(r"^\s+(pub(?:\([^)]*\))?\s+)?(async\s+)?fn\s+(\w+)", SymbolKind::Method, true),
    ],
    import_rules: vec![import_rule(r"^use\s+([\w:]+(?:::\{[^}]*\})?)")],
    export_list_rules: vec![],
});

static EXPORT_RENAME_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+as\s+").expect("static pattern must compile"));

fn bundle_for(language_tag: &str) -> Option<&'static LanguageBundle> {
    match language_tag {
        "typescript" => Some(&TYPESCRIPT_BUNDLE),
        "javascript" => Some(&JAVASCRIPT_BUNDLE),
        "python" => Some(&PYTHON_BUNDLE),
        "go" => Some(&GO_BUNDLE),
        "rust" => Some(&RUST_BUNDLE),
        _ => None,
    }
}

fn last_capture(caps: &regex::Captures) -> Option<String> {
    // The name is always the last capturing group in these patterns (modifier
    // keywords are captured in earlier groups so `implies_exported` can also
    // be read structurally, but here we only need the final group: the name).
    (1..caps.len()).rev().find_map(|i| caps.get(i)).map(|m| m.as_str().to_string())
}

fn push_import(set: &mut Vec<String>, raw: &str) {
    for piece in raw.split(',') {
        let trimmed = piece.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        if !trimmed.is_empty() && !set.iter().any(|s| s == trimmed) {
            set.push(trimmed.to_string());
        }
    }
}

fn push_export(set: &mut Vec<String>, name: &str) {
    let name = name.trim();
    if !name.is_empty() && !set.iter().any(|s| s == name) {
        set.push(name.to_string());
    }
}

/// Extracts symbols, imports, and exports from `content` using the pattern
/// bundle for `language_tag` (the five tags in [`crate::classifier::Language::extractor_tag`]).
/// Unsupported tags yield empty lists. Pure, no I/O; never panics on
/// malformed input — regex application on a single line cannot fail short of
/// pathological backtracking, which is the caller's deadline to guard.
pub fn extract(content: &str, language_tag: &str) -> ExtractResult {
    let bundle = match bundle_for(language_tag) {
        Some(b) => b,
        None => return ExtractResult::default(),
    };

    let mut symbols = Vec::new();
    let mut imports = Vec::new();
    let mut exports = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = (idx + 1) as u32;

        for r in &bundle.symbol_rules {
            if let Some(caps) = r.pattern.captures(line) {
                if let Some(name) = last_capture(&caps) {
                    if name == "default" {
                        continue;
                    }
                    let matched = caps.get(0).map(|m| m.as_str()).unwrap_or(line);
                    let signature = matched.trim().to_string();
                    let exported = r.implies_exported && line.contains("export")
                        || (language_tag == "rust" && r.implies_exported && line.trim_start().starts_with("pub"));
                    symbols.push(ExtractedSymbol {
                        name,
                        kind: r.kind,
                        start_line: line_no,
                        signature,
                        exported,
                    });
                    break;
                }
            }
        }

        for r in &bundle.import_rules {
            if let Some(caps) = r.pattern.captures(line) {
                if let Some(m) = caps.get(1) {
                    push_import(&mut imports, m.as_str());
                }
            }
        }

        for r in &bundle.export_list_rules {
            if let Some(caps) = r.pattern.captures(line) {
                if let Some(m) = caps.get(1) {
                    for piece in m.as_str().split(',') {
                        let piece = piece.trim();
                        let name = EXPORT_RENAME_SPLIT.split(piece).next().unwrap_or(piece).trim();
                        push_export(&mut exports, name);
                    }
                }
            }
        }
    }

    for sym in &symbols {
        if sym.exported {
            push_export(&mut exports, &sym.name);
        }
    }

    ExtractResult { symbols, imports, exports }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s1_typescript_exported_function() {
        let content = "export function greet(name: string): string { return name; }";
        let result = extract(content, "typescript");
        assert_eq!(result.symbols.len(), 1);
        let sym = &result.symbols[0];
        assert_eq!(sym.name, "greet");
        assert_eq!(sym.kind, SymbolKind::Function);
        assert_eq!(sym.start_line, 1);
        assert!(sym.exported);
        assert_eq!(sym.signature, "export function greet(name: string): string {");
    }

    #[test]
    fn test_s2_python_class_and_constant() {
        let content = "class User:\n  pass\n\nMAX_SIZE = 1000\n";
        let result = extract(content, "python");
        let user = result.symbols.iter().find(|s| s.name == "User").unwrap();
        assert_eq!(user.kind, SymbolKind::Class);
        assert_eq!(user.start_line, 1);
        assert!(!user.exported);

        let max_size = result.symbols.iter().find(|s| s.name == "MAX_SIZE").unwrap();
        assert_eq!(max_size.kind, SymbolKind::Constant);
        assert_eq!(max_size.start_line, 4);
        assert!(!max_size.exported);
    }

    #[test]
    fn test_s3_go_struct_and_interface() {
        let content = "type User struct {\n  Name string\n}\ntype Reader interface {\n  Read() error\n}\n";
        let result = extract(content, "go");
        let user = result.symbols.iter().find(|s| s.name == "User").unwrap();
        assert_eq!(user.kind, SymbolKind::Type);
        let reader = result.symbols.iter().find(|s| s.name == "Reader").unwrap();
        assert_eq!(reader.kind, SymbolKind::Interface);
    }

    #[test]
    fn test_default_name_discarded() {
        let content = "export default function() {}\nexport function named() {}";
        let result = extract(content, "typescript");
        assert!(result.symbols.iter().all(|s| s.name != "default"));
        assert!(result.symbols.iter().any(|s| s.name == "named"));
    }

    #[test]
    fn test_unsupported_language_yields_empty() {
        let result = extract("public class Foo {}", "java");
        assert!(result.symbols.is_empty());
        assert!(result.imports.is_empty());
        assert!(result.exports.is_empty());
    }

    #[test]
    fn test_rust_pub_fn_exported() {
        let content = "pub fn greet(name: &str) -> String {\n    format!(\"hi {}\", name)\n}\n";
        let result = extract(content, "rust");
        let sym = result.symbols.iter().find(|s| s.name == "greet").unwrap();
        assert_eq!(sym.kind, SymbolKind::Function);
        assert!(sym.exported);
    }

    #[test]
    fn test_ts_import_module_string() {
        let content = "import { Config } from './config';\nimport * as utils from '../utils';\n";
        let result = extract(content, "typescript");
        assert!(result.imports.contains(&"./config".to_string()));
        assert!(result.imports.contains(&"../utils".to_string()));
    }

    #[test]
    fn test_python_import_comma_split() {
        let content = "import os, sys\n";
        let result = extract(content, "python");
        assert!(result.imports.contains(&"os".to_string()));
        assert!(result.imports.contains(&"sys".to_string()));
    }

    #[test]
    fn test_ts_export_list() {
        let content = "const a = 1;\nconst b = 2;\nexport { a, b as renamed };\n";
        let result = extract(content, "typescript");
        assert!(result.exports.contains(&"a".to_string()));
        assert!(result.exports.contains(&"b".to_string()));
    }

    #[test]
    fn test_export_list_as_keyword_has_word_boundary() {
        let content = "const base = 1;\nconst lastName = 2;\nexport { base, lastName as ln };\n";
        let result = extract(content, "typescript");
        assert!(result.exports.contains(&"base".to_string()));
        assert!(result.exports.contains(&"lastName".to_string()));
        assert!(!result.exports.contains(&"ln".to_string()));
    }
}
