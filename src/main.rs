// SPDX-License-Identifier: AGPL-3.0-or-later

//! Command-line front door: a thin `clap`-derived surface over the
//! index manager and query surface. Contains no indexing logic of its own —
//! every subcommand parses its arguments, resolves configuration, and calls
//! straight into [`symdex::manager`]/[`symdex::query`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;

use symdex::config::{self, ConfigOverrides};
use symdex::manager::IndexManager;
use symdex::query::DEFAULT_LIMIT;
use symdex::telemetry::{self, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "symdex", version, about = "Project code-indexing and symbol-search engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose (debug-level) logging.
    #[arg(long, global = true)]
    verbose: bool,

    /// Quiet logging (warnings and errors only).
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit machine-readable JSON instead of a human-readable table.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full index build over a project root.
    Build {
        path: PathBuf,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Incremental update of a previously built index.
    Update {
        path: PathBuf,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Re-index a single file after an edit.
    IndexFile {
        path: PathBuf,
        /// Project root whose index this file belongs to (defaults to the current directory).
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
    /// Scored symbol-name search.
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        /// Project root to search (defaults to the current directory).
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
    /// Case-insensitive substring search over file paths.
    FindFile {
        substr: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
    /// UNIX shell-glob search over file paths.
    Glob {
        pattern: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
    /// List the symbols declared in one file.
    Symbols {
        file: String,
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
    /// Files whose imports reference a module substring.
    Importers {
        module: String,
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
    /// Summary statistics for a project's index.
    Stats { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let telemetry_config = if cli.verbose {
        TelemetryConfig::verbose()
    } else if cli.quiet {
        TelemetryConfig::quiet()
    } else {
        TelemetryConfig::default()
    };
    let _guard = telemetry::init_telemetry(&telemetry_config)?;

    match cli.command {
        Commands::Build { path, workers } => run_build(&path, workers, cli.json).await,
        Commands::Update { path, workers } => run_update(&path, workers, cli.json).await,
        Commands::IndexFile { path, project } => run_index_file(&project, &path, cli.json).await,
        Commands::Search { query, limit, project } => run_search(&project, &query, limit, cli.json).await,
        Commands::FindFile { substr, limit, project } => run_find_file(&project, &substr, limit, cli.json).await,
        Commands::Glob { pattern, limit, project } => run_glob(&project, &pattern, limit, cli.json).await,
        Commands::Symbols { file, project } => run_symbols(&project, &file, cli.json).await,
        Commands::Importers { module, project } => run_importers(&project, &module, cli.json).await,
        Commands::Stats { path } => run_stats(&path, cli.json).await,
    }
}

fn canonical_root(path: &std::path::Path) -> anyhow::Result<PathBuf> {
    Ok(std::fs::canonicalize(path)?)
}

async fn run_build(path: &std::path::Path, workers: Option<usize>, as_json: bool) -> anyhow::Result<()> {
    let root = canonical_root(path)?;
    let resolved = config::resolve(&root, &ConfigOverrides { workers, ..Default::default() })?;
    let manager = IndexManager::open(&root)?;

    tracing::info!(project = %root.display(), "starting full build");
    let result = manager.build_index(None, resolved.limits, &resolved.extra_ignore_globs, resolved.workers).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({
            "total_files": result.total_files,
            "total_symbols": result.total_symbols,
            "total_size": result.total_size,
            "languages": result.languages,
            "duration_ms": result.duration_ms,
            "warnings": result.warnings.len(),
        }))?);
    } else {
        println!(
            "indexed {} files, {} symbols in {}ms ({} warnings)",
            result.total_files, result.total_symbols, result.duration_ms, result.warnings.len()
        );
    }
    Ok(())
}

async fn run_update(path: &std::path::Path, workers: Option<usize>, as_json: bool) -> anyhow::Result<()> {
    let root = canonical_root(path)?;
    let resolved = config::resolve(&root, &ConfigOverrides { workers, ..Default::default() })?;
    let manager = IndexManager::open(&root)?;

    tracing::info!(project = %root.display(), "starting incremental update");
    let result = manager.update_index(None, resolved.limits, &resolved.extra_ignore_globs, resolved.workers).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({
            "total_files": result.total_files,
            "total_symbols": result.total_symbols,
            "files_deleted": result.files_deleted,
            "duration_ms": result.duration_ms,
            "warnings": result.warnings.len(),
        }))?);
    } else {
        println!(
            "updated {} files, deleted {}, in {}ms ({} warnings)",
            result.total_files, result.files_deleted, result.duration_ms, result.warnings.len()
        );
    }
    Ok(())
}

async fn run_index_file(project: &std::path::Path, path: &std::path::Path, as_json: bool) -> anyhow::Result<()> {
    let root = canonical_root(project)?;
    let abs = canonical_root(path)?;
    let resolved = config::resolve(&root, &ConfigOverrides::default())?;
    let manager = IndexManager::open(&root)?;
    manager.index_file(&abs, resolved.limits).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({"refreshed": abs.display().to_string()}))?);
    } else {
        println!("refreshed {}", abs.display());
    }
    Ok(())
}

async fn run_search(project: &std::path::Path, query: &str, limit: usize, as_json: bool) -> anyhow::Result<()> {
    let root = canonical_root(project)?;
    let manager = IndexManager::open(&root)?;
    let results = manager.query().search_symbols(query, limit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&results.iter().map(|r| json!({
            "name": r.name,
            "kind": r.kind.as_str(),
            "file": r.file_path,
            "line": r.start_line,
            "exported": r.exported,
            "score": r.score,
        })).collect::<Vec<_>>())?);
    } else {
        for r in &results {
            println!("{:>3}  {:<10} {}:{}  {}", r.score, r.kind.as_str(), r.file_path, r.start_line, r.name);
        }
    }
    Ok(())
}

async fn run_find_file(project: &std::path::Path, substr: &str, limit: usize, as_json: bool) -> anyhow::Result<()> {
    let root = canonical_root(project)?;
    let manager = IndexManager::open(&root)?;
    let results = manager.query().find_files(substr, limit).await?;
    print_path_list(&results, as_json)
}

async fn run_glob(project: &std::path::Path, pattern: &str, limit: usize, as_json: bool) -> anyhow::Result<()> {
    let root = canonical_root(project)?;
    let manager = IndexManager::open(&root)?;
    let results = manager.query().glob_files(pattern, limit).await?;
    print_path_list(&results, as_json)
}

async fn run_symbols(project: &std::path::Path, file: &str, as_json: bool) -> anyhow::Result<()> {
    let root = canonical_root(project)?;
    let manager = IndexManager::open(&root)?;
    let symbols = manager.query().get_file_symbols(file).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&symbols.iter().map(|s| json!({
            "name": s.name,
            "kind": s.kind.as_str(),
            "start_line": s.start_line,
            "end_line": s.end_line,
            "exported": s.exported,
        })).collect::<Vec<_>>())?);
    } else {
        for s in &symbols {
            println!("{:<6} {:<10} line {}  {}", if s.exported { "pub" } else { "" }, s.kind.as_str(), s.start_line, s.name);
        }
    }
    Ok(())
}

async fn run_importers(project: &std::path::Path, module: &str, as_json: bool) -> anyhow::Result<()> {
    let root = canonical_root(project)?;
    let manager = IndexManager::open(&root)?;
    let results = manager.query().find_importers(module).await?;
    print_path_list(&results, as_json)
}

async fn run_stats(path: &std::path::Path, as_json: bool) -> anyhow::Result<()> {
    let root = canonical_root(path)?;
    let stats = symdex::query::stats_for_project(&root).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("files:   {}", stats.total_files);
        println!("symbols: {}", stats.total_symbols);
        println!("size:    {} bytes", stats.total_size);
        for (lang, count) in &stats.languages {
            println!("  {lang}: {count}");
        }
    }
    Ok(())
}

fn print_path_list(paths: &[String], as_json: bool) -> anyhow::Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(paths)?);
    } else {
        for p in paths {
            println!("{p}");
        }
    }
    Ok(())
}
