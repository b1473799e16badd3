//! End-to-end analysis of one project: discover, parse, extract, build.
//!
//! Parsing fans out over rayon; everything after it is a single sequential
//! pass, so the returned graph is complete before any agent sees it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use globset::GlobSet;
use rayon::prelude::*;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::analysis::{parse_module, registered_extensions, AliasTable, ParsedModule, Resolver};
use crate::config::Config;
use crate::framework::{self, Detection, Framework};
use crate::graph::{build_graph, ProjectGraph};
use crate::schema::extract_schema;

/// A discovered file that produced no module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct AnalysisResult {
    pub graph: ProjectGraph,
    pub framework: Detection,
    /// Files discovered, parsed or not.
    pub files: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    pub duration_ms: u64,
}

impl AnalysisResult {
    pub fn total_files(&self) -> usize {
        self.files.len()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn relative_id(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel.components().filter_map(|c| c.as_os_str().to_str()).collect();
    Some(parts.join("/"))
}

fn is_source(id: &str, include_vue: bool) -> bool {
    if id.ends_with(".d.ts") {
        return false;
    }
    let ext = id.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    (include_vue || ext != "vue") && registered_extensions().contains(&ext)
}

/// Project-relative ids of every analyzable file under `root`, sorted.
pub fn discover_files(root: &Path, config: &Config) -> anyhow::Result<Vec<String>> {
    let excluded: GlobSet = config.exclusion_set()?;
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && e.file_name() != "node_modules");
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(id) = relative_id(root, entry.path()) else {
            continue;
        };
        if is_source(&id, config.include_vue) && !excluded.is_match(&id) {
            files.push(id);
        }
    }

    files.sort();
    Ok(files)
}

fn parse_one(root: &Path, id: &str, resolver: &Resolver) -> Result<ParsedModule, SkippedFile> {
    let skip = |reason: String| SkippedFile {
        path: id.to_string(),
        reason,
    };
    let source = std::fs::read_to_string(root.join(id)).map_err(|e| skip(e.to_string()))?;
    parse_module(&source, id, resolver).map_err(|e| skip(e.to_string()))
}

fn resolve_framework(root: &Path, config: &Config) -> Detection {
    if config.framework == Framework::Auto {
        return framework::detect(root);
    }
    Detection {
        framework: config.framework,
        confidence: 100,
        signals: vec!["configured".to_string()],
    }
}

/// Run the whole analysis with no progress reporting.
pub fn analyze_project(root: &Path, config: &Config) -> anyhow::Result<AnalysisResult> {
    analyze_project_with_progress(root, config, |_, _| {})
}

/// Like [`analyze_project`], calling `progress(done, total)` as files finish
/// parsing. The callback may run on any rayon worker.
pub fn analyze_project_with_progress<F>(
    root: &Path,
    config: &Config,
    progress: F,
) -> anyhow::Result<AnalysisResult>
where
    F: Fn(usize, usize) + Sync,
{
    let start = Instant::now();
    let root: PathBuf = root
        .canonicalize()
        .with_context(|| format!("resolving project root {}", root.display()))?;
    config.validate()?;

    let framework = resolve_framework(&root, config);
    tracing::info!(
        framework = %framework.framework,
        confidence = framework.confidence,
        "framework"
    );

    let files = discover_files(&root, config)?;
    let total = files.len();
    tracing::info!(files = total, "discovered source files");

    let resolver =
        Resolver::new(files.iter().cloned()).with_aliases(AliasTable::from_project(&root));
    let done = std::sync::atomic::AtomicUsize::new(0);
    let parsed: Vec<Result<ParsedModule, SkippedFile>> = {
        let _span = tracing::info_span!("parse", files = total).entered();
        files
            .par_iter()
            .map(|id| {
                let result = parse_one(&root, id, &resolver);
                let n = done.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
                progress(n, total);
                result
            })
            .collect()
    };

    let mut modules = Vec::with_capacity(parsed.len());
    let mut skipped = Vec::new();
    for result in parsed {
        match result {
            Ok(module) => modules.push(module),
            Err(skip) => {
                tracing::warn!(path = %skip.path, reason = %skip.reason, "skipping file");
                skipped.push(skip);
            }
        }
    }

    let schema = extract_schema(&root, &config.schema);
    let graph = build_graph(modules, schema);

    Ok(AnalysisResult {
        graph,
        framework,
        files,
        skipped,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
