//! Command-line interface for archlens.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use crate::agents::{self, RunOptions, REGISTRY};
use crate::config::{Config, CONFIG_FILE_NAMES};
use crate::pipeline::{self, AnalysisResult};
use crate::report::{self, RunReport};
use crate::snapshot::{Snapshot, SnapshotDiff};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "ARCHLENS_LOG";
/// Environment variable holding a license token.
pub const LICENSE_ENV: &str = "ARCHLENS_LICENSE";

/// Static architecture analysis for web-application codebases.
///
/// Archlens parses every module of a project, builds its import graph,
/// extracts the data schema and runs a set of rule agents over the result:
/// dead code, import cycles, oversized files, unauthenticated mutations,
/// schema drift and more.
#[derive(Parser)]
#[command(name = "archlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a project and report findings
    #[command(visible_alias = "check")]
    Analyze(AnalyzeArgs),
    /// List registered agents
    Agents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Project root to analyze
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover in the project root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Run only these agents (comma-separated ids)
    #[arg(long, value_delimiter = ',')]
    pub agents: Vec<String>,

    /// Skip these agents (repeatable or comma-separated)
    #[arg(long = "exclude-agent", value_delimiter = ',')]
    pub exclude_agent: Vec<String>,

    /// Run free-tier agents only
    #[arg(long)]
    pub free_only: bool,

    /// License token for pro-tier agents (also read from ARCHLENS_LICENSE)
    #[arg(long)]
    pub license: Option<String>,

    /// Snapshot file to compare against and refresh
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Install the stderr tracing subscriber.
///
/// `ARCHLENS_LOG` takes an `EnvFilter` directive; the default is `warn`.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Report panics through tracing instead of the default stderr hook.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(%location, "panic: {}", agents::panic_message(info.payload()));
    }));
}

fn load_config(args: &AnalyzeArgs, root: &Path) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(root)?,
    };
    config.validate()?;

    let license = args
        .license
        .clone()
        .or_else(|| std::env::var(LICENSE_ENV).ok().filter(|v| !v.is_empty()));
    if license.is_some() {
        config.agents.license = license;
    }
    Ok(config)
}

/// Ids in `ids` that name no registered agent.
fn unknown_agents(ids: &[String]) -> Vec<&str> {
    ids.iter()
        .map(String::as_str)
        .filter(|id| agents::get_agent(id).is_none())
        .collect()
}

fn analyze_with_progress(root: &Path, config: &Config) -> anyhow::Result<AnalysisResult> {
    let bar = ProgressBar::new(0);
    let template = "  {spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files";
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        bar.set_style(style.progress_chars("█▓▒░"));
    }
    let result = pipeline::analyze_project_with_progress(root, config, |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    });
    bar.finish_and_clear();
    result
}

/// Capture a snapshot of the analyzed files, diff it against the one at
/// `path` and overwrite it.
fn refresh_snapshot(
    path: &Path,
    root: &Path,
    analysis: &AnalysisResult,
) -> anyhow::Result<Option<SnapshotDiff>> {
    let previous = Snapshot::load_optional(path)?;
    let analyzed: Vec<&str> = analysis.graph.nodes.keys().map(String::as_str).collect();
    let current = Snapshot::capture(
        root,
        &analyzed,
        analysis.framework.framework,
        analysis.graph.stats(),
    )?;
    let diff = previous.map(|previous| current.diff(&previous));
    current.save(path)?;
    Ok(diff)
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    init_logging(args.verbose);
    install_panic_hook();

    let root = match args.path.canonicalize() {
        Ok(p) if p.is_dir() => p,
        Ok(p) => {
            eprintln!("Error: {} is not a directory", p.display());
            return Ok(EXIT_ERROR);
        }
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let config = match load_config(args, &root) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Config files are looked up as {}", CONFIG_FILE_NAMES.join(", "));
            return Ok(EXIT_ERROR);
        }
    };

    let requested: Vec<String> = args.agents.iter().chain(&args.exclude_agent).cloned().collect();
    let unknown = unknown_agents(&requested);
    if !unknown.is_empty() {
        eprintln!("Error: unknown agent id(s): {}", unknown.join(", "));
        eprintln!("Run 'archlens agents' to list available agents");
        return Ok(EXIT_ERROR);
    }

    let analysis = match args.format {
        OutputFormat::Pretty => analyze_with_progress(&root, &config)?,
        OutputFormat::Json => pipeline::analyze_project(&root, &config)?,
    };

    let options = RunOptions {
        only: args.agents.clone(),
        exclude: args.exclude_agent.clone(),
        free_only: args.free_only,
    };
    let summary = agents::run_agents(&analysis.graph, &config, &options);

    let changes = match &args.snapshot {
        Some(path) => refresh_snapshot(path, &root, &analysis)?,
        None => None,
    };

    let path_str = args.path.to_string_lossy().to_string();
    let report = RunReport {
        path: &path_str,
        analysis: &analysis,
        summary: &summary,
        changes: changes.as_ref(),
    };
    let mut out = std::io::stdout().lock();
    match args.format {
        OutputFormat::Json => report::write_json(&mut out, &report)?,
        OutputFormat::Pretty => report::write_pretty(&mut out, &report)?,
    }
    out.flush()?;

    if summary.has_errors() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the agents command.
pub fn run_list_agents() -> anyhow::Result<i32> {
    println!("Available agents:");
    println!();
    for agent in REGISTRY {
        println!("  {:<22} {:<5} {}", agent.id, agent.tier, agent.description);
    }
    println!();
    println!("Usage:");
    println!("  archlens analyze <path> --agents <id,id>");
    Ok(EXIT_SUCCESS)
}
