//! Output formatting for archlens runs.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use std::io::Write;

use colored::*;
use serde::Serialize;

use crate::agents::{AgentResult, AgentsRunSummary, Finding, Severity};
use crate::framework::Detection;
use crate::graph::GraphStats;
use crate::pipeline::{AnalysisResult, SkippedFile};
use crate::snapshot::SnapshotDiff;

/// Everything a report shows about one run.
pub struct RunReport<'a> {
    pub path: &'a str,
    pub analysis: &'a AnalysisResult,
    pub summary: &'a AgentsRunSummary,
    /// Changes since the previous snapshot, when one was given.
    pub changes: Option<&'a SnapshotDiff>,
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    version: &'static str,
    path: &'a str,
    framework: &'a Detection,
    files_scanned: usize,
    stats: GraphStats,
    #[serde(skip_serializing_if = "no_skipped")]
    skipped: &'a [SkippedFile],
    #[serde(skip_serializing_if = "Option::is_none")]
    changes: Option<&'a SnapshotDiff>,
    summary: &'a AgentsRunSummary,
}

fn no_skipped(skipped: &&[SkippedFile]) -> bool {
    skipped.is_empty()
}

/// Write the run as pretty-printed JSON.
pub fn write_json<W: Write>(out: &mut W, report: &RunReport<'_>) -> anyhow::Result<()> {
    let json = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        path: report.path,
        framework: &report.analysis.framework,
        files_scanned: report.analysis.total_files(),
        stats: report.analysis.graph.stats(),
        skipped: &report.analysis.skipped,
        changes: report.changes,
        summary: report.summary,
    };
    serde_json::to_writer_pretty(&mut *out, &json)?;
    writeln!(out)?;
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write the run in pretty (human-readable) format.
pub fn write_pretty<W: Write>(out: &mut W, report: &RunReport<'_>) -> anyhow::Result<()> {
    let analysis = report.analysis;
    let stats = analysis.graph.stats();

    writeln!(out)?;
    writeln!(out, "  {} v{}", "archlens".cyan().bold(), env!("CARGO_PKG_VERSION"))?;
    writeln!(out)?;
    writeln!(out, "  {}{}", "Project:   ".dimmed(), report.path)?;
    writeln!(
        out,
        "  {}{} ({}% confidence)",
        "Framework: ".dimmed(),
        analysis.framework.framework,
        analysis.framework.confidence
    )?;
    writeln!(
        out,
        "  {}{} files, {} modules, {} edges, {} entities",
        "Graph:     ".dimmed(),
        analysis.total_files(),
        stats.modules,
        stats.edges,
        stats.entities
    )?;
    writeln!(
        out,
        "  {}{} pages, {} components, {} routes, {} libraries",
        "           ".dimmed(),
        stats.pages,
        stats.components,
        stats.routes,
        stats.libraries
    )?;
    writeln!(out)?;

    if !analysis.skipped.is_empty() {
        write_skipped_files(out, &analysis.skipped)?;
        writeln!(out)?;
    }

    if let Some(changes) = report.changes {
        write_changes(out, changes)?;
        writeln!(out)?;
    }

    for result in &report.summary.results {
        write_agent_result(out, result)?;
    }
    writeln!(out)?;

    write_final_status(out, report.summary)?;
    writeln!(out)?;
    Ok(())
}

fn write_skipped_files<W: Write>(out: &mut W, skipped: &[SkippedFile]) -> anyhow::Result<()> {
    writeln!(out, "  {} ({}):", "Skipped files".yellow(), skipped.len())?;
    for file in skipped {
        writeln!(out, "    {}  {}", file.path.blue(), file.reason.dimmed())?;
    }
    Ok(())
}

fn write_changes<W: Write>(out: &mut W, changes: &SnapshotDiff) -> anyhow::Result<()> {
    writeln!(
        out,
        "  {}  {} added, {} removed, {} modified, {} unchanged",
        "Since last run:".bold(),
        changes.added.len(),
        changes.removed.len(),
        changes.modified.len(),
        changes.unchanged.len()
    )?;
    Ok(())
}

fn write_agent_result<W: Write>(out: &mut W, result: &AgentResult) -> anyhow::Result<()> {
    if result.skipped {
        writeln!(
            out,
            "  {} {:<22} {}",
            "-".dimmed(),
            result.agent_id.dimmed(),
            format!("skipped: {}", result.skip_reason.as_deref().unwrap_or("")).dimmed()
        )?;
        return Ok(());
    }

    let mark = if result.findings.iter().any(|f| f.severity == Severity::Error) {
        "✗".red()
    } else {
        "✓".green()
    };
    writeln!(
        out,
        "  {} {:<22} {} ({} ms)",
        mark,
        result.agent_id.bold(),
        plural(result.findings.len(), "finding"),
        result.duration_ms
    )?;
    for finding in &result.findings {
        write_finding(out, finding)?;
    }
    Ok(())
}

fn write_finding<W: Write>(out: &mut W, finding: &Finding) -> anyhow::Result<()> {
    write!(out, "    {} ", severity_tag(finding.severity))?;
    write!(out, "{}", finding.title)?;
    if let Some(file) = &finding.file {
        write!(out, "  {}", file.blue())?;
    }
    writeln!(out)?;

    // Message and suggestion on following lines, indented
    writeln!(out, "            {}", finding.message)?;
    if let Some(suggestion) = &finding.suggestion {
        writeln!(out, "            {}", format!("→ {suggestion}").dimmed())?;
    }
    Ok(())
}

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => "ERROR".red(),
        Severity::Warning => "WARN ".yellow(),
        Severity::Info => "INFO ".blue(),
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn write_final_status<W: Write>(out: &mut W, summary: &AgentsRunSummary) -> anyhow::Result<()> {
    write!(
        out,
        "  {}  ",
        format!(
            "{} ran, {} skipped, {} ms",
            summary.agents_ran, summary.agents_skipped, summary.total_duration_ms
        )
        .dimmed()
    )?;
    write!(
        out,
        "{} errors  {} warnings  {} infos  ",
        summary.errors.to_string().red(),
        summary.warnings.to_string().yellow(),
        summary.infos.to_string().blue()
    )?;
    if summary.has_errors() {
        writeln!(out, "{}", "FAILED".red())?;
    } else {
        writeln!(out, "{}", "PASSED".green())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Tier;
    use crate::framework::Framework;
    use crate::graph::ProjectGraph;

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            graph: ProjectGraph::default(),
            framework: Detection {
                framework: Framework::NextjsApp,
                confidence: 70,
                signals: vec![],
            },
            files: vec!["app/page.tsx".to_string()],
            skipped: vec![],
            duration_ms: 3,
        }
    }

    fn summary() -> AgentsRunSummary {
        let finding = Finding::new(
            "circular-deps",
            Severity::Error,
            "Circular dependency (2 files)",
            "Import cycle: a → b → a",
        )
        .in_file("a.ts");
        AgentsRunSummary::from_results(
            vec![AgentResult {
                agent_id: "circular-deps".to_string(),
                tier: Tier::Free,
                findings: vec![finding],
                duration_ms: 1,
                skipped: false,
                skip_reason: None,
            }],
            2,
        )
    }

    #[test]
    fn test_json_summary_keys() {
        let analysis = analysis();
        let summary = summary();
        let report = RunReport {
            path: ".",
            analysis: &analysis,
            summary: &summary,
            changes: None,
        };
        let mut out = Vec::new();
        write_json(&mut out, &report).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["filesScanned"], 1);
        assert_eq!(value["framework"]["framework"], "nextjs-app");
        assert!(value.get("skipped").is_none());
        assert!(value.get("changes").is_none());

        let keys: Vec<&str> = value["summary"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let mut expected = vec![
            "results",
            "totalFindings",
            "errors",
            "warnings",
            "infos",
            "agentsRan",
            "agentsSkipped",
            "totalDurationMs",
        ];
        let mut keys = keys;
        keys.sort_unstable();
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(value["summary"]["errors"], 1);
    }

    #[test]
    fn test_pretty_mentions_findings() {
        colored::control::set_override(false);
        let analysis = analysis();
        let summary = summary();
        let changes = SnapshotDiff {
            added: vec!["new.ts".to_string()],
            ..SnapshotDiff::default()
        };
        let report = RunReport {
            path: "web",
            analysis: &analysis,
            summary: &summary,
            changes: Some(&changes),
        };
        let mut out = Vec::new();
        write_pretty(&mut out, &report).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Framework: nextjs-app (70% confidence)"));
        assert!(text.contains("1 added, 0 removed"));
        assert!(text.contains("Circular dependency (2 files)  a.ts"));
        assert!(text.contains("Import cycle: a → b → a"));
        assert!(text.contains("FAILED"));
    }
}
