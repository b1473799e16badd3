//! Orphan modules and unused exports.

use std::collections::HashSet;

use crate::analysis::{file_stem, ExportKind, ModuleKind};
use crate::config::Config;
use crate::graph::{Module, ProjectGraph};

use super::types::{Agent, Finding, Severity, Tier};

pub const AGENT: Agent = Agent {
    id: "dead-code",
    name: "Dead Code",
    description: "Finds modules nothing imports and exports nothing uses",
    tier: Tier::Free,
    run,
};

/// File stems frameworks load by convention rather than by import.
const RESERVED_STEMS: &[&str] = &[
    "layout",
    "loading",
    "error",
    "global-error",
    "not-found",
    "template",
    "default",
    "route",
    "middleware",
    "instrumentation",
    "_app",
    "_document",
    "_error",
    "404",
    "500",
    "App",
    "app",
    "main",
];

fn is_entry_point(node: &Module) -> bool {
    let stem = file_stem(&node.id);
    node.roles.contains(&ModuleKind::Page)
        || node.roles.contains(&ModuleKind::RouteHandler)
        || RESERVED_STEMS.contains(&stem)
        || stem == "index"
        || stem.contains("config")
        || node.id.ends_with(".d.ts")
}

fn run(graph: &ProjectGraph, _config: &Config) -> anyhow::Result<Vec<Finding>> {
    let mut findings = Vec::new();

    for node in graph.nodes.values() {
        if !graph.importers(&node.id).is_empty() || is_entry_point(node) {
            continue;
        }
        let name = &node.metadata.name;
        let finding = match node.kind {
            ModuleKind::Component => Finding::new(
                AGENT.id,
                Severity::Warning,
                "Orphan component",
                format!("Component `{name}` is never imported or rendered by any other file"),
            )
            .suggest("Remove the file or restore the import"),
            ModuleKind::Hook => Finding::new(
                AGENT.id,
                Severity::Warning,
                "Orphan hook",
                format!("Hook `{name}` is never imported by any other file"),
            )
            .suggest("Remove the file or restore the import"),
            _ => Finding::new(
                AGENT.id,
                Severity::Warning,
                "Orphan lib file",
                format!(
                    "Lib file has {} export(s) but is never imported",
                    node.exports.len()
                ),
            )
            .suggest("Remove the file or restore imports"),
        };
        findings.push(finding.in_file(&node.id));
    }

    // Names imported anywhere, plus modules reachable through a namespace.
    let mut imported: HashSet<&str> = HashSet::new();
    let mut namespace_targets: HashSet<&str> = HashSet::new();
    for node in graph.nodes.values() {
        for import in &node.imports {
            if import.is_namespace() {
                if let Some(target) = &import.resolved {
                    namespace_targets.insert(target);
                }
            }
            imported.extend(import.specifiers.iter().map(|s| {
                // `a as b` imports `a`.
                s.split(" as ").next().unwrap_or(s).trim()
            }));
        }
    }

    for node in graph.nodes.values() {
        if graph.importers(&node.id).is_empty()
            || node.roles.contains(&ModuleKind::Page)
            || node.roles.contains(&ModuleKind::RouteHandler)
            || namespace_targets.contains(node.id.as_str())
        {
            continue;
        }
        for export in &node.exports {
            if export.kind == ExportKind::Default || export.is_type_only {
                continue;
            }
            if imported.contains(export.name.as_str()) {
                continue;
            }
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Info,
                    "Unused export",
                    format!(
                        "Export `{}` ({}) is never imported by any file in the project",
                        export.name, export.kind
                    ),
                )
                .in_file(&node.id)
                .suggest("Remove the export or mark it as internal"),
            );
        }
    }

    Ok(findings)
}
