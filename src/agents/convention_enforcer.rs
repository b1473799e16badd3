//! Naming and consistency conventions.

use std::collections::BTreeMap;

use crate::analysis::patterns::is_hook_name;
use crate::analysis::{file_stem, ModuleKind};
use crate::config::Config;
use crate::graph::{ProjectGraph, NO_AUTH};

use super::types::{Agent, Finding, Severity, Tier};

pub const AGENT: Agent = Agent {
    id: "convention-enforcer",
    name: "Convention Enforcer",
    description: "Checks hook file naming, route segment casing, barrel files and auth consistency",
    tier: Tier::Pro,
    run,
};

/// Directory segments owned by a file-system router.
const ROUTING_SEGMENTS: &[&str] = &["app", "pages", "routes", "api"];

/// `use-cart-items` → `useCartItems`.
pub fn kebab_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn run(graph: &ProjectGraph, config: &Config) -> anyhow::Result<Vec<Finding>> {
    let mut findings = Vec::new();
    hook_names(graph, &mut findings);
    auth_consistency(graph, &mut findings);
    route_casing(graph, &mut findings);
    missing_barrels(graph, config.agents.thresholds.barrel_min_files, &mut findings);
    Ok(findings)
}

fn hook_names(graph: &ProjectGraph, findings: &mut Vec<Finding>) {
    for node in graph.nodes.values() {
        if !node.roles.contains(&ModuleKind::Hook) {
            continue;
        }
        let stem = file_stem(&node.id);
        if stem == "index" {
            continue;
        }
        let hooks: Vec<&str> = node
            .exports
            .iter()
            .map(|e| e.name.as_str())
            .filter(|name| is_hook_name(name))
            .collect();
        let Some(first) = hooks.first() else {
            continue;
        };
        let expected = kebab_to_camel(stem);
        if hooks.iter().any(|h| *h == stem || *h == expected) {
            continue;
        }
        findings.push(
            Finding::new(
                AGENT.id,
                Severity::Info,
                "Hook naming mismatch",
                format!("File `{stem}` exports hook `{first}`"),
            )
            .in_file(&node.id)
            .suggest(format!("Rename the file to `{first}` or rename the hook")),
        );
    }
}

fn auth_consistency(graph: &ProjectGraph, findings: &mut Vec<Finding>) {
    let mut patterns: BTreeMap<&str, usize> = BTreeMap::new();
    for route in graph.routes.iter().filter(|r| r.auth != NO_AUTH) {
        *patterns.entry(route.auth.as_str()).or_default() += 1;
    }
    if patterns.len() > 1 {
        let summary = patterns
            .iter()
            .map(|(pattern, count)| format!("{pattern} ({count} routes)"))
            .collect::<Vec<_>>()
            .join(", ");
        findings.push(
            Finding::new(
                AGENT.id,
                Severity::Warning,
                "Inconsistent auth patterns",
                format!("Multiple auth patterns detected: {summary}"),
            )
            .suggest("Standardize on a single auth pattern across all route handlers"),
        );
    }
}

fn route_casing(graph: &ProjectGraph, findings: &mut Vec<Finding>) {
    let routes = graph
        .routes
        .iter()
        .map(|r| (r.file.as_str(), r.route_path.as_str()))
        .chain(graph.pages.iter().map(|p| (p.file.as_str(), p.route_path.as_str())));
    for (file, route_path) in routes {
        let offending = route_path
            .split('/')
            .filter(|s| !s.is_empty() && !s.starts_with('[') && !s.starts_with('$'))
            .find(|s| *s != s.to_lowercase());
        if let Some(segment) = offending {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Info,
                    "Non-lowercase route segment",
                    format!("Route segment `{segment}` in `{route_path}` is not lowercase"),
                )
                .in_file(file)
                .suggest("Use kebab-case for route segments"),
            );
        }
    }
}

fn missing_barrels(graph: &ProjectGraph, min_files: usize, findings: &mut Vec<Finding>) {
    let mut by_dir: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for id in graph.nodes.keys() {
        let dir = id.rsplit_once('/').map_or("", |(dir, _)| dir);
        by_dir.entry(dir).or_default().push(id);
    }

    for (dir, files) in by_dir {
        if dir.is_empty()
            || files.len() < min_files
            || dir.split('/').any(|s| ROUTING_SEGMENTS.contains(&s))
        {
            continue;
        }
        if files.iter().any(|f| file_stem(f) == "index") {
            continue;
        }
        findings.push(
            Finding::new(
                AGENT.id,
                Severity::Info,
                "Missing barrel export",
                format!("Directory has {} files but no index barrel", files.len()),
            )
            .in_file(dir)
            .suggest("Add an index.ts that re-exports the public API"),
        );
    }
}
