//! Size and coupling limits for files, components and pages.

use crate::analysis::ModuleKind;
use crate::config::Config;
use crate::graph::ProjectGraph;

use super::types::{Agent, Finding, Severity, Tier};

pub const AGENT: Agent = Agent {
    id: "architecture-guard",
    name: "Architecture Guard",
    description: "Flags oversized files, god components and overly complex pages (route auth is checked by security-scanner, pro)",
    tier: Tier::Free,
    run,
};

fn run(graph: &ProjectGraph, config: &Config) -> anyhow::Result<Vec<Finding>> {
    let limits = &config.agents.thresholds;
    let mut findings = Vec::new();

    for node in graph.nodes.values() {
        let lines = node.metadata.line_count;
        if lines > limits.max_line_count {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Warning,
                    "Oversized file",
                    format!(
                        "File has {lines} lines (threshold: {})",
                        limits.max_line_count
                    ),
                )
                .in_file(&node.id)
                .suggest("Split into smaller, focused modules"),
            );
        }

        if node.roles.contains(&ModuleKind::Component) && node.imports.len() > limits.max_dependencies
        {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Warning,
                    "God component",
                    format!(
                        "Component `{}` has {} imports (threshold: {})",
                        node.metadata.name,
                        node.imports.len(),
                        limits.max_dependencies
                    ),
                )
                .in_file(&node.id)
                .suggest("Extract sub-components or use composition"),
            );
        }
    }

    for page in &graph.pages {
        if page.components.len() > limits.max_page_components {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Info,
                    "Complex page",
                    format!(
                        "Page `{}` renders {} components (threshold: {})",
                        page.route_path,
                        page.components.len(),
                        limits.max_page_components
                    ),
                )
                .in_file(&page.file)
                .suggest("Split into smaller sub-pages or extract sections"),
            );
        }
    }

    Ok(findings)
}
