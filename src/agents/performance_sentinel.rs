//! Page weight and client-bundle heuristics.

use crate::analysis::RenderKind;
use crate::config::Config;
use crate::graph::ProjectGraph;

use super::types::{Agent, Finding, Severity, Tier};

pub const AGENT: Agent = Agent {
    id: "performance-sentinel",
    name: "Performance Sentinel",
    description: "Detects heavy pages, needless client components and API call waterfalls",
    tier: Tier::Pro,
    run,
};

fn run(graph: &ProjectGraph, config: &Config) -> anyhow::Result<Vec<Finding>> {
    let limits = &config.agents.thresholds;
    let mut findings = Vec::new();

    for page in &graph.pages {
        let imports = graph.module(&page.file).map_or(0, |m| m.imports.len());
        if imports > limits.max_page_imports {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Warning,
                    "Heavy page",
                    format!(
                        "Page `{}` has {imports} imports (threshold: {})",
                        page.route_path, limits.max_page_imports
                    ),
                )
                .in_file(&page.file)
                .suggest("Lazy-load non-critical components with dynamic() or React.lazy()"),
            );
        }

        if page.api_calls.len() > limits.max_api_calls_per_page {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Warning,
                    "API call waterfall risk",
                    format!(
                        "Page `{}` makes {} API calls (threshold: {})",
                        page.route_path,
                        page.api_calls.len(),
                        limits.max_api_calls_per_page
                    ),
                )
                .in_file(&page.file)
                .suggest("Consolidate the calls or fetch in parallel with Promise.all"),
            );
        }
    }

    for component in &graph.components {
        let uses_client_features = !component.hooks.is_empty()
            || !component.state.is_empty()
            || !component.api_calls.is_empty()
            || !component.side_effects.is_empty();
        if component.render_kind == RenderKind::Client && !uses_client_features {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Warning,
                    "Unnecessary client component",
                    format!(
                        "`{}` is a client component but uses no hooks, state, calls or side effects",
                        component.name
                    ),
                )
                .in_file(&component.file)
                .suggest("Remove \"use client\" to render it on the server"),
            );
        }

        if component.renders.len() > limits.max_component_renders {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Info,
                    "Component with many children",
                    format!(
                        "`{}` renders {} child components (threshold: {})",
                        component.name,
                        component.renders.len(),
                        limits.max_component_renders
                    ),
                )
                .in_file(&component.file)
                .suggest("Split the component or extract sub-sections"),
            );
        }
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{graph_of, import_of, TestModule};
    use crate::analysis::{ApiCall, ModuleKind};

    fn titles(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.title.as_str()).collect()
    }

    #[test]
    fn test_heavy_page_and_waterfall() {
        let mut config = Config::default();
        config.agents.thresholds.max_page_imports = 1;
        config.agents.thresholds.max_api_calls_per_page = 1;
        let page = TestModule::new("app/page.tsx", ModuleKind::Page)
            .importing(import_of("react", &["useState"]))
            .importing(import_of("next/link", &["default"]))
            .with(|m| {
                for endpoint in ["/api/a", "/api/b"] {
                    m.api_calls.push(ApiCall {
                        endpoint: endpoint.to_string(),
                        method: "GET".to_string(),
                    });
                }
            });
        let findings = run(&graph_of(vec![page]), &config).unwrap();
        assert_eq!(titles(&findings), vec!["Heavy page", "API call waterfall risk"]);
        assert_eq!(findings[0].message, "Page `/` has 2 imports (threshold: 1)");
    }

    #[test]
    fn test_unnecessary_client_component() {
        let idle = TestModule::new("components/Badge.tsx", ModuleKind::Component)
            .exporting("Badge")
            .with(|m| m.render_kind = RenderKind::Client);
        let busy = TestModule::new("components/Counter.tsx", ModuleKind::Component)
            .exporting("Counter")
            .with(|m| {
                m.render_kind = RenderKind::Client;
                m.hooks.push("useState".to_string());
            });
        let server = TestModule::new("components/Card.tsx", ModuleKind::Component).exporting("Card");
        let findings = run(&graph_of(vec![idle, busy, server]), &Config::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file.as_deref(), Some("components/Badge.tsx"));
        assert!(findings[0].message.starts_with("`Badge`"));
    }

    #[test]
    fn test_many_children() {
        let mut config = Config::default();
        config.agents.thresholds.max_component_renders = 2;
        let component = TestModule::new("components/Grid.tsx", ModuleKind::Component)
            .exporting("Grid")
            .with(|m| m.elements = vec!["A".into(), "B".into(), "C".into()]);
        let findings = run(&graph_of(vec![component]), &config).unwrap();
        assert_eq!(titles(&findings), vec!["Component with many children"]);
        assert_eq!(findings[0].severity, Severity::Info);
    }
}
