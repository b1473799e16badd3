//! Fan-in, fan-out, hub components and bridge modules.
//!
//! Degrees are counted over the edge multiset, so a module imported twice
//! by the same file counts twice.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{Config, Thresholds};
use crate::graph::{ComponentInfo, ProjectGraph};

use super::types::{Agent, Finding, Severity, Tier};

pub const AGENT: Agent = Agent {
    id: "impact-analyzer",
    name: "Impact Analyzer",
    description: "Identifies high fan-in and fan-out modules, hub components and bridge modules",
    tier: Tier::Pro,
    run,
};

/// (fan-in, fan-out) for every module with at least one edge.
pub fn degrees(graph: &ProjectGraph) -> BTreeMap<&str, (usize, usize)> {
    let mut degrees: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for edge in &graph.edges {
        degrees.entry(edge.to.as_str()).or_default().0 += 1;
        degrees.entry(edge.from.as_str()).or_default().1 += 1;
    }
    degrees
}

fn is_hub(component: &ComponentInfo, limits: &Thresholds) -> bool {
    component.used_by.len() > limits.hub_used_by && component.renders.len() > limits.hub_renders
}

fn run(graph: &ProjectGraph, config: &Config) -> anyhow::Result<Vec<Finding>> {
    let limits = &config.agents.thresholds;
    let degrees = degrees(graph);
    let mut findings = Vec::new();

    for (&id, &(fan_in, fan_out)) in &degrees {
        if fan_in > limits.max_fan_in && !id.ends_with(".d.ts") {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Info,
                    "High-impact file (fan-in)",
                    format!(
                        "{fan_in} imports target this file (threshold: {}); changes here have a wide blast radius",
                        limits.max_fan_in
                    ),
                )
                .in_file(id)
                .suggest("Test thoroughly when modifying this file"),
            );
        }
        if fan_out > limits.max_fan_out {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Info,
                    "High coupling (fan-out)",
                    format!(
                        "File has {fan_out} imports of project modules (threshold: {})",
                        limits.max_fan_out
                    ),
                )
                .in_file(id)
                .suggest("Reduce dependencies or split the file"),
            );
        }
    }

    let mut hubs: BTreeSet<&str> = BTreeSet::new();
    for component in graph.components.iter().filter(|c| is_hub(c, limits)) {
        hubs.insert(component.file.as_str());
        findings.push(
            Finding::new(
                AGENT.id,
                Severity::Warning,
                "Hub component",
                format!(
                    "`{}` is used by {} files and renders {} children",
                    component.name,
                    component.used_by.len(),
                    component.renders.len()
                ),
            )
            .in_file(&component.file)
            .suggest("Changes propagate both up and down the component tree; keep its interface stable"),
        );
    }

    for (&id, &(fan_in, fan_out)) in &degrees {
        if fan_in > limits.bridge_degree && fan_out > limits.bridge_degree && !hubs.contains(id) {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Info,
                    "Bridge file",
                    format!(
                        "File links {fan_in} dependents to {fan_out} dependencies; removing it would likely disconnect parts of the graph"
                    ),
                )
                .in_file(id)
                .suggest("Keep its responsibilities narrow and well documented"),
            );
        }
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{graph_of, import_of, TestModule};
    use crate::analysis::ModuleKind;

    fn importing_all(path: &str, kind: ModuleKind, targets: &[String]) -> TestModule {
        targets.iter().fold(TestModule::new(path, kind), |m, t| {
            m.importing(import_of(t, &["x"]))
        })
    }

    /// `center` imported by `fan_in` modules and importing `fan_out` modules.
    fn star(center: &str, kind: ModuleKind, fan_in: usize, fan_out: usize) -> Vec<TestModule> {
        let deps: Vec<String> = (0..fan_out).map(|i| format!("./dep{i}")).collect();
        let mut modules = vec![importing_all(&format!("src/{center}.ts"), kind, &deps)];
        for i in 0..fan_out {
            modules.push(TestModule::new(&format!("src/dep{i}.ts"), ModuleKind::Library));
        }
        for i in 0..fan_in {
            modules.push(importing_all(
                &format!("src/user{i}.ts"),
                ModuleKind::Library,
                &[format!("./{center}")],
            ));
        }
        modules
    }

    fn titles(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.title.as_str()).collect()
    }

    #[test]
    fn test_fan_in_and_fan_out_are_strict() {
        let config = Config::default();
        let graph = graph_of(star("core", ModuleKind::Library, 10, 15));
        assert!(run(&graph, &config).unwrap().iter().all(|f| f.title == "Bridge file"));

        let graph = graph_of(star("core", ModuleKind::Library, 11, 16));
        let findings = run(&graph, &config).unwrap();
        assert_eq!(
            titles(&findings),
            vec!["High-impact file (fan-in)", "High coupling (fan-out)", "Bridge file"]
        );
        assert!(findings.iter().all(|f| f.file.as_deref() == Some("src/core.ts")));
    }

    #[test]
    fn test_bridge_requires_both_degrees() {
        let graph = graph_of(star("mid", ModuleKind::Library, 5, 5));
        let findings = run(&graph, &Config::default()).unwrap();
        assert_eq!(titles(&findings), vec!["Bridge file"]);
        assert!(findings[0].message.contains("5 dependents to 5 dependencies"));

        let graph = graph_of(star("mid", ModuleKind::Library, 5, 4));
        assert!(run(&graph, &Config::default()).unwrap().is_empty());
    }

    #[test]
    fn test_hub_component_is_not_a_bridge() {
        let mut modules = star("Shell", ModuleKind::Component, 5, 5);
        let center = modules
            .remove(0)
            .with(|m| m.elements = (0..5).map(|i| format!("Child{i}")).collect());
        modules.push(center);
        let graph = graph_of(modules);
        let findings = run(&graph, &Config::default()).unwrap();
        assert_eq!(titles(&findings), vec!["Hub component"]);
        assert!(findings[0].message.contains("used by 5 files and renders 5 children"));
    }

    #[test]
    fn test_degrees_count_duplicates() {
        let graph = graph_of(vec![
            importing_all("src/a.ts", ModuleKind::Library, &["./b".to_string(), "./b".to_string()]),
            TestModule::new("src/b.ts", ModuleKind::Library),
        ]);
        let degrees = degrees(&graph);
        assert_eq!(degrees["src/b.ts"], (2, 0));
        assert_eq!(degrees["src/a.ts"], (0, 2));
    }
}
