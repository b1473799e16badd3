//! Import cycle detection.
//!
//! Three-color depth-first search over runtime import edges, driven by an
//! explicit stack so deep graphs cannot exhaust the call stack. Type-only
//! imports are erased at compile time and never form a cycle.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::Config;
use crate::graph::ProjectGraph;

use super::types::{Agent, Finding, Severity, Tier};

pub const AGENT: Agent = Agent {
    id: "circular-deps",
    name: "Circular Dependencies",
    description: "Detects import cycles with a three-color depth-first search",
    tier: Tier::Free,
    run,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Every distinct cycle, each closed (first id repeated at the end).
pub fn find_cycles(graph: &ProjectGraph) -> Vec<Vec<String>> {
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for edge in graph.edges.iter().filter(|e| e.kind.is_runtime()) {
        adjacency
            .entry(edge.from.as_str())
            .or_default()
            .insert(edge.to.as_str());
    }
    let adjacency: BTreeMap<&str, Vec<&str>> = adjacency
        .into_iter()
        .map(|(from, to)| (from, to.into_iter().collect()))
        .collect();

    let mut color: HashMap<&str, Color> = graph
        .nodes
        .keys()
        .map(|id| (id.as_str(), Color::White))
        .collect();
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut reported: HashSet<String> = HashSet::new();
    let mut cycles = Vec::new();

    for root in graph.nodes.keys().map(String::as_str) {
        if color.get(root) != Some(&Color::White) {
            continue;
        }
        parent.clear();
        color.insert(root, Color::Gray);
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];

        while let Some(&(u, next)) = stack.last() {
            let neighbors = adjacency.get(u).map(Vec::as_slice).unwrap_or(&[]);
            let Some(&v) = neighbors.get(next) else {
                color.insert(u, Color::Black);
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            match color.get(v).copied() {
                Some(Color::White) => {
                    parent.insert(v, u);
                    color.insert(v, Color::Gray);
                    stack.push((v, 0));
                }
                Some(Color::Gray) => {
                    let cycle = reconstruct(&parent, u, v);
                    let mut members: Vec<&str> = cycle[..cycle.len() - 1]
                        .iter()
                        .map(String::as_str)
                        .collect();
                    members.sort_unstable();
                    if reported.insert(members.join("|")) {
                        cycles.push(cycle);
                    }
                }
                // Finished, or not a project module.
                Some(Color::Black) | None => {}
            }
        }
    }
    cycles
}

/// Walk parent pointers from `u` back to the gray node `v`.
fn reconstruct(parent: &HashMap<&str, &str>, u: &str, v: &str) -> Vec<String> {
    let mut cycle = vec![v.to_string()];
    let mut current = u;
    while current != v {
        cycle.push(current.to_string());
        match parent.get(current) {
            Some(p) => current = p,
            None => break,
        }
    }
    cycle.push(v.to_string());
    cycle.reverse();
    cycle
}

fn run(graph: &ProjectGraph, _config: &Config) -> anyhow::Result<Vec<Finding>> {
    let findings = find_cycles(graph)
        .into_iter()
        .map(|cycle| {
            let len = cycle.len() - 1;
            let short = len <= 2;
            let finding = Finding::new(
                AGENT.id,
                if short { Severity::Error } else { Severity::Warning },
                format!("Circular dependency ({len} files)"),
                format!("Import cycle: {}", cycle.join(" → ")),
            )
            .in_file(&cycle[0]);
            if short {
                finding.suggest(
                    "Break the cycle by extracting shared types or utils into a separate file",
                )
            } else {
                finding.suggest(
                    "Introduce an interface or move the shared piece into its own module to break the chain",
                )
            }
        })
        .collect();
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ModuleKind;
    use crate::agents::test_support::{graph_of, import_of, TestModule};

    fn lib(path: &str, imports: &[&str]) -> TestModule {
        imports.iter().fold(
            TestModule::new(path, ModuleKind::Library),
            |m, target| m.importing(import_of(target, &["x"])),
        )
    }

    #[test]
    fn test_three_cycle_is_warning() {
        let graph = graph_of(vec![
            lib("src/a.ts", &["./b"]),
            lib("src/b.ts", &["./c"]),
            lib("src/c.ts", &["./a"]),
        ]);
        let findings = run(&graph, &Config::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].title, "Circular dependency (3 files)");
        assert_eq!(
            findings[0].message,
            "Import cycle: src/a.ts → src/b.ts → src/c.ts → src/a.ts"
        );
    }

    #[test]
    fn test_two_cycle_is_error_and_deduplicated() {
        let graph = graph_of(vec![
            lib("src/a.ts", &["./b", "./b"]),
            lib("src/b.ts", &["./a"]),
        ]);
        let findings = run(&graph, &Config::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].file.as_deref(), Some("src/a.ts"));
    }

    #[test]
    fn test_acyclic_graph() {
        let graph = graph_of(vec![
            lib("src/a.ts", &["./b"]),
            lib("src/b.ts", &["./c"]),
            lib("src/c.ts", &[]),
        ]);
        assert!(find_cycles(&graph).is_empty());
    }

    #[test]
    fn test_type_only_cycle_ignored() {
        let mut back = import_of("./a", &["A"]);
        back.is_type_only = true;
        let graph = graph_of(vec![
            lib("src/a.ts", &["./b"]),
            TestModule::new("src/b.ts", ModuleKind::Library).importing(back),
        ]);
        assert!(find_cycles(&graph).is_empty());
    }

    #[test]
    fn test_separate_cycles_reported_once_each() {
        let graph = graph_of(vec![
            lib("src/a.ts", &["./b"]),
            lib("src/b.ts", &["./a", "./c"]),
            lib("src/c.ts", &["./d"]),
            lib("src/d.ts", &["./e"]),
            lib("src/e.ts", &["./c"]),
        ]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], vec!["src/a.ts", "src/b.ts", "src/a.ts"]);
        assert_eq!(
            cycles[1],
            vec!["src/c.ts", "src/d.ts", "src/e.ts", "src/c.ts"]
        );
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let modules: Vec<TestModule> = (0..5000)
            .map(|i| lib(&format!("src/m{i}.ts"), &[format!("./m{}", i + 1).as_str()]))
            .collect();
        let graph = graph_of(modules);
        assert!(find_cycles(&graph).is_empty());
    }
}
