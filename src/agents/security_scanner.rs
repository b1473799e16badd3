//! Security heuristics: unauthenticated mutations, env var leaks into the
//! client bundle, and dangerous code patterns on the server side.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::analysis::{ModuleKind, RenderKind};
use crate::config::Config;
use crate::graph::{ComponentInfo, ProjectGraph};

use super::types::{Agent, Finding, Severity, Tier};

pub const AGENT: Agent = Agent {
    id: "security-scanner",
    name: "Security Scanner",
    description: "Detects unauthenticated data mutations, server env vars reaching the client and dangerous patterns",
    tier: Tier::Pro,
    run,
};

/// Route path fragments of endpoints expected to be reachable without a session.
const PUBLIC_ROUTE_MARKERS: &[&str] = &[
    "webhook", "cron", "health", "auth", "public", "register", "login",
];

fn is_public_route(route_path: &str) -> bool {
    let path = route_path.to_ascii_lowercase();
    PUBLIC_ROUTE_MARKERS.iter().any(|m| path.contains(m))
}

fn run(graph: &ProjectGraph, config: &Config) -> anyhow::Result<Vec<Finding>> {
    let mut findings = Vec::new();
    unauthenticated_mutations(graph, &mut findings);
    client_env_leaks(graph, config, &mut findings);
    dangerous_patterns(graph, &mut findings);
    Ok(findings)
}

fn unauthenticated_mutations(graph: &ProjectGraph, findings: &mut Vec<Finding>) {
    for route in &graph.routes {
        if route.entities.is_empty()
            || route.is_authenticated()
            || !route.is_mutating()
            || is_public_route(&route.route_path)
        {
            continue;
        }
        findings.push(
            Finding::new(
                AGENT.id,
                Severity::Error,
                "Unauthenticated data mutation",
                format!(
                    "Route `{}` ({}) touches [{}] without any auth check",
                    route.route_path,
                    route.methods.join(", "),
                    route.entities.join(", ")
                ),
            )
            .in_file(&route.file)
            .suggest("Add an auth() or getServerSession() guard at the top of the handler"),
        );
    }
}

fn client_env_leaks(graph: &ProjectGraph, config: &Config, findings: &mut Vec<Finding>) {
    let prefixes = config.agents.public_env_prefixes.join(", ");

    for component in graph.components.iter().filter(|c| c.render_kind == RenderKind::Client) {
        for var in component.env_vars.iter().filter(|v| !config.is_public_env(v)) {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Error,
                    "Server env var in client component",
                    format!(
                        "Client component `{}` reads `{var}`, which is not exposed to the browser",
                        component.name
                    ),
                )
                .in_file(&component.file)
                .suggest(format!(
                    "Read it in a server component or route handler, or give it a public prefix ({prefixes})"
                )),
            );
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (library, var) in reachable_library_env(graph, component) {
            if config.is_public_env(var) || !seen.insert(var) {
                continue;
            }
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Warning,
                    "Server env var reachable from client",
                    format!(
                        "Client component `{}` imports `{library}`, which reads `{var}`",
                        component.name
                    ),
                )
                .in_file(&component.file)
                .suggest("Split server-only logic into a separate module"),
            );
        }
    }
}

/// (library, env var) pairs reachable from `component` through imported
/// libraries, breadth-first.
fn reachable_library_env<'g>(
    graph: &'g ProjectGraph,
    component: &ComponentInfo,
) -> Vec<(&'g str, &'g str)> {
    let mut found = Vec::new();
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut queue: VecDeque<&str> = graph.dependencies(&component.file).into_iter().collect();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let Some(library) = graph.library(id) else {
            continue;
        };
        for var in &library.env_vars {
            found.push((library.file.as_str(), var.as_str()));
        }
        queue.extend(graph.dependencies(id));
    }
    found
}

fn dangerous_patterns(graph: &ProjectGraph, findings: &mut Vec<Finding>) {
    for node in graph.nodes.values() {
        let server_side = node.roles.contains(&ModuleKind::RouteHandler)
            || node.roles.contains(&ModuleKind::Library);
        if !server_side {
            continue;
        }
        for pattern in &node.metadata.dangerous_patterns {
            let (severity, suggestion) = match pattern.as_str() {
                "eval()" | "new Function()" => (
                    Severity::Error,
                    "Avoid evaluating strings as code; parse the input explicitly",
                ),
                "exec()" | "child_process import" => (
                    Severity::Warning,
                    "Use execFile/spawn with an argument array and never interpolate input",
                ),
                _ => (
                    Severity::Warning,
                    "Escape or sanitize HTML before injecting it",
                ),
            };
            findings.push(
                Finding::new(
                    AGENT.id,
                    severity,
                    format!("Dangerous pattern: {pattern}"),
                    format!("`{pattern}` found in {} module", node.kind),
                )
                .in_file(&node.id)
                .suggest(suggestion),
            );
        }
    }
}
