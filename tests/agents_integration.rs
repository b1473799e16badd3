//! Integration tests for the agent registry and runner.
//!
//! Projects are analyzed end to end, then the registry (or a single agent)
//! runs over the resulting graph.

use std::fs;
use std::path::{Path, PathBuf};

use archlens::agents::license::signature;
use archlens::agents::{
    circular_deps, dead_code, run_agents, run_registry, schema_drift, security_scanner,
    validate_license, Agent, AgentsRunSummary, Finding, RunOptions, Severity, Tier,
};
use archlens::config::Config;
use archlens::graph::ProjectGraph;
use archlens::pipeline::analyze_project;
use tempfile::TempDir;

fn fixture_graph() -> ProjectGraph {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("nextjs-app");
    analyze_project(&root, &Config::default())
        .expect("fixture should analyze")
        .graph
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (rel, body) in files {
        let path = temp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }
    temp
}

fn graph_of(root: &Path) -> ProjectGraph {
    analyze_project(root, &Config::default()).unwrap().graph
}

fn pro_license() -> String {
    format!("AL-PRO-acme-{}", signature("acme"))
}

/// Run one agent with a valid license.
fn run_one(agent: Agent, graph: &ProjectGraph) -> Vec<Finding> {
    let license = validate_license(Some(&pro_license()));
    let summary = run_registry(&[agent], graph, &Config::default(), &RunOptions::default(), &license);
    summary.results.into_iter().flat_map(|r| r.findings).collect()
}

fn titled<'a>(summary: &'a AgentsRunSummary, title: &str) -> Vec<&'a Finding> {
    summary.findings().filter(|f| f.title == title).collect()
}

#[test]
fn test_free_run_on_fixture() {
    let graph = fixture_graph();
    let summary = run_agents(&graph, &Config::default(), &RunOptions::default());

    assert_eq!(summary.agents_ran, 3);
    assert_eq!(summary.agents_skipped, 5);
    for result in summary.results.iter().filter(|r| r.tier == Tier::Pro) {
        assert_eq!(
            result.skip_reason.as_deref(),
            Some("PRO license required (No license key provided)")
        );
    }

    let orphans: Vec<&str> = summary
        .findings()
        .filter(|f| f.title.starts_with("Orphan"))
        .filter_map(|f| f.file.as_deref())
        .collect();
    assert_eq!(orphans, vec!["components/LegacyBanner.tsx", "lib/unused-helper.ts"]);

    let cycles = titled(&summary, "Circular dependency (2 files)");
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].severity, Severity::Error);
    assert!(cycles[0].message.contains("lib/format.ts"));
    assert!(cycles[0].message.contains("lib/slug.ts"));

    assert!(summary.has_errors(), "a 2-file cycle fails the CI gate");
}

#[test]
fn test_pro_run_on_fixture() {
    let graph = fixture_graph();
    let mut config = Config::default();
    config.agents.license = Some(pro_license());
    let summary = run_agents(&graph, &config, &RunOptions::default());

    assert_eq!(summary.agents_ran, 8);
    assert_eq!(summary.agents_skipped, 0);

    let unauthenticated = titled(&summary, "Unauthenticated data mutation");
    assert_eq!(unauthenticated.len(), 1, "the webhook route is exempt");
    assert_eq!(unauthenticated[0].file.as_deref(), Some("app/api/admin/posts/route.ts"));
    assert!(unauthenticated[0].message.contains("[post]"));

    let leaks = titled(&summary, "Server env var in client component");
    assert_eq!(leaks.len(), 1);
    assert!(leaks[0].message.contains("STRIPE_SECRET_KEY"));

    let unused = titled(&summary, "Unused schema entity");
    assert_eq!(unused.len(), 1, "Comment is reachable through Post, Session is framework-owned");
    assert!(unused[0].message.contains("`AuditLog`"));
    assert!(titled(&summary, "Entity used but not in schema").is_empty());

    assert_eq!(titled(&summary, "Unnecessary client component").len(), 1);
    assert!(titled(&summary, "Inconsistent auth patterns").is_empty());
}

#[test]
fn test_run_options_record_skips() {
    let graph = fixture_graph();
    let options = RunOptions {
        only: vec!["dead-code".to_string(), "schema-drift".to_string()],
        exclude: vec!["schema-drift".to_string()],
        free_only: false,
    };
    let summary = run_agents(&graph, &Config::default(), &options);
    assert_eq!(summary.results.len(), 8);
    assert_eq!(summary.agents_ran, 1);

    let reason = |id: &str| {
        summary
            .results
            .iter()
            .find(|r| r.agent_id == id)
            .and_then(|r| r.skip_reason.clone())
    };
    assert_eq!(reason("dead-code"), None);
    assert_eq!(reason("circular-deps").as_deref(), Some("not selected"));
    assert_eq!(reason("schema-drift").as_deref(), Some("excluded by id"));
}

#[test]
fn test_agents_disabled_in_config() {
    let graph = fixture_graph();
    let mut config = Config::default();
    config.agents.enabled = false;
    let summary = run_agents(&graph, &config, &RunOptions::default());
    assert_eq!(summary.agents_ran, 0);
    assert_eq!(summary.total_findings, 0);
    assert!(summary
        .results
        .iter()
        .all(|r| r.skip_reason.as_deref() == Some("agents disabled in config")));
}

#[test]
fn test_three_file_cycle_is_one_warning() {
    let temp = project(&[
        ("lib/a.ts", "import { b } from './b';\nexport const a = () => b;\n"),
        ("lib/b.ts", "import { c } from './c';\nexport const b = () => c;\n"),
        ("lib/c.ts", "import { a } from './a';\nexport const c = () => a;\n"),
    ]);
    let findings = run_one(circular_deps::AGENT, &graph_of(temp.path()));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].title, "Circular dependency (3 files)");
    assert_eq!(findings[0].severity, Severity::Warning);
}

#[test]
fn test_two_file_cycle_is_one_error() {
    let temp = project(&[
        ("lib/a.ts", "import { b } from './b';\nexport const a = () => b;\n"),
        ("lib/b.ts", "import { a } from './a';\nexport const b = () => a;\n"),
    ]);
    let findings = run_one(circular_deps::AGENT, &graph_of(temp.path()));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Error);
}

#[test]
fn test_acyclic_chain_has_no_cycles() {
    let temp = project(&[
        ("lib/a.ts", "import { b } from './b';\nexport const a = () => b;\n"),
        ("lib/b.ts", "import { c } from './c';\nexport const b = () => c;\n"),
        ("lib/c.ts", "export const c = 1;\n"),
    ]);
    assert!(run_one(circular_deps::AGENT, &graph_of(temp.path())).is_empty());
}

#[test]
fn test_type_only_cycle_is_ignored() {
    let temp = project(&[
        ("lib/a.ts", "import type { B } from './b';\nexport type A = { b: B };\n"),
        ("lib/b.ts", "import type { A } from './a';\nexport type B = { a: A };\n"),
    ]);
    assert!(run_one(circular_deps::AGENT, &graph_of(temp.path())).is_empty());
}

const MUTATING_ROUTE: &str = "import { prisma } from '../../../../lib/db';\n\
export async function POST(req: Request) {\n\
  const data = await req.json();\n\
  await prisma.order.create({ data });\n\
  return Response.json({ ok: true });\n\
}\n";

#[test]
fn test_security_exclusion_by_route_path() {
    let db = ("lib/db.ts", "export const prisma = {} as any;\n");

    let temp = project(&[db, ("app/api/webhook/x/route.ts", MUTATING_ROUTE)]);
    let findings = run_one(security_scanner::AGENT, &graph_of(temp.path()));
    assert!(findings.iter().all(|f| f.title != "Unauthenticated data mutation"));

    let temp = project(&[db, ("app/api/admin/x/route.ts", MUTATING_ROUTE)]);
    let findings: Vec<Finding> = run_one(security_scanner::AGENT, &graph_of(temp.path()))
        .into_iter()
        .filter(|f| f.title == "Unauthenticated data mutation")
        .collect();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Error);
    assert!(findings[0].message.contains("[order]"));
}

fn unauthenticated_files(root: &Path) -> Vec<String> {
    run_one(security_scanner::AGENT, &graph_of(root))
        .into_iter()
        .filter(|f| f.title == "Unauthenticated data mutation")
        .filter_map(|f| f.file)
        .collect()
}

#[test]
fn test_allow_list_matches_inside_segments() {
    let temp = project(&[
        ("lib/db.ts", "export const prisma = {} as any;\n"),
        ("app/api/oauth/callback/route.ts", MUTATING_ROUTE),
        ("app/api/nextauth/session/route.ts", MUTATING_ROUTE),
        ("app/api/orders/sync/route.ts", MUTATING_ROUTE),
    ]);
    assert_eq!(unauthenticated_files(temp.path()), vec!["app/api/orders/sync/route.ts"]);
}

#[test]
fn test_mutating_method_boundary() {
    let temp = project(&[
        ("lib/db.ts", "export const prisma = {} as any;\n"),
        (
            "pages/api/users.ts",
            "import { prisma } from '../../lib/db';\n\
export default async function handler(req, res) {\n\
  res.json(await prisma.user.findMany());\n\
}\n",
        ),
        (
            "pages/api/posts.ts",
            "import { prisma } from '../../lib/db';\n\
export default async function handler(req, res) {\n\
  if (req.method === 'GET') {\n\
    return res.json(await prisma.post.findMany());\n\
  }\n\
  res.status(405).end();\n\
}\n",
        ),
        (
            "pages/api/orders.ts",
            "import { prisma } from '../../lib/db';\n\
export default async function handler(req, res) {\n\
  if (req.method === 'POST') {\n\
    return res.json(await prisma.order.create({ data: req.body }));\n\
  }\n\
  res.json(await prisma.order.findMany());\n\
}\n",
        ),
    ]);

    let graph = graph_of(temp.path());
    let methods = |file: &str| {
        graph
            .routes
            .iter()
            .find(|r| r.file == file)
            .map(|r| r.methods.clone())
            .unwrap_or_default()
    };
    assert_eq!(methods("pages/api/users.ts"), vec!["ALL"]);
    assert_eq!(methods("pages/api/posts.ts"), vec!["GET"]);
    assert_eq!(methods("pages/api/orders.ts"), vec!["POST"]);

    assert_eq!(
        unauthenticated_files(temp.path()),
        vec!["pages/api/orders.ts"],
        "read-only and undetected-method handlers are not mutations"
    );
}

#[test]
fn test_schema_closure_through_relations() {
    let temp = project(&[
        (
            "prisma/schema.prisma",
            "model A {\n  id Int @id\n  b  B?\n}\n\nmodel B {\n  id Int @id\n  c  C?\n}\n\nmodel C {\n  id Int @id\n}\n",
        ),
        (
            "app/api/a/route.ts",
            "export async function GET() {\n  return Response.json(await prisma.a.findMany());\n}\n",
        ),
    ]);
    let findings = run_one(schema_drift::AGENT, &graph_of(temp.path()));
    assert!(findings.is_empty(), "unexpected: {findings:?}");
}

#[test]
fn test_dead_code_precision() {
    let temp = project(&[
        ("app/about/page.tsx", "export default function About() { return <p />; }\n"),
        ("lib/used.ts", "export const used = 1;\n"),
        ("lib/user.ts", "import { used } from './used';\nexport const user = used;\n"),
    ]);
    let findings = run_one(dead_code::AGENT, &graph_of(temp.path()));
    let files: Vec<&str> = findings.iter().filter_map(|f| f.file.as_deref()).collect();
    assert_eq!(files, vec!["lib/user.ts"], "only the unimported library is an orphan");
}

fn explode(_: &ProjectGraph, _: &Config) -> anyhow::Result<Vec<Finding>> {
    panic!("exploded on purpose");
}

#[test]
fn test_panicking_agent_is_isolated() {
    let exploding = Agent {
        id: "exploding",
        name: "Exploding Agent",
        description: "always panics",
        tier: Tier::Free,
        run: explode,
    };
    let graph = fixture_graph();
    let license = validate_license(None);
    let registry = [exploding, circular_deps::AGENT];
    let summary = run_registry(&registry, &graph, &Config::default(), &RunOptions::default(), &license);

    assert_eq!(summary.agents_ran, 2);
    let crashed = &summary.results[0];
    assert_eq!(crashed.findings.len(), 1);
    assert_eq!(crashed.findings[0].agent_id, "exploding");
    assert_eq!(crashed.findings[0].severity, Severity::Error);
    assert!(crashed.findings[0].message.contains("exploded on purpose"));
    assert_eq!(summary.results[1].findings.len(), 1, "the cycle is still reported");
}
