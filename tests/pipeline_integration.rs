//! Integration tests for discovery, parsing and graph building.
//!
//! These tests run the full pipeline against the Next.js fixture in
//! `testdata/nextjs-app` and against small temporary projects.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use archlens::agents::{run_agents, RunOptions};
use archlens::analysis::ModuleKind;
use archlens::config::Config;
use archlens::framework::Framework;
use archlens::graph::ProjectGraph;
use archlens::pipeline::analyze_project;
use archlens::snapshot::Snapshot;
use tempfile::TempDir;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("nextjs-app")
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

#[test]
fn test_fixture_discovery_and_skipped_files() {
    let result =
        analyze_project(&fixture_path(), &Config::default()).expect("analysis should succeed");

    assert_eq!(result.framework.framework, Framework::NextjsApp);
    assert_eq!(result.total_files(), 16, "files: {:?}", result.files);
    assert!(!result.files.iter().any(|f| f.ends_with(".prisma") || f.ends_with(".json")));

    assert_eq!(result.skipped.len(), 1, "only the broken file is skipped");
    assert_eq!(result.skipped[0].path, "lib/broken.ts");
    assert!(result.graph.module("lib/broken.ts").is_none());
    assert_eq!(result.graph.nodes.len(), 15);
}

#[test]
fn test_fixture_aliases_resolve_to_edges() {
    let result = analyze_project(&fixture_path(), &Config::default()).unwrap();
    let graph = &result.graph;

    assert_eq!(
        graph.importers("lib/db.ts"),
        [
            "app/api/admin/posts/route.ts",
            "app/api/users/route.ts",
            "app/api/webhook/stripe/route.ts",
            "app/page.tsx",
        ]
    );
    let page_deps: Vec<&str> = graph.dependencies("app/page.tsx").into_iter().collect();
    assert_eq!(
        page_deps,
        vec![
            "components/PostList.tsx",
            "components/SecretBadge.tsx",
            "lib/db.ts",
            "lib/format.ts",
        ]
    );
    assert_eq!(graph.importers("components/PostCard.tsx"), ["components/PostList.tsx"]);
    assert!(graph.importers("components/LegacyBanner.tsx").is_empty());

    // Every edge has a matching reverse entry.
    for edge in &graph.edges {
        assert!(graph.importers(&edge.to).contains(&edge.from), "missing reverse for {edge:?}");
    }
}

#[test]
fn test_fixture_role_facts() {
    let result = analyze_project(&fixture_path(), &Config::default()).unwrap();
    let graph = &result.graph;

    assert_eq!(graph.pages.len(), 1);
    let page = &graph.pages[0];
    assert_eq!(page.route_path, "/");
    assert_eq!(page.data_access[0].entity, "post");
    assert!(page.components.contains(&"PostList".to_string()));

    let routes: Vec<(&str, &str)> = graph
        .routes
        .iter()
        .map(|r| (r.route_path.as_str(), r.auth.as_str()))
        .collect();
    assert_eq!(
        routes,
        vec![
            ("/api/admin/posts", "None"),
            ("/api/users", "auth()"),
            ("/api/webhook/stripe", "None"),
        ]
    );

    let badge = graph.component("components/SecretBadge.tsx").expect("badge is a component");
    assert_eq!(badge.env_vars, vec!["STRIPE_SECRET_KEY"]);
    assert_eq!(graph.module("lib/db.ts").map(|m| m.kind), Some(ModuleKind::Library));
}

#[test]
fn test_fixture_schema_is_extracted() {
    let result = analyze_project(&fixture_path(), &Config::default()).unwrap();
    let names: Vec<&str> = result
        .graph
        .schema
        .entities
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, vec!["User", "Post", "Comment", "AuditLog", "Session"]);
    assert_eq!(result.graph.stats().entities, 5);
}

#[test]
fn test_pipeline_is_idempotent() {
    let config = Config::default();
    let first = analyze_project(&fixture_path(), &config).unwrap();
    let second = analyze_project(&fixture_path(), &config).unwrap();
    assert_eq!(first.graph, second.graph);
    assert_eq!(first.skipped, second.skipped);

    let options = RunOptions::default();
    let keys = |graph: &ProjectGraph| -> BTreeSet<String> {
        run_agents(graph, &config, &options)
            .findings()
            .map(|f| f.key())
            .collect()
    };
    assert_eq!(keys(&first.graph), keys(&second.graph));
}

#[test]
fn test_config_file_in_project_root() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "archlens.yaml", "exclude:\n  - \"legacy/**\"\ninclude_vue: false\n");
    write(temp.path(), "legacy/old.ts", "export const old = 1;\n");
    write(temp.path(), "src/App.vue", "<template><div /></template>\n");
    write(temp.path(), "src/main.ts", "export const main = 1;\n");

    let config = Config::discover(temp.path()).unwrap();
    let result = analyze_project(temp.path(), &config).unwrap();
    assert_eq!(result.files, vec!["src/main.ts"]);
}

#[test]
fn test_vue_components_join_the_graph() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "components/Shell.vue",
        "<script setup lang=\"ts\">\nimport Header from './Header.vue';\n</script>\n<template><Header /><nav-bar /></template>\n",
    );
    write(
        temp.path(),
        "components/Header.vue",
        "<script setup lang=\"ts\">\nconst title = 'x';\n</script>\n<template><h1>{{ title }}</h1></template>\n",
    );

    let result = analyze_project(temp.path(), &Config::default()).unwrap();
    assert!(result.skipped.is_empty(), "skipped: {:?}", result.skipped);
    assert_eq!(result.graph.importers("components/Header.vue"), ["components/Shell.vue"]);
}

#[test]
fn test_snapshot_tracks_changes_between_runs() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "lib/a.ts", "export const a = 1;\n");
    write(root, "lib/b.ts", "export const b = 2;\n");

    let capture = |root: &Path| {
        let result = analyze_project(root, &Config::default()).unwrap();
        let stats = result.graph.stats();
        Snapshot::capture(root, &result.files, result.framework.framework, stats).unwrap()
    };
    let before = capture(root);
    let path = root.join(".archlens/snapshot.json");
    before.save(&path).unwrap();

    write(root, "lib/a.ts", "export const a = 10;\n");
    fs::remove_file(root.join("lib/b.ts")).unwrap();
    write(root, "lib/c.ts", "export const c = 3;\n");

    let after = capture(root);
    let diff = after.diff(&Snapshot::load(&path).unwrap());
    assert_eq!(diff.added, vec!["lib/c.ts"]);
    assert_eq!(diff.removed, vec!["lib/b.ts"]);
    assert_eq!(diff.modified, vec!["lib/a.ts"]);
    assert!(diff.unchanged.is_empty());
}
