//! Drift between the declared data schema and the entities code touches.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::Config;
use crate::graph::ProjectGraph;
use crate::schema::entity_key;

use super::types::{Agent, Finding, Severity, Tier};

pub const AGENT: Agent = Agent {
    id: "schema-drift",
    name: "Schema Drift Detector",
    description: "Finds entities used in code but missing from the schema, and schema entities nothing uses",
    tier: Tier::Pro,
    run,
};

/// Entities owned by auth libraries rather than application code.
const FRAMEWORK_ENTITIES: &[&str] = &["Account", "Session", "VerificationToken"];

/// Entity keys referenced by route handlers and pages, with the first file
/// and spelling seen for each.
fn referenced_entities(graph: &ProjectGraph) -> BTreeMap<String, (String, String)> {
    let mut referenced = BTreeMap::new();
    let route_refs = graph
        .routes
        .iter()
        .flat_map(|r| r.entities.iter().map(move |e| (e.as_str(), r.file.as_str())));
    let page_refs = graph.pages.iter().flat_map(|p| {
        p.data_access
            .iter()
            .map(move |a| (a.entity.as_str(), p.file.as_str()))
    });
    for (entity, file) in route_refs.chain(page_refs) {
        referenced
            .entry(entity_key(entity))
            .or_insert_with(|| (entity.to_string(), file.to_string()));
    }
    referenced
}

/// Expand `used` along schema relations until nothing new is added.
pub fn relation_closure(graph: &ProjectGraph, used: BTreeSet<String>) -> BTreeSet<String> {
    let mut closure = used;
    let mut pending: Vec<String> = closure.iter().cloned().collect();
    while let Some(key) = pending.pop() {
        let Some(entity) = graph.schema.entity(&key) else {
            continue;
        };
        for relation in &entity.relations {
            let target = entity_key(&relation.target);
            if closure.insert(target.clone()) {
                pending.push(target);
            }
        }
    }
    closure
}

fn run(graph: &ProjectGraph, _config: &Config) -> anyhow::Result<Vec<Finding>> {
    let mut findings = Vec::new();

    if graph.schema.is_empty() {
        findings.push(Finding::new(
            AGENT.id,
            Severity::Info,
            "No schema detected",
            "No data schema found; schema drift checks skipped",
        ));
        return Ok(findings);
    }

    let referenced = referenced_entities(graph);
    for (spelling, file) in referenced.values() {
        if graph.schema.entity(spelling).is_none() {
            findings.push(
                Finding::new(
                    AGENT.id,
                    Severity::Warning,
                    "Entity used but not in schema",
                    format!("`{spelling}` is accessed in code but no matching entity is declared in the schema"),
                )
                .in_file(file)
                .suggest("Add the entity to the schema or fix the reference"),
            );
        }
    }

    let used = relation_closure(graph, referenced.into_keys().collect());
    for entity in &graph.schema.entities {
        if used.contains(&entity_key(&entity.name))
            || FRAMEWORK_ENTITIES.contains(&entity.name.as_str())
        {
            continue;
        }
        findings.push(
            Finding::new(
                AGENT.id,
                Severity::Info,
                "Unused schema entity",
                format!(
                    "Schema entity `{}` is never referenced by a route handler or page, directly or through relations",
                    entity.name
                ),
            )
            .suggest("Remove the entity if it is no longer needed, or add code that uses it"),
        );
    }

    Ok(findings)
}
