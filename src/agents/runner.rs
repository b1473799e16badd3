//! Agent runner that executes the registry against a built graph.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;

use crate::config::Config;
use crate::graph::ProjectGraph;

use super::license::{validate_license, LicenseInfo};
use super::types::{Agent, AgentResult, AgentsRunSummary, Finding, Severity, Tier};
use super::REGISTRY;

/// Caller-side selection of agents.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Run only these ids; empty means all.
    pub only: Vec<String>,
    /// Never run these ids.
    pub exclude: Vec<String>,
    pub free_only: bool,
}

/// Run every registered agent.
pub fn run_agents(graph: &ProjectGraph, config: &Config, options: &RunOptions) -> AgentsRunSummary {
    let license = validate_license(config.agents.license.as_deref());
    run_registry(REGISTRY, graph, config, options, &license)
}

/// Run `registry` in order. Results keep registry order; every agent yields
/// exactly one result, skipped or not.
pub fn run_registry(
    registry: &[Agent],
    graph: &ProjectGraph,
    config: &Config,
    options: &RunOptions,
    license: &LicenseInfo,
) -> AgentsRunSummary {
    let _span = tracing::info_span!("run_agents", agents = registry.len()).entered();
    let start = Instant::now();

    if !license.valid && registry.iter().any(|a| a.tier == Tier::Pro) {
        tracing::info!(
            reason = license.message.as_deref().unwrap_or("invalid"),
            "pro agents disabled"
        );
    }

    let results: Vec<AgentResult> = registry
        .par_iter()
        .map(|agent| match skip_reason(agent, config, options, license) {
            Some(reason) => {
                tracing::debug!(agent = agent.id, %reason, "agent skipped");
                AgentResult::skipped(agent, reason)
            }
            None => execute(agent, graph, config),
        })
        .collect();

    AgentsRunSummary::from_results(results, start.elapsed().as_millis() as u64)
}

fn skip_reason(
    agent: &Agent,
    config: &Config,
    options: &RunOptions,
    license: &LicenseInfo,
) -> Option<String> {
    let listed = |ids: &[String]| ids.iter().any(|id| id == agent.id);

    if !config.agents.enabled {
        return Some("agents disabled in config".to_string());
    }
    if !options.only.is_empty() && !listed(&options.only) {
        return Some("not selected".to_string());
    }
    if options.free_only && agent.tier == Tier::Pro {
        return Some("free-only run".to_string());
    }
    if listed(&options.exclude) {
        return Some("excluded by id".to_string());
    }
    if listed(&config.agents.exclude) {
        return Some("excluded in config".to_string());
    }
    if agent.tier == Tier::Pro && !license.valid {
        let detail = license.message.as_deref().unwrap_or("invalid license");
        return Some(format!("PRO license required ({detail})"));
    }
    None
}

/// Run one agent, converting an `Err` or a panic into a single error finding.
fn execute(agent: &Agent, graph: &ProjectGraph, config: &Config) -> AgentResult {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (agent.run)(graph, config)));

    let findings = match outcome {
        Ok(Ok(findings)) => findings,
        Ok(Err(e)) => vec![crash_finding(agent, &format!("{e:#}"))],
        Err(payload) => vec![crash_finding(agent, &panic_message(payload.as_ref()))],
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    tracing::debug!(agent = agent.id, findings = findings.len(), duration_ms, "agent finished");
    AgentResult {
        agent_id: agent.id.to_string(),
        tier: agent.tier,
        findings,
        duration_ms,
        skipped: false,
        skip_reason: None,
    }
}

/// Text of a panic payload raised by `panic!` with a literal or a format string.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn crash_finding(agent: &Agent, message: &str) -> Finding {
    tracing::warn!(agent = agent.id, error = message, "agent failed");
    Finding::new(
        agent.id,
        Severity::Error,
        "Agent crashed",
        format!("{} failed: {}", agent.name, message),
    )
}
