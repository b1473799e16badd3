//! Core types for agent results.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::graph::ProjectGraph;

/// Severity levels for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Agent availability tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Free => f.pad("free"),
            Tier::Pro => f.pad("pro"),
        }
    }
}

/// A single reported issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub agent_id: String,
    pub severity: Severity,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    pub fn new(
        agent_id: &str,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            severity,
            title: title.into(),
            file: None,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Key for order-insensitive comparison of finding sets.
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.agent_id,
            self.file.as_deref().unwrap_or(""),
            self.title,
            self.message
        )
    }
}

/// Signature shared by every agent.
pub type AgentFn = fn(&ProjectGraph, &Config) -> anyhow::Result<Vec<Finding>>;

/// One analysis rule. Agents are plain data; the registry is a slice of them.
#[derive(Clone, Copy)]
pub struct Agent {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub tier: Tier,
    pub run: AgentFn,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("tier", &self.tier)
            .finish()
    }
}

/// Outcome of one agent in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub agent_id: String,
    pub tier: Tier,
    pub findings: Vec<Finding>,
    pub duration_ms: u64,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl AgentResult {
    pub fn skipped(agent: &Agent, reason: impl Into<String>) -> Self {
        Self {
            agent_id: agent.id.to_string(),
            tier: agent.tier,
            findings: Vec::new(),
            duration_ms: 0,
            skipped: true,
            skip_reason: Some(reason.into()),
        }
    }
}

/// Aggregate of a whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsRunSummary {
    pub results: Vec<AgentResult>,
    pub total_findings: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub agents_ran: usize,
    pub agents_skipped: usize,
    pub total_duration_ms: u64,
}

impl AgentsRunSummary {
    /// Compute totals once every result is in.
    pub fn from_results(results: Vec<AgentResult>, total_duration_ms: u64) -> Self {
        let count = |severity: Severity| {
            results
                .iter()
                .flat_map(|r| &r.findings)
                .filter(|f| f.severity == severity)
                .count()
        };
        let errors = count(Severity::Error);
        let warnings = count(Severity::Warning);
        let infos = count(Severity::Info);
        let agents_skipped = results.iter().filter(|r| r.skipped).count();
        Self {
            total_findings: errors + warnings + infos,
            errors,
            warnings,
            infos,
            agents_ran: results.len() - agents_skipped,
            agents_skipped,
            total_duration_ms,
            results,
        }
    }

    /// Whether a CI gate should fail.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.results.iter().flat_map(|r| &r.findings)
    }
}
