//! Analysis agents.
//!
//! Each agent is a pure function of the frozen [`ProjectGraph`] and the run
//! [`Config`], registered as plain data in [`REGISTRY`]. The runner isolates
//! faults: an agent that errors or panics yields one `error` finding and the
//! rest of the run continues.
//!
//! [`ProjectGraph`]: crate::graph::ProjectGraph
//! [`Config`]: crate::config::Config

pub mod architecture_guard;
pub mod circular_deps;
pub mod convention_enforcer;
pub mod dead_code;
pub mod impact_analyzer;
pub mod license;
pub mod performance_sentinel;
mod runner;
pub mod schema_drift;
pub mod security_scanner;
mod types;

pub use license::{validate_license, validate_license_at, LicenseInfo};
pub use runner::{panic_message, run_agents, run_registry, RunOptions};
pub use types::{Agent, AgentFn, AgentResult, AgentsRunSummary, Finding, Severity, Tier};

/// Every agent, in run order: free tier first.
pub static REGISTRY: &[Agent] = &[
    dead_code::AGENT,
    circular_deps::AGENT,
    architecture_guard::AGENT,
    security_scanner::AGENT,
    schema_drift::AGENT,
    performance_sentinel::AGENT,
    convention_enforcer::AGENT,
    impact_analyzer::AGENT,
];

pub fn get_agent(id: &str) -> Option<&'static Agent> {
    REGISTRY.iter().find(|a| a.id == id)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_and_tiers() {
        let ids: Vec<&str> = REGISTRY.iter().map(|a| a.id).collect();
        assert_eq!(
            ids,
            vec![
                "dead-code",
                "circular-deps",
                "architecture-guard",
                "security-scanner",
                "schema-drift",
                "performance-sentinel",
                "convention-enforcer",
                "impact-analyzer",
            ]
        );
        assert!(REGISTRY[..3].iter().all(|a| a.tier == Tier::Free));
        assert!(REGISTRY[3..].iter().all(|a| a.tier == Tier::Pro));
    }

    #[test]
    fn test_get_agent() {
        assert_eq!(get_agent("schema-drift").map(|a| a.name), Some("Schema Drift Detector"));
        assert!(get_agent("nope").is_none());
    }
}
