//! Archlens - static architecture analysis for web-application codebases.
//!
//! Archlens reads a TypeScript/JavaScript (and Vue) project without running
//! it, builds a module graph annotated with per-role facts and the declared
//! data schema, then runs a registry of rule agents over the frozen graph.
//!
//! # Architecture
//!
//! The codebase uses tree-sitter for AST-based analysis:
//!
//! - `analysis`: per-file fact extraction (imports, exports, roles, facts)
//! - `schema`: data-schema extraction for the block and builder dialects
//! - `graph`: the project graph, built once and never mutated
//! - `agents`: rule agents, the registry and the fault-isolating runner
//! - `pipeline`: discovery, parallel parsing and graph building
//! - `config` / `framework`: run configuration and framework detection
//! - `report` / `snapshot`: output formatting and prior-run file hashes
//!
//! # Adding an Agent
//!
//! Write a module under `src/agents/` exposing an `AGENT` constant and add
//! it to `agents::REGISTRY`.

pub mod agents;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod framework;
pub mod graph;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod snapshot;

pub use agents::{run_agents, AgentsRunSummary, Finding, RunOptions, Severity};
pub use analysis::{parse_module, ParsedModule, Resolver};
pub use config::Config;
pub use graph::{build_graph, ProjectGraph};
pub use pipeline::{analyze_project, AnalysisResult};
