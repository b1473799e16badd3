//! AST-backed module analysis.
//!
//! This module turns one source file into a [`ParsedModule`]: imports,
//! exports, render kind, hooks, local state, outbound API calls, environment
//! variables, side effects, data access and the roles the module plays.
//! Nothing is ever executed; every fact comes from the syntax tree or from
//! pattern matching over the source text.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Source Files    │────▶│ Analyzers    │────▶│ ParsedModule  │
//! └─────────────────┘     │ (TS/TSX, Vue)│     │ (imports,     │
//!                         └──────┬───────┘     │  exports, ...)│
//!                                │             └───────────────┘
//!                         ┌──────▼───────┐
//!                         │ Resolver     │
//!                         │ (aliases,    │
//!                         │  fallbacks)  │
//!                         └──────────────┘
//! ```

mod facts;
mod languages;
pub mod patterns;
pub mod resolve;
pub mod roles;
mod traits;

pub use facts::{
    file_stem, ApiCall, DataAccess, ExportInfo, ExportKind, ImportInfo, ImportKind, ModuleKind,
    ParsedModule, RenderKind, RoleSet, StateVar,
};
pub use languages::{get_analyzer, registered_extensions, TypeScriptAnalyzer, VueAnalyzer};
pub use resolve::{AliasTable, Resolver};
pub use traits::{Grammar, ModuleAnalyzer, ParseError, ParsedFile};

/// Extension of `path` without the dot.
fn extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

/// Parse one module. `path` is the project-relative module id.
///
/// Failures are per-file and never panic; callers skip the file and continue.
pub fn parse_module(
    source: &str,
    path: &str,
    resolver: &Resolver,
) -> Result<ParsedModule, ParseError> {
    let analyzer = get_analyzer(extension(path))
        .ok_or_else(|| ParseError::UnsupportedExtension(path.to_string()))?;
    analyzer.analyze(path, source, resolver)
}
