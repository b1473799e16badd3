//! The project module graph.
//!
//! A [`ProjectGraph`] is built once per run by [`build_graph`] and is never
//! mutated afterwards; agents only receive `&ProjectGraph`.

mod builder;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::analysis::{
    ApiCall, DataAccess, ExportInfo, ImportInfo, ModuleKind, RenderKind, RoleSet, StateVar,
};
use crate::schema::Schema;

pub use builder::build_graph;

/// How the source module reaches the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Import,
    TypeImport,
    ReExport,
    Dynamic,
}

impl EdgeKind {
    /// Type-only imports are erased at compile time and never load the target.
    pub fn is_runtime(&self) -> bool {
        !matches!(self, EdgeKind::TypeImport)
    }
}

/// A directed, resolved import. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadata {
    /// Display name: the component or hook name, else the file stem.
    pub name: String,
    pub line_count: usize,
    pub render_kind: RenderKind,
    pub dangerous_patterns: Vec<String>,
}

/// One node of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    /// Primary kind, the highest-precedence entry of `roles`.
    pub kind: ModuleKind,
    pub roles: RoleSet,
    pub exports: Vec<ExportInfo>,
    /// Every import as written, resolved or not.
    pub imports: Vec<ImportInfo>,
    pub metadata: ModuleMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub file: String,
    pub route_path: String,
    pub render_kind: RenderKind,
    /// First auth marker seen, or `None`.
    pub auth: String,
    pub data_access: Vec<DataAccess>,
    /// Custom elements rendered by the page.
    pub components: Vec<String>,
    pub api_calls: Vec<ApiCall>,
    pub params: Vec<String>,
    pub i18n_namespace: Option<String>,
    pub data_fetching: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    pub file: String,
    pub name: String,
    pub render_kind: RenderKind,
    pub state: Vec<StateVar>,
    pub hooks: Vec<String>,
    pub api_calls: Vec<ApiCall>,
    pub side_effects: Vec<String>,
    pub env_vars: Vec<String>,
    /// Custom child elements, in first-seen order.
    pub renders: Vec<String>,
    pub used_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHandlerInfo {
    pub file: String,
    pub route_path: String,
    pub methods: Vec<String>,
    /// First server-side auth marker seen, or `None`.
    pub auth: String,
    /// Data entities touched, as written at the call site.
    pub entities: Vec<String>,
    pub side_effects: Vec<String>,
}

impl RouteHandlerInfo {
    pub fn is_authenticated(&self) -> bool {
        self.auth != NO_AUTH
    }

    /// True when an explicit write verb is handled. The `ALL` fallback of a
    /// handler with no detectable method does not count.
    pub fn is_mutating(&self) -> bool {
        self.methods
            .iter()
            .any(|m| matches!(m.as_str(), "POST" | "PUT" | "DELETE" | "PATCH"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryInfo {
    pub file: String,
    pub exports: Vec<ExportInfo>,
    pub imports: Vec<ImportInfo>,
    pub used_by: Vec<String>,
    pub env_vars: Vec<String>,
    pub side_effects: Vec<String>,
}

/// Auth marker value for modules without any auth check.
pub const NO_AUTH: &str = "None";

/// Counts recorded alongside a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub modules: usize,
    pub edges: usize,
    pub pages: usize,
    pub components: usize,
    pub routes: usize,
    pub libraries: usize,
    pub entities: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGraph {
    pub nodes: BTreeMap<String, Module>,
    pub edges: Vec<ImportEdge>,
    /// Reverse index: target id → sorted ids of importing modules.
    pub used_by: BTreeMap<String, Vec<String>>,
    pub pages: Vec<PageInfo>,
    pub components: Vec<ComponentInfo>,
    pub routes: Vec<RouteHandlerInfo>,
    pub libraries: Vec<LibraryInfo>,
    pub schema: Schema,
}

impl ProjectGraph {
    pub fn module(&self, id: &str) -> Option<&Module> {
        self.nodes.get(id)
    }

    /// Modules importing `id`; empty when nothing does.
    pub fn importers(&self, id: &str) -> &[String] {
        self.used_by.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct ids `id` imports, sorted.
    pub fn dependencies(&self, id: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to.as_str())
            .collect()
    }

    pub fn component(&self, id: &str) -> Option<&ComponentInfo> {
        self.components.iter().find(|c| c.file == id)
    }

    pub fn library(&self, id: &str) -> Option<&LibraryInfo> {
        self.libraries.iter().find(|l| l.file == id)
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            modules: self.nodes.len(),
            edges: self.edges.len(),
            pages: self.pages.len(),
            components: self.components.len(),
            routes: self.routes.len(),
            libraries: self.libraries.len(),
            entities: self.schema.entities.len(),
        }
    }
}
