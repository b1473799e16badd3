//! Fact structures extracted from a single module.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Role a module plays in the application.
///
/// Declaration order is classification precedence: when a module matches
/// several roles its primary kind is the first one listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleKind {
    Page,
    RouteHandler,
    Hook,
    Component,
    Library,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Page => "page",
            ModuleKind::RouteHandler => "route-handler",
            ModuleKind::Hook => "hook",
            ModuleKind::Component => "component",
            ModuleKind::Library => "library",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every role a module satisfies, ordered by precedence.
pub type RoleSet = BTreeSet<ModuleKind>;

/// Whether a component renders on the server or is marked for the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    #[default]
    Server,
    Client,
}

impl fmt::Display for RenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderKind::Server => write!(f, "server"),
            RenderKind::Client => write!(f, "client"),
        }
    }
}

/// How an import statement brings in its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    #[default]
    Static,
    ReExport,
    Dynamic,
}

/// A single import (or re-export) declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportInfo {
    /// The specifier exactly as written (`./Button`, `react`, `@/lib/db`).
    pub source: String,
    /// Imported names. Namespace imports are recorded as `* as name`,
    /// wildcard re-exports and dynamic imports as `*`.
    pub specifiers: Vec<String>,
    pub is_type_only: bool,
    #[serde(default)]
    pub kind: ImportKind,
    /// Project-relative module id the specifier resolves to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
}

impl ImportInfo {
    /// Relative specifiers (`./x`, `../x`) always point inside the project.
    pub fn is_relative(&self) -> bool {
        self.source.starts_with("./") || self.source.starts_with("../") || self.source == "."
    }

    /// Whether every export of the target is reachable through this import.
    pub fn is_namespace(&self) -> bool {
        self.specifiers
            .iter()
            .any(|s| s == "*" || s.starts_with("* as "))
    }
}

/// Kind of an exported binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Function,
    Class,
    Variable,
    Type,
    Interface,
    Enum,
    Default,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Function => "function",
            ExportKind::Class => "class",
            ExportKind::Variable => "variable",
            ExportKind::Type => "type",
            ExportKind::Interface => "interface",
            ExportKind::Enum => "enum",
            ExportKind::Default => "default",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single exported binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    pub name: String,
    pub kind: ExportKind,
    pub is_type_only: bool,
    /// `(a: A, b: B) => R` for exported functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// A local state variable (`const [count, setCount] = useState(0)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
}

/// An outbound request to one of the project's own API routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiCall {
    pub endpoint: String,
    pub method: String,
}

/// An ORM-style data access (`prisma.user.findMany`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataAccess {
    /// Entity name as written at the call site (`user`).
    pub entity: String,
    /// Operation name (`findMany`).
    pub operation: String,
}

impl DataAccess {
    /// Side-effect marker for this access (`DB:findMany`).
    pub fn marker(&self) -> String {
        format!("DB:{}", self.operation)
    }
}

/// Everything extracted from one source file. Never produced by executing it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedModule {
    /// Project-relative path with `/` separators; the module id.
    pub path: String,
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
    pub render_kind: RenderKind,
    pub roles: RoleSet,
    pub hooks: Vec<String>,
    pub state: Vec<StateVar>,
    pub api_calls: Vec<ApiCall>,
    pub env_vars: Vec<String>,
    pub side_effects: Vec<String>,
    pub data_access: Vec<DataAccess>,
    /// Capitalized markup elements (custom children), in first-seen order.
    pub elements: Vec<String>,
    /// Auth markers found in the source, in marker-table order.
    pub auth_signals: Vec<String>,
    /// Methods compared against `req.method` in default-export handlers.
    pub request_methods: Vec<String>,
    pub query_params: Vec<String>,
    pub i18n_namespace: Option<String>,
    pub dangerous_patterns: Vec<String>,
    pub line_count: usize,
}

impl ParsedModule {
    /// Create empty facts for a module.
    pub fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn is_client(&self) -> bool {
        self.render_kind == RenderKind::Client
    }

    /// File name without directories or extension (`Button` for `components/Button.tsx`).
    pub fn file_stem(&self) -> &str {
        file_stem(&self.path)
    }

    pub fn has_role(&self, kind: ModuleKind) -> bool {
        self.roles.contains(&kind)
    }

    /// Pages-Router data-fetching export, if the module declares one.
    pub fn data_fetching_export(&self) -> Option<&str> {
        const METHODS: &[&str] = &[
            "getServerSideProps",
            "getStaticProps",
            "getStaticPaths",
            "getInitialProps",
        ];
        self.exports
            .iter()
            .map(|e| e.name.as_str())
            .find(|name| METHODS.contains(name))
    }
}

/// File name without directories or the final extension.
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}
