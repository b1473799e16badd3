//! Role classification and route-path derivation.
//!
//! Roles come from an ordered rule table. Path rules look only at the
//! module's project-relative path; content rules look at its exports.
//! Every matching rule contributes its role; the primary kind is chosen
//! later by precedence (see [`ModuleKind`]).

use lazy_static::lazy_static;
use regex::Regex;

use super::facts::{file_stem, ExportInfo, ExportKind, ModuleKind, RoleSet};
use super::patterns::{is_hook_name, is_pascal_case, HTTP_METHODS};

lazy_static! {
    static ref APP_PAGE: Regex =
        Regex::new(r"(?:^|/)app/(?:.+/)?page\.(?:tsx|ts|jsx|js|mts)$").unwrap();
    static ref PAGES_PAGE: Regex =
        Regex::new(r"(?:^|/)pages/.+\.(?:tsx|ts|jsx|js|vue)$").unwrap();
    static ref ROUTES_PAGE: Regex =
        Regex::new(r"(?:^|/)app/routes/.+\.(?:tsx|jsx)$").unwrap();
    static ref PAGES_API: Regex = Regex::new(r"(?:^|/)pages/api/").unwrap();
    static ref APP_ROUTE: Regex =
        Regex::new(r"(?:^|/)app/(?:.+/)?route\.(?:ts|js|mts)$").unwrap();
    static ref PAGES_API_ROUTE: Regex =
        Regex::new(r"(?:^|/)pages/api/.+\.(?:ts|js|tsx|jsx)$").unwrap();
    static ref SERVER_ROUTE: Regex =
        Regex::new(r"(?:^|/)server/(?:api|routes)/.+\.(?:ts|js|mts)$").unwrap();
    static ref HOOK_FILE: Regex = Regex::new(r"^use[A-Z-]").unwrap();
    static ref COMPONENT_DIR: Regex = Regex::new(r"(?:^|/)components/").unwrap();
    static ref LIBRARY_DIR: Regex =
        Regex::new(r"^(?:src/)?(?:lib|utils|server|services|helpers)/").unwrap();
    static ref ROUTE_GROUP: Regex = Regex::new(r"^\(.*\)$").unwrap();
}

/// What a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleBasis {
    Path,
    Content,
}

pub struct RoleInput<'a> {
    pub path: &'a str,
    pub exports: &'a [ExportInfo],
}

pub struct RoleRule {
    pub role: ModuleKind,
    pub basis: RuleBasis,
    pub description: &'static str,
    pub matches: fn(&RoleInput<'_>) -> bool,
}

/// Ordered classification table.
pub static ROLE_RULES: &[RoleRule] = &[
    RoleRule {
        role: ModuleKind::Page,
        basis: RuleBasis::Path,
        description: "page file under a routing directory",
        matches: is_page_path,
    },
    RoleRule {
        role: ModuleKind::RouteHandler,
        basis: RuleBasis::Path,
        description: "route handler under an API directory",
        matches: is_route_path,
    },
    RoleRule {
        role: ModuleKind::Hook,
        basis: RuleBasis::Path,
        description: "file named use*",
        matches: |input| HOOK_FILE.is_match(file_stem(input.path)),
    },
    RoleRule {
        role: ModuleKind::Component,
        basis: RuleBasis::Path,
        description: "file under a components directory",
        matches: |input| COMPONENT_DIR.is_match(input.path),
    },
    RoleRule {
        role: ModuleKind::Hook,
        basis: RuleBasis::Content,
        description: "exports a use* function",
        matches: |input| {
            input.exports.iter().any(|e| {
                matches!(e.kind, ExportKind::Function | ExportKind::Variable) && is_hook_name(&e.name)
            })
        },
    },
    RoleRule {
        role: ModuleKind::Component,
        basis: RuleBasis::Content,
        description: "exports a capitalized function",
        matches: |input| {
            input.exports.iter().any(|e| {
                matches!(
                    e.kind,
                    ExportKind::Function | ExportKind::Variable | ExportKind::Default
                ) && !e.is_type_only
                    && is_pascal_case(&e.name)
                    && !HTTP_METHODS.contains(&e.name.as_str())
            })
        },
    },
    RoleRule {
        role: ModuleKind::Library,
        basis: RuleBasis::Path,
        description: "file under lib/utils/server/services/helpers",
        matches: |input| LIBRARY_DIR.is_match(input.path),
    },
];

fn is_page_path(input: &RoleInput<'_>) -> bool {
    let path = input.path;
    if is_route_path(input) {
        return false;
    }
    APP_PAGE.is_match(path)
        || ROUTES_PAGE.is_match(path)
        || (PAGES_PAGE.is_match(path) && !PAGES_API.is_match(path) && !is_pages_special(path))
}

fn is_pages_special(path: &str) -> bool {
    matches!(file_stem(path), "_app" | "_document" | "_error")
}

fn is_route_path(input: &RoleInput<'_>) -> bool {
    APP_ROUTE.is_match(input.path)
        || PAGES_API_ROUTE.is_match(input.path)
        || SERVER_ROUTE.is_match(input.path)
}

/// Every role the module satisfies. Modules matching no rule are libraries.
pub fn classify(path: &str, exports: &[ExportInfo]) -> RoleSet {
    let input = RoleInput { path, exports };
    let mut roles: RoleSet = ROLE_RULES
        .iter()
        .filter(|rule| (rule.matches)(&input))
        .map(|rule| rule.role)
        .collect();
    if roles.is_empty() {
        roles.insert(ModuleKind::Library);
    }
    roles
}

/// Highest-precedence role; Library for an empty set.
pub fn primary_kind(roles: &RoleSet) -> ModuleKind {
    roles.iter().next().copied().unwrap_or(ModuleKind::Library)
}

/// URL path served by a page or route-handler module.
///
/// `app/blog/[slug]/page.tsx` → `/blog/[slug]`,
/// `pages/api/users/index.ts` → `/api/users`,
/// `app/(marketing)/about/page.tsx` → `/about`.
pub fn route_path(path: &str) -> String {
    const ROUTE_ROOTS: &[&str] = &["app", "pages", "server"];
    let parts: Vec<&str> = path.split('/').collect();
    let start = parts
        .iter()
        .position(|s| ROUTE_ROOTS.contains(s))
        .map_or(0, |i| i + 1);
    let mut rest = &parts[start..];
    if rest.first() == Some(&"routes") {
        rest = &rest[1..];
    }

    let mut segments = Vec::new();
    for (i, segment) in rest.iter().enumerate() {
        let is_file = i + 1 == rest.len();
        let segment = if is_file { file_stem(segment) } else { segment };
        if is_file && matches!(segment, "page" | "route" | "index" | "+page") {
            continue;
        }
        if segment.is_empty() || ROUTE_GROUP.is_match(segment) || segment.starts_with('@') {
            continue;
        }
        segments.push(segment);
    }
    format!("/{}", segments.join("/"))
}
