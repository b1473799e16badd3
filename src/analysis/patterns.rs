//! Text-level detectors shared by the language analyzers.
//!
//! These cover facts that are easier to express over source text than
//! over the syntax tree: environment variable references, auth markers,
//! query parameters and the like.

use lazy_static::lazy_static;
use regex::Regex;

use super::facts::{ApiCall, DataAccess};

/// Effect-primitive names recorded as side effects.
pub const LIFECYCLE_HOOKS: &[&str] = &[
    "useEffect",
    "useLayoutEffect",
    "useInsertionEffect",
    "onMounted",
    "onUnmounted",
    "watchEffect",
];

/// ORM operations recognised on `prisma.<entity>.<op>` / `db.<entity>.<op>`.
pub const ORM_OPERATIONS: &[&str] = &[
    "findMany",
    "findUnique",
    "findFirst",
    "create",
    "createMany",
    "update",
    "updateMany",
    "delete",
    "deleteMany",
    "upsert",
    "count",
    "aggregate",
    "groupBy",
];

pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Auth markers in priority order. The flag marks markers that also count
/// as protection for route handlers; the rest only apply to pages.
pub const AUTH_MARKERS: &[(&str, bool)] = &[
    ("auth()", true),
    ("getServerSession", true),
    ("getSession", true),
    ("currentUser", true),
    ("withAuth", true),
    ("useSession", false),
    ("redirect", false),
];

lazy_static! {
    static ref ENV_VAR: Regex =
        Regex::new(r#"(?:process\.env|import\.meta\.env)(?:\.([A-Za-z_]\w*)|\[\s*['"]([A-Za-z_]\w*)['"]\s*\])"#)
            .unwrap();
    static ref FETCH_ENDPOINT: Regex =
        Regex::new(r#"^\s*[`'"](/api/[^`'"]*)[`'"]"#).unwrap();
    static ref FETCH_METHOD: Regex =
        Regex::new(r#"method\s*:\s*['"`]([A-Za-z]+)['"`]"#).unwrap();
    static ref ORM_CALL: Regex =
        Regex::new(r"^(?:prisma|db)\.(\w+)\.(\w+)$").unwrap();
    static ref AUTH_CALL: Regex = Regex::new(r"\bauth\s*\(\s*\)").unwrap();
    static ref SEARCH_PARAM: Regex =
        Regex::new(r#"searchParams(?:\??\.get\(\s*['"](\w+)['"]|\??\.(\w+))"#).unwrap();
    static ref QUERY_PARAM: Regex =
        Regex::new(r#"(?:router\.query|req\.query|query)\.(\w+)"#).unwrap();
    static ref I18N_NAMESPACE: Regex =
        Regex::new(r#"(?:useTranslations|getTranslations|useTranslation)\(\s*['"]([\w.-]+)['"]"#).unwrap();
    static ref REQUEST_METHOD: Regex =
        Regex::new(r#"req(?:uest)?\.method\s*===?\s*['"]([A-Z]+)['"]"#).unwrap();
    static ref INNER_HTML: Regex = Regex::new(r"\.innerHTML\s*=[^=]").unwrap();
    static ref CHILD_PROCESS: Regex =
        Regex::new(r#"(?:from\s+|require\(\s*)['"](?:node:)?child_process['"]"#).unwrap();
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Environment variable names referenced in `content`, first-seen order.
pub fn env_vars(content: &str) -> Vec<String> {
    let mut vars = Vec::new();
    for caps in ENV_VAR.captures_iter(content) {
        if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
            push_unique(&mut vars, name.as_str());
        }
    }
    vars
}

/// Interpret the argument list of a `fetch(...)` call.
///
/// Only literal endpoints under `/api/` are recorded. The method defaults
/// to GET when no `method:` option is given.
pub fn fetch_call(arguments: &str) -> Option<ApiCall> {
    let inner = arguments.trim().strip_prefix('(').unwrap_or(arguments);
    let endpoint = FETCH_ENDPOINT.captures(inner)?.get(1)?.as_str().to_string();
    let method = FETCH_METHOD
        .captures(inner)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_else(|| "GET".to_string());
    Some(ApiCall { endpoint, method })
}

/// Interpret a callee like `prisma.user.findMany` as a data access.
pub fn orm_access(callee: &str) -> Option<DataAccess> {
    let compact: String = callee.chars().filter(|c| !c.is_whitespace()).collect();
    let caps = ORM_CALL.captures(&compact)?;
    let operation = caps.get(2)?.as_str();
    if !ORM_OPERATIONS.contains(&operation) {
        return None;
    }
    Some(DataAccess {
        entity: caps.get(1)?.as_str().to_string(),
        operation: operation.to_string(),
    })
}

/// Auth markers present in `content`, in [`AUTH_MARKERS`] order.
pub fn auth_signals(content: &str) -> Vec<String> {
    AUTH_MARKERS
        .iter()
        .filter(|(marker, _)| match *marker {
            "auth()" => AUTH_CALL.is_match(content),
            "redirect" => content.contains("redirect("),
            m => content.contains(m),
        })
        .map(|(marker, _)| marker.to_string())
        .collect()
}

/// Whether `marker` also protects route handlers.
pub fn is_server_auth_marker(marker: &str) -> bool {
    AUTH_MARKERS
        .iter()
        .any(|(m, server)| *m == marker && *server)
}

/// Query/search parameter names read by the module.
pub fn query_params(content: &str) -> Vec<String> {
    let mut params = Vec::new();
    for caps in SEARCH_PARAM.captures_iter(content) {
        if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
            if !matches!(name.as_str(), "get" | "has" | "getAll" | "toString" | "entries") {
                push_unique(&mut params, name.as_str());
            }
        }
    }
    for caps in QUERY_PARAM.captures_iter(content) {
        if let Some(name) = caps.get(1) {
            push_unique(&mut params, name.as_str());
        }
    }
    params
}

pub fn i18n_namespace(content: &str) -> Option<String> {
    I18N_NAMESPACE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Methods a single default-export handler dispatches on via `req.method`.
pub fn request_methods(content: &str) -> Vec<String> {
    let mut methods = Vec::new();
    for caps in REQUEST_METHOD.captures_iter(content) {
        if let Some(m) = caps.get(1) {
            if HTTP_METHODS.contains(&m.as_str()) {
                push_unique(&mut methods, m.as_str());
            }
        }
    }
    methods
}

/// Dangerous constructs detectable from text alone.
pub fn dangerous_text_patterns(content: &str) -> Vec<String> {
    let mut found = Vec::new();
    if INNER_HTML.is_match(content) {
        found.push("innerHTML assignment".to_string());
    }
    if content.contains("dangerouslySetInnerHTML") {
        found.push("dangerouslySetInnerHTML".to_string());
    }
    if CHILD_PROCESS.is_match(content) {
        found.push("child_process import".to_string());
    }
    found
}

/// Hook naming convention: `use` alone or `use` followed by an uppercase letter.
pub fn is_hook_name(name: &str) -> bool {
    match name.strip_prefix("use") {
        Some("") => true,
        Some(rest) => rest.starts_with(|c: char| c.is_ascii_uppercase()),
        None => false,
    }
}

/// PascalCase identifier (uppercase first letter, at least one lowercase).
pub fn is_pascal_case(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase()) && name.chars().any(|c| c.is_ascii_lowercase())
}
