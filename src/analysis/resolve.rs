//! Import specifier resolution.
//!
//! Relative specifiers are joined against the importing module's directory;
//! aliased specifiers (`@/lib/db`) go through the project's `paths` table.
//! Candidates are tried in a fixed order: the literal path, then each
//! extension in [`EXTENSION_FALLBACKS`], then each entry in
//! [`INDEX_FALLBACKS`]. Bare package specifiers never resolve.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

pub const EXTENSION_FALLBACKS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mts", ".vue"];
pub const INDEX_FALLBACKS: &[&str] = &["/index.ts", "/index.tsx", "/index.js", "/index.jsx"];

/// Config files consulted for `compilerOptions.paths`, in order.
pub const ALIAS_CONFIG_FILES: &[&str] = &["tsconfig.json", "jsconfig.json"];

lazy_static! {
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

#[derive(Debug, Clone)]
struct AliasEntry {
    /// Pattern text before `*` (or the whole pattern for exact aliases).
    prefix: String,
    wildcard: bool,
    targets: Vec<String>,
}

/// Path alias table from `compilerOptions.paths` / `baseUrl`.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    base_url: Option<String>,
    entries: Vec<AliasEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsConfig {
    #[serde(default)]
    compiler_options: Option<CompilerOptions>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerOptions {
    base_url: Option<String>,
    #[serde(default)]
    paths: std::collections::BTreeMap<String, Vec<String>>,
}

impl AliasTable {
    /// Load the alias table from the first config file present in `root`.
    ///
    /// A missing or unreadable config yields an empty table.
    pub fn from_project(root: &Path) -> Self {
        for name in ALIAS_CONFIG_FILES {
            let path = root.join(name);
            if !path.is_file() {
                continue;
            }
            let loaded = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))
                .and_then(|text| Self::parse(&text));
            match loaded {
                Ok(table) => {
                    tracing::debug!(file = %name, aliases = table.len(), "loaded path aliases");
                    return table;
                }
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "ignoring unreadable alias config");
                    return Self::default();
                }
            }
        }
        Self::default()
    }

    /// Parse a tsconfig-style document. Comments and trailing commas are tolerated.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let cleaned = strip_json_comments(text);
        let cleaned = TRAILING_COMMA.replace_all(&cleaned, "$1");
        let config: TsConfig = serde_json::from_str(&cleaned).context("parsing alias config")?;

        let mut table = Self::default();
        let Some(options) = config.compiler_options else {
            return Ok(table);
        };
        let base = options
            .base_url
            .as_deref()
            .and_then(|b| normalize_path("", b));
        table.base_url = base.clone();
        for (pattern, targets) in options.paths {
            let targets = targets
                .iter()
                .filter_map(|t| normalize_path(base.as_deref().unwrap_or(""), t))
                .collect();
            table.insert(&pattern, targets);
        }
        Ok(table)
    }

    /// Add an alias. `targets` are project-relative and may contain one `*`.
    pub fn insert(&mut self, pattern: &str, targets: Vec<String>) {
        let (prefix, wildcard) = match pattern.find('*') {
            Some(idx) => (pattern[..idx].to_string(), true),
            None => (pattern.to_string(), false),
        };
        self.entries.push(AliasEntry {
            prefix,
            wildcard,
            targets,
        });
        // Longest prefix wins.
        self.entries
            .sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()).then(a.prefix.cmp(&b.prefix)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.base_url.is_none()
    }

    /// Candidate base paths for a non-relative specifier.
    fn candidates(&self, specifier: &str) -> Vec<String> {
        let mut out = Vec::new();
        for entry in &self.entries {
            if entry.wildcard {
                if let Some(rest) = specifier.strip_prefix(entry.prefix.as_str()) {
                    out.extend(entry.targets.iter().map(|t| t.replacen('*', rest, 1)));
                }
            } else if specifier == entry.prefix {
                out.extend(entry.targets.iter().cloned());
            }
        }
        if let Some(base) = &self.base_url {
            if let Some(joined) = normalize_path(base, specifier) {
                out.push(joined);
            }
        }
        out
    }
}

/// Resolves import specifiers against the set of known module ids.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    known: HashSet<String>,
    aliases: AliasTable,
}

impl Resolver {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            aliases: AliasTable::default(),
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// Resolve `specifier` as written in module `from`.
    pub fn resolve(&self, from: &str, specifier: &str) -> Option<String> {
        if specifier.starts_with('.') {
            let dir = match from.rfind('/') {
                Some(idx) => &from[..idx],
                None => "",
            };
            let base = normalize_path(dir, specifier)?;
            return self.probe(&base);
        }
        self.aliases
            .candidates(specifier)
            .iter()
            .find_map(|base| self.probe(base))
    }

    fn probe(&self, base: &str) -> Option<String> {
        if self.known.contains(base) {
            return Some(base.to_string());
        }
        EXTENSION_FALLBACKS
            .iter()
            .chain(INDEX_FALLBACKS)
            .map(|suffix| format!("{base}{suffix}"))
            .find(|candidate| self.known.contains(candidate))
            .map(|candidate| candidate.trim_start_matches('/').to_string())
    }
}

/// Join `rel` onto `dir` and collapse `.`/`..` segments.
///
/// Returns `None` when the result would leave the project root.
pub fn normalize_path(dir: &str, rel: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(rel.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

fn strip_json_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}
