//! Web framework detection from project layout and `package.json`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Framework the analyzed project is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    /// Detect from the project layout
    #[default]
    Auto,
    NextjsApp,
    NextjsPages,
    Nuxt,
    Sveltekit,
    Remix,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Auto => "auto",
            Framework::NextjsApp => "nextjs-app",
            Framework::NextjsPages => "nextjs-pages",
            Framework::Nuxt => "nuxt",
            Framework::Sveltekit => "sveltekit",
            Framework::Remix => "remix",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of [`detect`]. `confidence` is a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub framework: Framework,
    pub confidence: u8,
    pub signals: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
}

fn any_exists(root: &Path, names: &[&str]) -> bool {
    names.iter().any(|name| root.join(name).exists())
}

/// Auto-detect the framework of the project rooted at `root`.
///
/// Later config-file signals win over earlier ones; `package.json`
/// dependencies only raise confidence, except that a `next` dependency
/// without a config file still selects a Next.js router.
pub fn detect(root: &Path) -> Detection {
    let mut signals = Vec::new();
    let mut framework = Framework::Auto;
    let mut confidence: u8 = 0;

    let has_app_dir = any_exists(root, &["app", "src/app"]);
    let has_pages_dir = any_exists(root, &["pages", "src/pages"]);
    let next_router = |signals: &mut Vec<String>| {
        if has_app_dir {
            signals.push("app/ directory found".to_string());
            Some(Framework::NextjsApp)
        } else if has_pages_dir {
            signals.push("pages/ directory found".to_string());
            Some(Framework::NextjsPages)
        } else {
            None
        }
    };

    if any_exists(root, &["next.config.js", "next.config.mjs", "next.config.ts"]) {
        signals.push("next.config found".to_string());
        confidence += 40;
        if let Some(router) = next_router(&mut signals) {
            framework = router;
            confidence += 30;
        }
    }
    if any_exists(root, &["nuxt.config.ts", "nuxt.config.js"]) {
        framework = Framework::Nuxt;
        signals.push("nuxt.config found".to_string());
        confidence = 80;
    }
    if any_exists(root, &["svelte.config.js"]) {
        framework = Framework::Sveltekit;
        signals.push("svelte.config.js found".to_string());
        confidence = 80;
    }
    if any_exists(root, &["remix.config.js", "app/root.tsx"]) {
        framework = Framework::Remix;
        signals.push("remix signals found".to_string());
        confidence = 70;
    }

    let package = read_package_json(root);
    let deps: BTreeMap<&str, &str> = package
        .dependencies
        .iter()
        .chain(package.dev_dependencies.iter())
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let mut boost = |signal: String, confidence: &mut u8| {
        signals.push(signal);
        *confidence = confidence.saturating_add(20).min(100);
    };
    if let Some(version) = deps.get("next") {
        boost(format!("next@{version} in dependencies"), &mut confidence);
    }
    if let Some(version) = deps.get("nuxt") {
        boost(format!("nuxt@{version} in dependencies"), &mut confidence);
    }
    if deps.contains_key("@sveltejs/kit") {
        boost("@sveltejs/kit in dependencies".to_string(), &mut confidence);
    }
    if deps.contains_key("@remix-run/node") || deps.contains_key("@remix-run/react") {
        boost("remix packages in dependencies".to_string(), &mut confidence);
    }

    if framework == Framework::Auto && deps.contains_key("next") {
        if let Some(router) = next_router(&mut signals) {
            framework = router;
        }
    }

    tracing::debug!(framework = %framework, confidence, "framework detection");
    Detection {
        framework,
        confidence,
        signals,
    }
}

fn read_package_json(root: &Path) -> PackageJson {
    let path = root.join("package.json");
    let Ok(content) = fs::read_to_string(&path) else {
        return PackageJson::default();
    };
    match serde_json::from_str(&content) {
        Ok(package) => package,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable package.json");
            PackageJson::default()
        }
    }
}
