//! Run configuration for archlens.
//!
//! A configuration file is optional. When present it is YAML and lives in the
//! project root under one of [`CONFIG_FILE_NAMES`].

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::framework::Framework;

/// Configuration file names, in discovery order.
pub const CONFIG_FILE_NAMES: &[&str] = &["archlens.yaml", "archlens.yml", ".archlens.yaml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid exclude pattern {pattern:?}: {message}")]
    InvalidGlob { pattern: String, message: String },
    #[error("threshold {0} must be greater than zero")]
    InvalidThreshold(&'static str),
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Output location. Only report renderers read it.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub framework: Framework,
    /// Glob patterns matched against project-relative paths.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// Whether `.vue` single-file components are analyzed (default: true)
    #[serde(default = "default_true")]
    pub include_vue: bool,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: default_output(),
            framework: Framework::default(),
            exclude: default_exclude(),
            include_vue: true,
            schema: SchemaConfig::default(),
            agents: AgentsConfig::default(),
        }
    }
}

/// Which schema dialect to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaProvider {
    #[default]
    Auto,
    Prisma,
    Drizzle,
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub provider: SchemaProvider,
    /// File or directory overriding discovery, relative to the project root.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// License token unlocking pro-tier agents.
    #[serde(default)]
    pub license: Option<String>,
    /// Agent ids that never run.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Env var prefixes that are safe to ship to the browser.
    #[serde(default = "default_public_env_prefixes")]
    pub public_env_prefixes: Vec<String>,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            license: None,
            exclude: Vec::new(),
            public_env_prefixes: default_public_env_prefixes(),
            thresholds: Thresholds::default(),
        }
    }
}

/// Numeric limits used by the agents. All comparisons are strict except
/// `barrel_min_files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub max_line_count: usize,
    pub max_dependencies: usize,
    pub max_page_components: usize,
    pub max_page_imports: usize,
    pub max_api_calls_per_page: usize,
    pub max_component_renders: usize,
    pub max_fan_in: usize,
    pub max_fan_out: usize,
    pub bridge_degree: usize,
    pub hub_used_by: usize,
    pub hub_renders: usize,
    pub barrel_min_files: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_line_count: 500,
            max_dependencies: 15,
            max_page_components: 20,
            max_page_imports: 20,
            max_api_calls_per_page: 5,
            max_component_renders: 15,
            max_fan_in: 10,
            max_fan_out: 15,
            bridge_degree: 4,
            hub_used_by: 4,
            hub_renders: 4,
            barrel_min_files: 4,
        }
    }
}

impl Thresholds {
    fn entries(&self) -> [(&'static str, usize); 12] {
        [
            ("max_line_count", self.max_line_count),
            ("max_dependencies", self.max_dependencies),
            ("max_page_components", self.max_page_components),
            ("max_page_imports", self.max_page_imports),
            ("max_api_calls_per_page", self.max_api_calls_per_page),
            ("max_component_renders", self.max_component_renders),
            ("max_fan_in", self.max_fan_in),
            ("max_fan_out", self.max_fan_out),
            ("bridge_degree", self.bridge_degree),
            ("hub_used_by", self.hub_used_by),
            ("hub_renders", self.hub_renders),
            ("barrel_min_files", self.barrel_min_files),
        ]
    }
}

fn default_true() -> bool {
    true
}

fn default_output() -> PathBuf {
    PathBuf::from(".archlens")
}

fn default_exclude() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/.next/**",
        "**/dist/**",
        "**/build/**",
        "**/*.test.*",
        "**/*.spec.*",
        "**/__tests__/**",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_public_env_prefixes() -> Vec<String> {
    vec!["NEXT_PUBLIC_".to_string()]
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // An empty file means "all defaults".
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the first config file found in `root`, or the defaults.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let candidate = root.join(name);
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading config");
                return Self::load(candidate);
            }
        }
        Ok(Config::default())
    }

    /// Reject uncompilable exclusion globs and zero thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.exclusion_set()?;
        for (name, value) in self.agents.thresholds.entries() {
            if value == 0 {
                return Err(ConfigError::InvalidThreshold(name));
            }
        }
        Ok(())
    }

    /// Compile `exclude` into a single matcher.
    pub fn exclusion_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| ConfigError::InvalidGlob {
            pattern: self.exclude.join(", "),
            message: e.to_string(),
        })
    }

    /// Whether an env var name may be referenced from client code.
    pub fn is_public_env(&self, name: &str) -> bool {
        name == "NODE_ENV"
            || self
                .agents
                .public_env_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
framework: nextjs-app
exclude:
  - "legacy/**"
schema:
  provider: drizzle
  path: src/db
agents:
  license: AL-PRO-team-0123456789abcdef
  exclude: [impact-analyzer]
  thresholds:
    max_line_count: 300
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.framework, Framework::NextjsApp);
        assert_eq!(config.exclude, vec!["legacy/**"]);
        assert_eq!(config.schema.provider, SchemaProvider::Drizzle);
        assert_eq!(config.schema.path, Some(PathBuf::from("src/db")));
        assert_eq!(config.agents.exclude, vec!["impact-analyzer"]);
        assert_eq!(config.agents.thresholds.max_line_count, 300);
        // Unset thresholds keep their defaults.
        assert_eq!(config.agents.thresholds.max_dependencies, 15);
        assert!(config.agents.enabled);
        assert!(config.include_vue);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agents.thresholds.max_fan_in, 10);
        assert_eq!(config.agents.public_env_prefixes, vec!["NEXT_PUBLIC_"]);
        let excluded = config.exclusion_set().unwrap();
        assert!(excluded.is_match("node_modules/react/index.js"));
        assert!(excluded.is_match("src/lib/cart.test.ts"));
        assert!(!excluded.is_match("src/lib/cart.ts"));
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let config = Config {
            exclude: vec!["src/[".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config = Config::default();
        config.agents.thresholds.max_fan_out = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold("max_fan_out"))
        ));
    }

    #[test]
    fn test_discover_order_and_absence() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(".archlens.yaml"), "include_vue: false\n").unwrap();
        std::fs::write(dir.path().join("archlens.yml"), "output: reports\n").unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.output, PathBuf::from("reports"));
        assert!(config.include_vue);
    }

    #[test]
    fn test_load_reports_yaml_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("archlens.yaml");
        std::fs::write(&path, "agents: [not, a, map]\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn test_public_env() {
        let config = Config::default();
        assert!(config.is_public_env("NEXT_PUBLIC_URL"));
        assert!(config.is_public_env("NODE_ENV"));
        assert!(!config.is_public_env("DATABASE_URL"));
    }
}
