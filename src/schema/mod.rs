//! Data-schema extraction.
//!
//! Two dialects are supported:
//! - **block**: declarative `model X { field Type @attr }` / `enum E { A B }`
//!   files (`*.prisma`), parsed by [`block::parse_block_schema`];
//! - **builder**: TypeScript table-builder calls (`pgTable('users', {...})`,
//!   `relations(...)`, `pgEnum(...)`), parsed by [`builder::parse_builder_schema`].
//!
//! Entity names are normalized to PascalCase in both dialects so that code
//! references and declarations compare equal.

pub mod block;
pub mod builder;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::{SchemaConfig, SchemaProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRelation {
    pub field: String,
    pub target: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntity {
    pub name: String,
    pub fields: Vec<SchemaField>,
    pub relations: Vec<SchemaRelation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEnum {
    pub name: String,
    pub values: Vec<String>,
}

/// Which dialect a schema came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaDialect {
    Block,
    Builder,
    #[default]
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub dialect: SchemaDialect,
    pub entities: Vec<SchemaEntity>,
    pub enums: Vec<SchemaEnum>,
}

impl Schema {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Look up an entity by any spelling (`user`, `User`, `user_accounts`).
    pub fn entity(&self, name: &str) -> Option<&SchemaEntity> {
        let wanted = entity_key(name);
        self.entities.iter().find(|e| entity_key(&e.name) == wanted)
    }

    /// Merge entities with the same normalized name, keeping first-seen order.
    pub(crate) fn dedupe_entities(&mut self) {
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        let mut merged: Vec<SchemaEntity> = Vec::new();
        for entity in self.entities.drain(..) {
            match index.get(&entity_key(&entity.name)) {
                Some(&i) => {
                    let existing = &mut merged[i];
                    for field in entity.fields {
                        if !existing.fields.iter().any(|f| f.name == field.name) {
                            existing.fields.push(field);
                        }
                    }
                    for relation in entity.relations {
                        if !existing.relations.iter().any(|r| r.field == relation.field) {
                            existing.relations.push(relation);
                        }
                    }
                }
                None => {
                    index.insert(entity_key(&entity.name), merged.len());
                    merged.push(entity);
                }
            }
        }
        self.entities = merged;
    }
}

/// `user_accounts` / `user-accounts` / `userAccounts` → `UserAccounts`.
pub fn normalize_entity_name(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Case-insensitive comparison key for entity names.
pub fn entity_key(name: &str) -> String {
    normalize_entity_name(name).to_lowercase()
}

/// Candidate block-dialect files, relative to the project root.
const BLOCK_FILES: &[&str] = &["prisma/schema.prisma", "schema.prisma"];
const BLOCK_DIR: &str = "prisma/schema";

/// Directories searched for builder-dialect table definitions.
const BUILDER_DIRS: &[&str] = &[
    "src/db",
    "db",
    "drizzle",
    "src/schema",
    "lib/db",
    "server/db",
    "src/lib/db",
];

/// Locate and extract the project's schema. Absence yields an empty schema.
pub fn extract_schema(root: &Path, config: &SchemaConfig) -> Schema {
    let try_block = matches!(config.provider, SchemaProvider::Auto | SchemaProvider::Prisma);
    let try_builder = matches!(config.provider, SchemaProvider::Auto | SchemaProvider::Drizzle);
    let configured = config.path.as_ref().map(|p| root.join(p));

    if try_block {
        let files = match &configured {
            Some(path) if path.is_file() => {
                if path.extension().is_some_and(|e| e == "prisma") {
                    vec![path.clone()]
                } else {
                    Vec::new()
                }
            }
            Some(path) => prisma_files_in(path),
            None => discover_block_files(root),
        };
        if !files.is_empty() {
            let schema = block::parse_block_schema(&read_all(&files));
            if !schema.is_empty() || config.provider == SchemaProvider::Prisma {
                tracing::info!(entities = schema.entities.len(), "extracted block schema");
                return schema;
            }
        }
    }

    if try_builder {
        let files = match &configured {
            Some(path) => collect_builder_files(path),
            None => BUILDER_DIRS
                .iter()
                .flat_map(|dir| collect_builder_files(&root.join(dir)))
                .collect(),
        };
        let sources: Vec<(String, String)> = files
            .iter()
            .filter_map(|path| {
                let text = std::fs::read_to_string(path).ok()?;
                text.contains("drizzle-orm")
                    .then(|| (relative_name(root, path), text))
            })
            .collect();
        if !sources.is_empty() {
            let schema = builder::parse_builder_schema(&sources);
            tracing::info!(entities = schema.entities.len(), "extracted builder schema");
            return schema;
        }
    }

    tracing::debug!("no schema source found");
    Schema::default()
}

fn discover_block_files(root: &Path) -> Vec<PathBuf> {
    for candidate in BLOCK_FILES {
        let path = root.join(candidate);
        if path.is_file() {
            return vec![path];
        }
    }
    prisma_files_in(&root.join(BLOCK_DIR))
}

/// `*.prisma` files directly inside `dir`, sorted.
fn prisma_files_in(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|e| e == "prisma"))
        .collect();
    files.sort();
    files
}

fn collect_builder_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    if !path.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            let name = p.to_string_lossy();
            (name.ends_with(".ts") || name.ends_with(".mts")) && !name.ends_with(".d.ts")
        })
        .collect();
    files.sort();
    files
}

fn read_all(files: &[PathBuf]) -> String {
    let mut content = String::new();
    for file in files {
        match std::fs::read_to_string(file) {
            Ok(text) => {
                content.push_str(&text);
                content.push('\n');
            }
            Err(e) => tracing::warn!(file = %file.display(), error = %e, "skipping schema file"),
        }
    }
    content
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_entity_name() {
        assert_eq!(normalize_entity_name("user"), "User");
        assert_eq!(normalize_entity_name("user_accounts"), "UserAccounts");
        assert_eq!(normalize_entity_name("blog-post"), "BlogPost");
        assert_eq!(normalize_entity_name("OrderItem"), "OrderItem");
        assert_eq!(entity_key("orderItem"), entity_key("order_item"));
    }

    #[test]
    fn test_entity_lookup_any_spelling() {
        let schema = block::parse_block_schema("model UserAccount {\n id Int @id\n}\n");
        assert!(schema.entity("userAccount").is_some());
        assert!(schema.entity("user_account").is_some());
        assert!(schema.entity("post").is_none());
    }

    #[test]
    fn test_extract_schema_discovers_block_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("prisma")).unwrap();
        fs::write(
            dir.path().join("prisma/schema.prisma"),
            "model Post {\n  id Int @id\n}\n",
        )
        .unwrap();

        let schema = extract_schema(dir.path(), &SchemaConfig::default());
        assert_eq!(schema.dialect, SchemaDialect::Block);
        assert_eq!(schema.entities[0].name, "Post");
    }

    #[test]
    fn test_extract_schema_builder_requires_marker() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/db")).unwrap();
        fs::write(
            dir.path().join("src/db/other.ts"),
            "export const users = pgTable('users', { id: serial('id') });",
        )
        .unwrap();
        assert!(extract_schema(dir.path(), &SchemaConfig::default()).is_empty());

        fs::write(
            dir.path().join("src/db/schema.ts"),
            "import { pgTable, serial } from 'drizzle-orm/pg-core';\nexport const users = pgTable('users', { id: serial('id').primaryKey() });\n",
        )
        .unwrap();
        let schema = extract_schema(dir.path(), &SchemaConfig::default());
        assert_eq!(schema.dialect, SchemaDialect::Builder);
        assert_eq!(schema.entities.len(), 1);
        assert_eq!(schema.entities[0].name, "Users");
    }

    #[test]
    fn test_extract_schema_absent() {
        let dir = TempDir::new().unwrap();
        let schema = extract_schema(dir.path(), &SchemaConfig::default());
        assert!(schema.is_empty());
        assert_eq!(schema.dialect, SchemaDialect::None);
    }

    #[test]
    fn test_provider_none_skips_extraction() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("schema.prisma"), "model A {\n id Int @id\n}\n").unwrap();
        let config = SchemaConfig {
            provider: SchemaProvider::None,
            path: None,
        };
        assert!(extract_schema(dir.path(), &config).is_empty());
    }
}
