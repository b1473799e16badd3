//! Builder-dialect schema parser (`pgTable('users', { ... })`).
//!
//! Table definitions are read from the syntax tree of each file. Relations
//! and column references are resolved in a second pass over all files, so a
//! table may reference one declared in another file.

use std::collections::HashMap;

use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;
use tree_sitter::Node;

use super::{
    normalize_entity_name, Cardinality, Schema, SchemaDialect, SchemaEntity, SchemaEnum,
    SchemaField, SchemaRelation,
};
use crate::analysis::{ModuleAnalyzer, ParsedFile, TypeScriptAnalyzer};

/// Column builder → field type.
static COLUMN_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "serial" => "Int",
    "smallserial" => "Int",
    "bigserial" => "BigInt",
    "integer" => "Int",
    "int" => "Int",
    "smallint" => "Int",
    "tinyint" => "Int",
    "mediumint" => "Int",
    "bigint" => "BigInt",
    "real" => "Float",
    "float" => "Float",
    "double" => "Float",
    "doublePrecision" => "Float",
    "numeric" => "Decimal",
    "decimal" => "Decimal",
    "text" => "String",
    "varchar" => "String",
    "char" => "String",
    "uuid" => "String",
    "boolean" => "Boolean",
    "timestamp" => "DateTime",
    "datetime" => "DateTime",
    "date" => "DateTime",
    "time" => "String",
    "interval" => "String",
    "json" => "Json",
    "jsonb" => "Json",
    "blob" => "Bytes",
};

const TABLE_BUILDERS: &[&str] = &["pgTable", "mysqlTable", "sqliteTable"];
const ENUM_BUILDERS: &[&str] = &["pgEnum", "mysqlEnum"];

lazy_static! {
    static ref COLUMN_HEAD: Regex = Regex::new(r"^\s*([A-Za-z_]\w*)\s*\(").unwrap();
    static ref REFERENCES: Regex =
        Regex::new(r"\.references\(\s*\(\s*\)\s*(?::\s*\w+\s*)?=>\s*(\w+)\.\w+").unwrap();
    static ref DEFAULT_VALUE: Regex = Regex::new(r"\.default\(([^)]*)\)").unwrap();
    static ref RELATION_ENTRY: Regex =
        Regex::new(r"(\w+)\s*:\s*(one|many)\s*\(\s*(\w+)").unwrap();
}

struct TableDecl {
    var: String,
    entity: SchemaEntity,
    /// (field, referenced table variable)
    references: Vec<(String, String)>,
    /// (field index, column builder) for builders missing from the type table
    unresolved_types: Vec<(usize, String)>,
}

struct RelationsDecl {
    table_var: String,
    body: String,
}

#[derive(Default)]
struct Declarations {
    tables: Vec<TableDecl>,
    enums: Vec<(String, SchemaEnum)>,
    relations: Vec<RelationsDecl>,
}

/// Parse builder-dialect sources given as `(path, text)` pairs.
///
/// Files that fail to parse are skipped with a warning.
pub fn parse_builder_schema(sources: &[(String, String)]) -> Schema {
    let analyzer = TypeScriptAnalyzer::new();
    let mut decls = Declarations::default();

    for (path, text) in sources {
        match analyzer.parse(path, text.as_bytes()) {
            Ok(parsed) => collect_declarations(&parsed, &mut decls),
            Err(e) => tracing::warn!(file = %path, error = %e, "skipping schema file"),
        }
    }

    let enum_names: HashMap<&str, &str> = decls
        .enums
        .iter()
        .map(|(var, e)| (var.as_str(), e.name.as_str()))
        .collect();
    let table_names: HashMap<String, String> = decls
        .tables
        .iter()
        .map(|t| (t.var.clone(), t.entity.name.clone()))
        .collect();

    let mut entities = Vec::new();
    for mut table in decls.tables {
        for (index, head) in &table.unresolved_types {
            if let (Some(field), Some(name)) =
                (table.entity.fields.get_mut(*index), enum_names.get(head.as_str()))
            {
                field.field_type = name.to_string();
            }
        }
        for (field, target_var) in &table.references {
            if let Some(target) = table_names.get(target_var) {
                table.entity.relations.push(SchemaRelation {
                    field: field.clone(),
                    target: target.clone(),
                    cardinality: Cardinality::OneToOne,
                });
            }
        }
        entities.push((table.var, table.entity));
    }

    for relations in &decls.relations {
        let Some((_, entity)) = entities.iter_mut().find(|(var, _)| *var == relations.table_var)
        else {
            continue;
        };
        for caps in RELATION_ENTRY.captures_iter(&relations.body) {
            let field = &caps[1];
            let Some(target) = table_names.get(&caps[3]) else {
                continue;
            };
            if entity.relations.iter().any(|r| r.field == field) {
                continue;
            }
            entity.relations.push(SchemaRelation {
                field: field.to_string(),
                target: target.clone(),
                cardinality: if &caps[2] == "many" {
                    Cardinality::OneToMany
                } else {
                    Cardinality::OneToOne
                },
            });
        }
    }

    let mut schema = Schema {
        dialect: SchemaDialect::Builder,
        entities: entities.into_iter().map(|(_, e)| e).collect(),
        enums: decls.enums.into_iter().map(|(_, e)| e).collect(),
    };
    schema.dedupe_entities();
    schema
}

fn unquote(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

fn arguments(node: Node<'_>) -> Vec<Node<'_>> {
    let Some(args) = node.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    let list: Vec<Node<'_>> = args
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();
    list
}

fn collect_declarations(parsed: &ParsedFile, decls: &mut Declarations) {
    let root = parsed.tree.root_node();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        let declaration = match stmt.kind() {
            "lexical_declaration" | "variable_declaration" => Some(stmt),
            "export_statement" => stmt.child_by_field_name("declaration"),
            _ => None,
        };
        let Some(declaration) = declaration else {
            continue;
        };
        let mut inner = declaration.walk();
        for declarator in declaration.named_children(&mut inner) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let (Some(name), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };
            if value.kind() != "call_expression" {
                continue;
            }
            let var = parsed.node_text(name).to_string();
            let callee = value
                .child_by_field_name("function")
                .map(|f| parsed.node_text(f))
                .unwrap_or("");

            if TABLE_BUILDERS.contains(&callee) {
                if let Some(table) = table_declaration(parsed, &var, value) {
                    decls.tables.push(table);
                }
            } else if ENUM_BUILDERS.contains(&callee) {
                if let Some(schema_enum) = enum_declaration(parsed, value) {
                    decls.enums.push((var, schema_enum));
                }
            } else if callee == "relations" {
                let args = arguments(value);
                if let (Some(table), Some(body)) = (args.first(), args.get(1)) {
                    decls.relations.push(RelationsDecl {
                        table_var: parsed.node_text(*table).to_string(),
                        body: parsed.node_text(*body).to_string(),
                    });
                }
            }
        }
    }
}

fn table_declaration(parsed: &ParsedFile, var: &str, call: Node<'_>) -> Option<TableDecl> {
    let args = arguments(call);
    let table_name = match args.first() {
        Some(n) if n.kind() == "string" => unquote(parsed.node_text(*n)),
        _ => var.to_string(),
    };
    let columns = args.get(1).filter(|n| n.kind() == "object")?;

    let mut entity = SchemaEntity {
        name: normalize_entity_name(&table_name),
        fields: Vec::new(),
        relations: Vec::new(),
    };
    let mut references = Vec::new();
    let mut unresolved_types = Vec::new();

    let mut cursor = columns.walk();
    for pair in columns.named_children(&mut cursor) {
        if pair.kind() != "pair" {
            continue;
        }
        let (Some(key), Some(value)) = (
            pair.child_by_field_name("key"),
            pair.child_by_field_name("value"),
        ) else {
            continue;
        };
        let field_name = unquote(parsed.node_text(key));
        let text = parsed.node_text(value);

        let head = COLUMN_HEAD
            .captures(text)
            .and_then(|c| c.get(1))
            .map_or("", |m| m.as_str());
        let field_type = match COLUMN_TYPES.get(head) {
            Some(mapped) => *mapped,
            None => {
                unresolved_types.push((entity.fields.len(), head.to_string()));
                "unknown"
            }
        };

        if let Some(target) = REFERENCES.captures(text).and_then(|c| c.get(1)) {
            references.push((field_name.clone(), target.as_str().to_string()));
        }

        entity.fields.push(SchemaField {
            name: field_name,
            field_type: field_type.to_string(),
            constraints: column_constraints(text),
        });
    }

    Some(TableDecl {
        var: var.to_string(),
        entity,
        references,
        unresolved_types,
    })
}

fn column_constraints(text: &str) -> Vec<String> {
    let mut constraints = Vec::new();
    if text.contains(".primaryKey(") {
        constraints.push("primary key".to_string());
    }
    if text.contains(".notNull(") {
        constraints.push("not null".to_string());
    }
    if text.contains(".unique(") {
        constraints.push("unique".to_string());
    }
    if text.contains(".defaultNow(") {
        constraints.push("@default(now())".to_string());
    } else if let Some(value) = DEFAULT_VALUE.captures(text).and_then(|c| c.get(1)) {
        constraints.push(format!("@default({})", value.as_str().trim()));
    }
    if text.contains(".$onUpdate") {
        constraints.push("auto-updated".to_string());
    }
    constraints
}

fn enum_declaration(parsed: &ParsedFile, call: Node<'_>) -> Option<SchemaEnum> {
    let args = arguments(call);
    let name = args.first().filter(|n| n.kind() == "string")?;
    let values = args
        .get(1)
        .filter(|n| n.kind() == "array")
        .map(|array| {
            let mut cursor = array.walk();
            let values: Vec<String> = array
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "string")
                .map(|n| unquote(parsed.node_text(n)))
                .collect();
            values
        })
        .unwrap_or_default();
    Some(SchemaEnum {
        name: unquote(parsed.node_text(*name)),
        values,
    })
}
