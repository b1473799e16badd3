//! Block-dialect schema parser (`model X { ... }`).

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::{
    entity_key, normalize_entity_name, Cardinality, Schema, SchemaDialect, SchemaEntity,
    SchemaEnum, SchemaField, SchemaRelation,
};

lazy_static! {
    static ref LINE_COMMENT: Regex = Regex::new(r"(?m)//.*$").unwrap();
    static ref BLOCK_HEADER: Regex =
        Regex::new(r"(?m)^\s*(model|enum)\s+(\w+)\s*\{").unwrap();
    static ref ATTRIBUTE: Regex =
        Regex::new(r"@([\w.]+)(\((?:[^()]|\([^()]*\))*\))?").unwrap();
}

/// A `model` or `enum` block with its raw body.
struct Block<'a> {
    keyword: &'a str,
    name: &'a str,
    body: &'a str,
}

/// Body of the block whose opening brace ends at `start`, up to the matching
/// close brace. Braces inside string literals are ignored. An unquoted `{`
/// before the close means the block is unterminated, so the next header is
/// never swallowed.
fn block_body(content: &str, start: usize) -> Option<&str> {
    let rest = &content[start..];
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => return None,
            '}' => return Some(&rest[..i]),
            _ => {}
        }
    }
    None
}

fn blocks(content: &str) -> Vec<Block<'_>> {
    BLOCK_HEADER
        .captures_iter(content)
        .filter_map(|caps| {
            let (keyword, name, header) = (caps.get(1)?, caps.get(2)?, caps.get(0)?);
            let body = block_body(content, header.end())?;
            Some(Block {
                keyword: keyword.as_str(),
                name: name.as_str(),
                body,
            })
        })
        .collect()
}

/// Parse block-dialect source. Malformed blocks are skipped.
pub fn parse_block_schema(content: &str) -> Schema {
    let content = LINE_COMMENT.replace_all(content, "");
    let blocks = blocks(&content);

    let declared: HashSet<String> = blocks
        .iter()
        .filter(|b| b.keyword == "model")
        .map(|b| entity_key(b.name))
        .collect();

    let mut schema = Schema {
        dialect: SchemaDialect::Block,
        ..Default::default()
    };

    for block in &blocks {
        if block.keyword == "model" {
            schema
                .entities
                .push(parse_model(block.name, block.body, &declared));
            continue;
        }
        let values = block
            .body
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .filter(|v| !v.starts_with('@'))
            .map(str::to_string)
            .collect();
        schema.enums.push(SchemaEnum {
            name: block.name.to_string(),
            values,
        });
    }

    schema.dedupe_entities();
    mark_many_to_many(&mut schema);
    schema
}

fn parse_model(name: &str, body: &str, declared: &HashSet<String>) -> SchemaEntity {
    let mut entity = SchemaEntity {
        name: normalize_entity_name(name),
        fields: Vec::new(),
        relations: Vec::new(),
    };

    for line in body.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('@') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(field_name), Some(raw_type)) = (parts.next(), parts.next()) else {
            continue;
        };

        let is_array = raw_type.ends_with("[]");
        let is_optional = raw_type.ends_with('?');
        let base_type = raw_type.trim_end_matches('?').trim_end_matches("[]");

        let attributes = &line[line.find('@').unwrap_or(line.len())..];
        let mut constraints = Vec::new();
        if is_optional {
            constraints.push("optional".to_string());
        }
        if is_array {
            constraints.push("array".to_string());
        }
        let mut explicit_relation = false;
        for attr in ATTRIBUTE.captures_iter(attributes) {
            let attr_name = attr.get(1).map_or("", |m| m.as_str());
            let args = attr.get(2).map_or("", |m| m.as_str());
            match attr_name {
                "id" => constraints.push("primary key".to_string()),
                "unique" => constraints.push("unique".to_string()),
                "updatedAt" => constraints.push("auto-updated".to_string()),
                "default" => constraints.push(format!("@default{args}")),
                "relation" => explicit_relation = true,
                other => constraints.push(format!("@{other}{args}")),
            }
        }

        if explicit_relation || declared.contains(&entity_key(base_type)) {
            entity.relations.push(SchemaRelation {
                field: field_name.to_string(),
                target: normalize_entity_name(base_type),
                cardinality: if is_array {
                    Cardinality::OneToMany
                } else {
                    Cardinality::OneToOne
                },
            });
        }

        entity.fields.push(SchemaField {
            name: field_name.to_string(),
            field_type: base_type.to_string(),
            constraints,
        });
    }
    entity
}

/// Array relations held on both sides become many-to-many.
fn mark_many_to_many(schema: &mut Schema) {
    let array_pairs: HashSet<(String, String)> = schema
        .entities
        .iter()
        .flat_map(|e| {
            e.relations
                .iter()
                .filter(|r| r.cardinality == Cardinality::OneToMany)
                .map(move |r| (entity_key(&e.name), entity_key(&r.target)))
        })
        .collect();

    for entity in &mut schema.entities {
        let own = entity_key(&entity.name);
        for relation in &mut entity.relations {
            let target = entity_key(&relation.target);
            if relation.cardinality == Cardinality::OneToMany
                && array_pairs.contains(&(target, own.clone()))
            {
                relation.cardinality = Cardinality::ManyToMany;
            }
        }
    }
}
