//! Graph construction from parsed modules.

use std::collections::BTreeMap;

use crate::analysis::patterns::{is_hook_name, is_pascal_case, is_server_auth_marker, HTTP_METHODS};
use crate::analysis::roles::{primary_kind, route_path};
use crate::analysis::{ImportInfo, ImportKind, ModuleKind, ParsedModule, Resolver};
use crate::schema::Schema;

use super::{
    ComponentInfo, EdgeKind, ImportEdge, LibraryInfo, Module, ModuleMetadata, PageInfo,
    ProjectGraph, RouteHandlerInfo, NO_AUTH,
};

/// Assemble the graph in a single pass.
///
/// Modules are keyed by path; when two records share a path the first one
/// wins. The schema is attached as-is.
pub fn build_graph(modules: Vec<ParsedModule>, schema: Schema) -> ProjectGraph {
    let _span = tracing::info_span!("build_graph", modules = modules.len()).entered();

    let mut by_id: BTreeMap<String, ParsedModule> = BTreeMap::new();
    for module in modules {
        if by_id.contains_key(&module.path) {
            tracing::warn!(module = %module.path, "duplicate module id, keeping the first");
            continue;
        }
        by_id.insert(module.path.clone(), module);
    }

    let fallback = Resolver::new(by_id.keys().cloned());
    let mut edges = Vec::new();
    for module in by_id.values() {
        for import in &module.imports {
            let target = match &import.resolved {
                Some(id) if by_id.contains_key(id) => Some(id.clone()),
                _ if import.is_relative() => fallback.resolve(&module.path, &import.source),
                _ => None,
            };
            if let Some(to) = target {
                edges.push(ImportEdge {
                    from: module.path.clone(),
                    to,
                    kind: edge_kind(import),
                });
            }
        }
    }

    let mut used_by: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for edge in &edges {
        used_by
            .entry(edge.to.clone())
            .or_default()
            .push(edge.from.clone());
    }
    for importers in used_by.values_mut() {
        importers.sort();
        importers.dedup();
    }

    let mut graph = ProjectGraph {
        edges,
        schema,
        ..Default::default()
    };

    for (id, module) in by_id {
        let importers = used_by.get(&id).cloned().unwrap_or_default();

        if module.has_role(ModuleKind::Page) {
            graph.pages.push(page_info(&module));
        }
        if module.has_role(ModuleKind::RouteHandler) {
            graph.routes.push(route_info(&module));
        }
        if module.has_role(ModuleKind::Component) || module.has_role(ModuleKind::Hook) {
            graph.components.push(component_info(&module, importers.clone()));
        }
        if module.has_role(ModuleKind::Library) {
            graph.libraries.push(LibraryInfo {
                file: id.clone(),
                exports: module.exports.clone(),
                imports: module.imports.clone(),
                used_by: importers,
                env_vars: module.env_vars.clone(),
                side_effects: module.side_effects.clone(),
            });
        }

        let node = Module {
            id: id.clone(),
            kind: primary_kind(&module.roles),
            metadata: ModuleMetadata {
                name: display_name(&module),
                line_count: module.line_count,
                render_kind: module.render_kind,
                dangerous_patterns: module.dangerous_patterns,
            },
            roles: module.roles,
            exports: module.exports,
            imports: module.imports,
        };
        graph.nodes.insert(id, node);
    }
    graph.used_by = used_by;

    tracing::info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "graph built"
    );
    graph
}

fn edge_kind(import: &ImportInfo) -> EdgeKind {
    match import.kind {
        _ if import.is_type_only => EdgeKind::TypeImport,
        ImportKind::Static => EdgeKind::Import,
        ImportKind::ReExport => EdgeKind::ReExport,
        ImportKind::Dynamic => EdgeKind::Dynamic,
    }
}

/// Component or hook name, else the file stem.
fn display_name(module: &ParsedModule) -> String {
    let exported = |pred: fn(&str) -> bool| {
        module
            .exports
            .iter()
            .filter(|e| !e.is_type_only)
            .map(|e| e.name.as_str())
            .find(|name| pred(name))
    };
    exported(is_pascal_case)
        .or_else(|| exported(is_hook_name))
        .unwrap_or_else(|| module.file_stem())
        .to_string()
}

fn page_info(module: &ParsedModule) -> PageInfo {
    PageInfo {
        file: module.path.clone(),
        route_path: route_path(&module.path),
        render_kind: module.render_kind,
        auth: module
            .auth_signals
            .first()
            .cloned()
            .unwrap_or_else(|| NO_AUTH.to_string()),
        data_access: module.data_access.clone(),
        components: module.elements.clone(),
        api_calls: module.api_calls.clone(),
        params: module.query_params.clone(),
        i18n_namespace: module.i18n_namespace.clone(),
        data_fetching: module.data_fetching_export().map(str::to_string),
    }
}

fn route_info(module: &ParsedModule) -> RouteHandlerInfo {
    let exported: Vec<String> = module
        .exports
        .iter()
        .filter(|e| HTTP_METHODS.contains(&e.name.as_str()))
        .map(|e| e.name.clone())
        .collect();
    let methods = if !exported.is_empty() {
        exported
    } else if !module.request_methods.is_empty() {
        module.request_methods.clone()
    } else {
        vec!["ALL".to_string()]
    };

    let mut entities: Vec<String> = Vec::new();
    for access in &module.data_access {
        if !entities.contains(&access.entity) {
            entities.push(access.entity.clone());
        }
    }

    RouteHandlerInfo {
        file: module.path.clone(),
        route_path: route_path(&module.path),
        methods,
        auth: module
            .auth_signals
            .iter()
            .find(|m| is_server_auth_marker(m))
            .cloned()
            .unwrap_or_else(|| NO_AUTH.to_string()),
        entities,
        side_effects: module.side_effects.clone(),
    }
}

fn component_info(module: &ParsedModule, used_by: Vec<String>) -> ComponentInfo {
    ComponentInfo {
        file: module.path.clone(),
        name: display_name(module),
        render_kind: module.render_kind,
        state: module.state.clone(),
        hooks: module.hooks.clone(),
        api_calls: module.api_calls.clone(),
        side_effects: module.side_effects.clone(),
        env_vars: module.env_vars.clone(),
        renders: module.elements.clone(),
        used_by,
    }
}
