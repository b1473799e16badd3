//! TypeScript / JavaScript module analyzer using tree-sitter.
//!
//! `.ts`, `.mts` and `.cts` files use the TypeScript grammar; `.tsx`, `.js`
//! and `.jsx` use the TSX grammar, which accepts plain JavaScript and JSX.

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::patterns::{self, is_hook_name, LIFECYCLE_HOOKS};
use crate::analysis::roles;
use crate::analysis::{
    ExportInfo, ExportKind, Grammar, ImportInfo, ImportKind, ModuleAnalyzer, ParseError,
    ParsedFile, ParsedModule, RenderKind, Resolver, StateVar,
};

/// Markup element names (TSX grammar only).
const ELEMENT_QUERY: &str = r#"
(jsx_opening_element
  name: (_) @element)

(jsx_self_closing_element
  name: (_) @element)
"#;

/// Local state declarations.
const STATE_QUERY: &str = r#"
; const [count, setCount] = useState(0)
(variable_declarator
  name: (array_pattern . (identifier) @state_name)
  value: (call_expression
    function: (_) @state_fn
    arguments: (arguments) @state_args)
) @state

; const count = ref(0)
(variable_declarator
  name: (identifier) @ref_name
  value: (call_expression
    function: (identifier) @ref_fn
    arguments: (arguments) @ref_args)
) @ref
"#;

const STATE_PRIMITIVES: &[&str] = &["useState", "React.useState"];
const REACTIVE_PRIMITIVES: &[&str] = &["ref", "reactive", "shallowRef"];

pub struct TypeScriptAnalyzer {
    typescript: Language,
    tsx: Language,
}

impl Default for TypeScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Call-site facts gathered in a single tree walk.
#[derive(Default)]
struct CallScan {
    hooks: Vec<String>,
    side_effects: Vec<String>,
    api_calls: Vec<crate::analysis::ApiCall>,
    data_access: Vec<crate::analysis::DataAccess>,
    dangerous: Vec<String>,
    dynamic_imports: Vec<String>,
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

/// Whether `node` has an anonymous child token of the given kind.
fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

/// Pre-order walk over every node under `root`.
fn walk_nodes<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// 1-based position of the first error or missing node.
fn first_error_position(root: Node<'_>) -> (usize, usize) {
    let mut position = None;
    walk_nodes(root, |node| {
        if position.is_none() && (node.is_error() || node.is_missing()) {
            let point = node.start_position();
            position = Some((point.row + 1, point.column + 1));
        }
    });
    position.unwrap_or((1, 1))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl TypeScriptAnalyzer {
    pub fn new() -> Self {
        Self {
            typescript: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            tsx: tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    fn language(&self, grammar: Grammar) -> &Language {
        match grammar {
            Grammar::TypeScript => &self.typescript,
            Grammar::Tsx => &self.tsx,
        }
    }

    /// Parse with an explicit grammar rather than the one implied by the
    /// path (used for embedded script blocks).
    pub(crate) fn parse_with(
        &self,
        path: &str,
        grammar: Grammar,
        source: &[u8],
    ) -> Result<ParsedFile, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(self.language(grammar))
            .map_err(|e| ParseError::Language(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::NoTree(path.to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error_position(root);
            return Err(ParseError::Syntax {
                path: path.to_string(),
                line,
                column,
            });
        }

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string(),
            grammar,
        })
    }

    fn extract(&self, parsed: &ParsedFile, resolver: &Resolver) -> Result<ParsedModule, ParseError> {
        let content = parsed.source_str();
        let mut module = ParsedModule::empty(&parsed.path);

        let (mut imports, mut exports) = self.extract_declarations(parsed);
        let scan = self.scan_calls(parsed);

        for source in &scan.dynamic_imports {
            imports.push(ImportInfo {
                source: source.clone(),
                specifiers: vec!["*".to_string()],
                is_type_only: false,
                kind: ImportKind::Dynamic,
                resolved: None,
            });
        }
        for import in &mut imports {
            import.resolved = resolver.resolve(&parsed.path, &import.source);
        }
        exports.dedup_by(|a, b| a.name == b.name && a.kind == b.kind);

        module.render_kind = self.render_kind(parsed);
        module.roles = roles::classify(&parsed.path, &exports);
        module.state = self.extract_state(parsed)?;
        if parsed.grammar == Grammar::Tsx {
            module.elements = self.extract_elements(parsed)?;
        }

        let mut dangerous = scan.dangerous;
        for pattern in patterns::dangerous_text_patterns(content) {
            push_unique(&mut dangerous, pattern);
        }

        module.imports = imports;
        module.exports = exports;
        module.hooks = scan.hooks;
        module.side_effects = scan.side_effects;
        module.api_calls = scan.api_calls;
        module.data_access = scan.data_access;
        module.dangerous_patterns = dangerous;
        module.env_vars = patterns::env_vars(content);
        module.auth_signals = patterns::auth_signals(content);
        module.request_methods = patterns::request_methods(content);
        module.query_params = patterns::query_params(content);
        module.i18n_namespace = patterns::i18n_namespace(content);
        module.line_count = content.lines().count();
        Ok(module)
    }

    /// A leading `'use client'` directive marks the module for the client.
    fn render_kind(&self, parsed: &ParsedFile) -> RenderKind {
        let root = parsed.tree.root_node();
        let mut cursor = root.walk();
        let first = root
            .named_children(&mut cursor)
            .find(|n| n.kind() != "comment" && n.kind() != "hash_bang_line");
        let is_client = first
            .filter(|n| n.kind() == "expression_statement")
            .and_then(|n| n.named_child(0))
            .filter(|n| n.kind() == "string")
            .map(|n| unquote(parsed.node_text(n)) == "use client")
            .unwrap_or(false);
        if is_client {
            RenderKind::Client
        } else {
            RenderKind::Server
        }
    }

    /// Top-level imports, re-exports and exports.
    fn extract_declarations(&self, parsed: &ParsedFile) -> (Vec<ImportInfo>, Vec<ExportInfo>) {
        let root = parsed.tree.root_node();
        let mut imports = Vec::new();
        let mut exports = Vec::new();

        let mut cursor = root.walk();
        for stmt in root.named_children(&mut cursor) {
            match stmt.kind() {
                "import_statement" => {
                    if let Some(import) = self.import_statement(parsed, stmt) {
                        imports.push(import);
                    }
                }
                "export_statement" => {
                    if let Some(import) = self.reexport_statement(parsed, stmt, &mut exports) {
                        imports.push(import);
                    } else {
                        self.export_statement(parsed, stmt, &mut exports);
                    }
                }
                _ => {}
            }
        }
        (imports, exports)
    }

    fn import_statement(&self, parsed: &ParsedFile, stmt: Node<'_>) -> Option<ImportInfo> {
        let source = unquote(parsed.node_text(stmt.child_by_field_name("source")?)).to_string();
        let mut specifiers = Vec::new();

        let mut cursor = stmt.walk();
        for clause in stmt.named_children(&mut cursor) {
            if clause.kind() != "import_clause" {
                continue;
            }
            let mut inner = clause.walk();
            for part in clause.named_children(&mut inner) {
                match part.kind() {
                    "identifier" => specifiers.push("default".to_string()),
                    "namespace_import" => {
                        let local = part
                            .named_child(0)
                            .map(|n| parsed.node_text(n))
                            .unwrap_or("");
                        specifiers.push(format!("* as {local}"));
                    }
                    "named_imports" => {
                        let mut specs = part.walk();
                        for spec in part.named_children(&mut specs) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            if let Some(name) = spec.child_by_field_name("name") {
                                specifiers.push(unquote(parsed.node_text(name)).to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(ImportInfo {
            source,
            specifiers,
            is_type_only: has_token(stmt, "type"),
            kind: ImportKind::Static,
            resolved: None,
        })
    }

    /// `export ... from '...'`. Named re-exports also become exports of this module.
    fn reexport_statement(
        &self,
        parsed: &ParsedFile,
        stmt: Node<'_>,
        exports: &mut Vec<ExportInfo>,
    ) -> Option<ImportInfo> {
        let source = unquote(parsed.node_text(stmt.child_by_field_name("source")?)).to_string();
        let is_type_only = has_token(stmt, "type");
        let mut specifiers = Vec::new();

        let mut cursor = stmt.walk();
        for child in stmt.named_children(&mut cursor) {
            match child.kind() {
                "export_clause" => {
                    let mut specs = child.walk();
                    for spec in child.named_children(&mut specs) {
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let name = parsed.node_text(name).to_string();
                        let exported = spec
                            .child_by_field_name("alias")
                            .map(|a| parsed.node_text(a).to_string())
                            .unwrap_or_else(|| name.clone());
                        exports.push(ExportInfo {
                            name: exported,
                            kind: ExportKind::Variable,
                            is_type_only,
                            signature: None,
                        });
                        specifiers.push(name);
                    }
                }
                "namespace_export" => specifiers.push("*".to_string()),
                _ => {}
            }
        }
        if specifiers.is_empty() {
            // export * from '...'
            specifiers.push("*".to_string());
        }

        Some(ImportInfo {
            source,
            specifiers,
            is_type_only,
            kind: ImportKind::ReExport,
            resolved: None,
        })
    }

    fn export_statement(&self, parsed: &ParsedFile, stmt: Node<'_>, exports: &mut Vec<ExportInfo>) {
        let is_default = has_token(stmt, "default");
        let statement_type_only = has_token(stmt, "type");

        if let Some(decl) = stmt.child_by_field_name("declaration") {
            for mut export in self.declaration_exports(parsed, decl) {
                if is_default {
                    export.kind = ExportKind::Default;
                }
                exports.push(export);
            }
            return;
        }

        if is_default {
            let value = stmt.child_by_field_name("value");
            let name = value
                .and_then(|v| match v.kind() {
                    "identifier" => Some(v),
                    _ => v.child_by_field_name("name"),
                })
                .map(|n| parsed.node_text(n).to_string())
                .unwrap_or_else(|| "default".to_string());
            exports.push(ExportInfo {
                name,
                kind: ExportKind::Default,
                is_type_only: false,
                signature: None,
            });
            return;
        }

        // export { a, b as c }
        let mut cursor = stmt.walk();
        for clause in stmt.named_children(&mut cursor) {
            if clause.kind() != "export_clause" {
                continue;
            }
            let mut specs = clause.walk();
            for spec in clause.named_children(&mut specs) {
                let exported = spec
                    .child_by_field_name("alias")
                    .or_else(|| spec.child_by_field_name("name"))
                    .map(|n| parsed.node_text(n).to_string());
                if let Some(name) = exported {
                    exports.push(ExportInfo {
                        name,
                        kind: ExportKind::Variable,
                        is_type_only: statement_type_only,
                        signature: None,
                    });
                }
            }
        }
    }

    fn declaration_exports(&self, parsed: &ParsedFile, decl: Node<'_>) -> Vec<ExportInfo> {
        let named = |kind: ExportKind, type_only: bool, signature: Option<String>| {
            decl.child_by_field_name("name").map(|n| ExportInfo {
                name: parsed.node_text(n).to_string(),
                kind,
                is_type_only: type_only,
                signature,
            })
        };

        match decl.kind() {
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                named(ExportKind::Function, false, self.signature(parsed, decl))
                    .into_iter()
                    .collect()
            }
            "class_declaration" | "abstract_class_declaration" => {
                named(ExportKind::Class, false, None).into_iter().collect()
            }
            "interface_declaration" => named(ExportKind::Interface, true, None).into_iter().collect(),
            "type_alias_declaration" => named(ExportKind::Type, true, None).into_iter().collect(),
            "enum_declaration" => named(ExportKind::Enum, false, None).into_iter().collect(),
            "lexical_declaration" | "variable_declaration" => {
                let mut out = Vec::new();
                let mut cursor = decl.walk();
                for declarator in decl.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let Some(name) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    if name.kind() != "identifier" {
                        continue;
                    }
                    let value = declarator.child_by_field_name("value");
                    let function = value
                        .filter(|v| matches!(v.kind(), "arrow_function" | "function_expression"));
                    out.push(ExportInfo {
                        name: parsed.node_text(name).to_string(),
                        kind: if function.is_some() {
                            ExportKind::Function
                        } else {
                            ExportKind::Variable
                        },
                        is_type_only: false,
                        signature: function.and_then(|f| self.signature(parsed, f)),
                    });
                }
                out
            }
            _ => Vec::new(),
        }
    }

    /// `(a: A, b: B) => R` from a function-like node.
    fn signature(&self, parsed: &ParsedFile, func: Node<'_>) -> Option<String> {
        let params = func
            .child_by_field_name("parameters")
            .map(|p| collapse_whitespace(parsed.node_text(p)))
            .or_else(|| {
                // `x => ...` has a bare identifier parameter.
                func.child_by_field_name("parameter")
                    .map(|p| format!("({})", parsed.node_text(p)))
            })?;
        let ret = func
            .child_by_field_name("return_type")
            .map(|r| collapse_whitespace(parsed.node_text(r).trim_start_matches(':').trim()));
        Some(match ret {
            Some(ret) => format!("{params} => {ret}"),
            None => params,
        })
    }

    /// Hooks, side effects, API calls, data access and dangerous calls.
    fn scan_calls(&self, parsed: &ParsedFile) -> CallScan {
        let mut scan = CallScan::default();
        walk_nodes(parsed.tree.root_node(), |node| match node.kind() {
            "call_expression" => self.visit_call(parsed, node, &mut scan),
            "new_expression" => {
                let constructor = node
                    .child_by_field_name("constructor")
                    .map(|c| parsed.node_text(c));
                if constructor == Some("Function") {
                    push_unique(&mut scan.dangerous, "new Function()".to_string());
                }
            }
            _ => {}
        });
        scan
    }

    fn visit_call(&self, parsed: &ParsedFile, node: Node<'_>, scan: &mut CallScan) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let arguments = node.child_by_field_name("arguments");

        let callee = match function.kind() {
            "identifier" => parsed.node_text(function),
            "import" => {
                if let Some(source) = arguments.and_then(|a| first_string_argument(parsed, a)) {
                    push_unique(&mut scan.dynamic_imports, source);
                }
                return;
            }
            "member_expression" => {
                let text = parsed.node_text(function);
                if let Some(access) = patterns::orm_access(text) {
                    push_unique(&mut scan.side_effects, access.marker());
                    push_unique(&mut scan.data_access, access);
                    return;
                }
                let object = function.child_by_field_name("object").map(|o| parsed.node_text(o));
                let property = function
                    .child_by_field_name("property")
                    .map(|p| parsed.node_text(p))
                    .unwrap_or("");
                match object {
                    Some("document") if matches!(property, "write" | "writeln") => {
                        push_unique(&mut scan.dangerous, "document.write()".to_string());
                        return;
                    }
                    Some("React") => property,
                    _ => return,
                }
            }
            _ => return,
        };

        if is_hook_name(callee) {
            push_unique(&mut scan.hooks, callee.to_string());
        }
        if LIFECYCLE_HOOKS.contains(&callee) {
            push_unique(&mut scan.side_effects, callee.to_string());
        }
        match callee {
            "fetch" | "$fetch" | "useFetch" => {
                if let Some(call) = arguments.and_then(|a| patterns::fetch_call(parsed.node_text(a))) {
                    push_unique(&mut scan.api_calls, call);
                }
            }
            "eval" => push_unique(&mut scan.dangerous, "eval()".to_string()),
            "exec" | "execSync" => push_unique(&mut scan.dangerous, "exec()".to_string()),
            "require" => {
                if let Some(source) = arguments.and_then(|a| first_string_argument(parsed, a)) {
                    push_unique(&mut scan.dynamic_imports, source);
                }
            }
            _ => {}
        }
    }

    fn extract_state(&self, parsed: &ParsedFile) -> Result<Vec<StateVar>, ParseError> {
        let query = Query::new(self.language(parsed.grammar), STATE_QUERY)
            .map_err(|e| ParseError::Language(e.to_string()))?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut state = Vec::new();
        while let Some(m) = matches.next() {
            let mut name = None;
            let mut primitive = "";
            let mut args = None;
            let mut reactive = false;

            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                match capture_name {
                    "state_name" => name = Some(parsed.node_text(capture.node)),
                    "ref_name" => {
                        name = Some(parsed.node_text(capture.node));
                        reactive = true;
                    }
                    "state_fn" | "ref_fn" => primitive = parsed.node_text(capture.node),
                    "state_args" | "ref_args" => args = Some(capture.node),
                    _ => {}
                }
            }

            let accepted = if reactive {
                REACTIVE_PRIMITIVES.contains(&primitive)
            } else {
                STATE_PRIMITIVES.contains(&primitive)
            };
            if let (true, Some(name)) = (accepted, name) {
                let initial_value = args
                    .and_then(|a| a.named_child(0))
                    .map(|v| collapse_whitespace(parsed.node_text(v)));
                state.push(StateVar {
                    name: name.to_string(),
                    initial_value,
                });
            }
        }
        Ok(state)
    }

    /// Capitalized markup elements, in first-seen order.
    fn extract_elements(&self, parsed: &ParsedFile) -> Result<Vec<String>, ParseError> {
        let query =
            Query::new(&self.tsx, ELEMENT_QUERY).map_err(|e| ParseError::Language(e.to_string()))?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut elements = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let tag = parsed.node_text(capture.node);
                // <Modal.Header> counts as Modal
                let head = tag.split('.').next().unwrap_or(tag);
                if head.starts_with(|c: char| c.is_ascii_uppercase()) {
                    push_unique(&mut elements, head.to_string());
                }
            }
        }
        Ok(elements)
    }
}

fn first_string_argument(parsed: &ParsedFile, arguments: Node<'_>) -> Option<String> {
    let first = arguments.named_child(0)?;
    match first.kind() {
        "string" => Some(unquote(parsed.node_text(first)).to_string()),
        "template_string" if first.named_child_count() == 0 => {
            Some(unquote(parsed.node_text(first)).to_string())
        }
        _ => None,
    }
}

impl ModuleAnalyzer for TypeScriptAnalyzer {
    fn language_id(&self) -> &'static str {
        "typescript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "js", "jsx", "mts", "cts"]
    }

    fn parse(&self, path: &str, source: &[u8]) -> Result<ParsedFile, ParseError> {
        self.parse_with(path, Grammar::for_path(path), source)
    }

    fn extract_facts(
        &self,
        parsed: &ParsedFile,
        resolver: &Resolver,
    ) -> Result<ParsedModule, ParseError> {
        self.extract(parsed, resolver)
    }
}
