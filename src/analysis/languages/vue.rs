//! Vue single-file component analyzer.
//!
//! Script blocks are handed to the TypeScript analyzer; custom elements come
//! from the template by pattern matching.

use lazy_static::lazy_static;
use regex::Regex;

use super::TypeScriptAnalyzer;
use crate::analysis::{
    Grammar, ModuleAnalyzer, ModuleKind, ParseError, ParsedFile, ParsedModule, RenderKind,
    Resolver,
};

lazy_static! {
    static ref SCRIPT_BLOCK: Regex =
        Regex::new(r"(?s)<script\b([^>]*)>(.*?)</script>").unwrap();
    static ref LANG_ATTR: Regex = Regex::new(r#"\blang\s*=\s*["'](\w+)["']"#).unwrap();
    static ref TEMPLATE_BLOCK: Regex = Regex::new(r"(?s)<template\b[^>]*>(.*)</template>").unwrap();
    static ref PASCAL_TAG: Regex = Regex::new(r"<([A-Z][A-Za-z0-9]*)").unwrap();
    static ref KEBAB_TAG: Regex = Regex::new(r"<([a-z][a-z0-9]*(?:-[a-z0-9]+)+)").unwrap();
}

#[derive(Default)]
pub struct VueAnalyzer {
    script: TypeScriptAnalyzer,
}

struct ScriptSection {
    source: String,
    grammar: Grammar,
    setup: bool,
}

impl VueAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenate every script block. Offsets are not preserved.
    fn script_section(content: &str) -> ScriptSection {
        let mut source = String::new();
        let mut grammar = Grammar::Tsx;
        let mut setup = false;
        for caps in SCRIPT_BLOCK.captures_iter(content) {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            if attrs.split_whitespace().any(|a| a == "setup") {
                setup = true;
            }
            match LANG_ATTR.captures(attrs).and_then(|c| c.get(1)).map(|m| m.as_str()) {
                Some("ts") => grammar = Grammar::TypeScript,
                Some("tsx") => grammar = Grammar::Tsx,
                _ => {}
            }
            if let Some(body) = caps.get(2) {
                source.push_str(body.as_str());
                source.push('\n');
            }
        }
        ScriptSection {
            source,
            grammar,
            setup,
        }
    }

    /// Custom elements used in the template, PascalCase-normalized.
    pub fn template_elements(content: &str) -> Vec<String> {
        let Some(template) = TEMPLATE_BLOCK.captures(content).and_then(|c| c.get(1)) else {
            return Vec::new();
        };
        let mut tagged: Vec<(usize, String)> = PASCAL_TAG
            .captures_iter(template.as_str())
            .filter_map(|c| c.get(1))
            .map(|m| (m.start(), m.as_str().to_string()))
            .chain(
                KEBAB_TAG
                    .captures_iter(template.as_str())
                    .filter_map(|c| c.get(1))
                    .map(|m| (m.start(), kebab_to_pascal(m.as_str()))),
            )
            .collect();
        tagged.sort_by_key(|(offset, _)| *offset);

        let mut elements = Vec::new();
        for (_, name) in tagged {
            if !elements.contains(&name) {
                elements.push(name);
            }
        }
        elements
    }
}

fn kebab_to_pascal(tag: &str) -> String {
    tag.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

impl ModuleAnalyzer for VueAnalyzer {
    fn language_id(&self) -> &'static str {
        "vue"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["vue"]
    }

    fn parse(&self, path: &str, source: &[u8]) -> Result<ParsedFile, ParseError> {
        let content = String::from_utf8_lossy(source);
        let script = Self::script_section(&content);
        self.script
            .parse_with(path, script.grammar, script.source.as_bytes())
    }

    fn extract_facts(
        &self,
        parsed: &ParsedFile,
        resolver: &Resolver,
    ) -> Result<ParsedModule, ParseError> {
        self.script.extract_facts(parsed, resolver)
    }

    fn analyze(
        &self,
        path: &str,
        source: &str,
        resolver: &Resolver,
    ) -> Result<ParsedModule, ParseError> {
        let script = Self::script_section(source);
        let parsed = self
            .script
            .parse_with(path, script.grammar, script.source.as_bytes())?;
        let mut module = self.script.extract_facts(&parsed, resolver)?;

        for element in Self::template_elements(source) {
            if !module.elements.contains(&element) {
                module.elements.push(element);
            }
        }
        if script.setup {
            module.render_kind = RenderKind::Client;
        }
        // A single-file component is a component even without named exports.
        module.roles.remove(&ModuleKind::Library);
        module.roles.insert(ModuleKind::Component);
        module.line_count = source.lines().count();
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SFC: &str = r#"<template>
  <div>
    <TodoItem v-for="t in todos" :key="t.id" />
    <base-button @click="add">Add</base-button>
    <TodoItem />
  </div>
</template>

<script setup lang="ts">
import { ref, onMounted } from 'vue'
import TodoItem from './TodoItem.vue'
const todos = ref([])
onMounted(async () => {
  const res = await fetch('/api/todos')
})
</script>
"#;

    #[test]
    fn test_vue_sfc_facts() {
        let resolver = Resolver::new(["components/TodoItem.vue"]);
        let module = VueAnalyzer::new()
            .analyze("components/TodoList.vue", SFC, &resolver)
            .unwrap();

        assert_eq!(module.render_kind, RenderKind::Client);
        assert_eq!(module.elements, vec!["TodoItem", "BaseButton"]);
        assert_eq!(module.state[0].name, "todos");
        assert_eq!(module.side_effects, vec!["onMounted"]);
        assert_eq!(module.api_calls[0].endpoint, "/api/todos");
        assert_eq!(
            module.imports[1].resolved.as_deref(),
            Some("components/TodoItem.vue")
        );
        assert!(module.has_role(ModuleKind::Component));
        assert_eq!(module.line_count, SFC.lines().count());
    }

    #[test]
    fn test_options_api_component_is_server_rendered() {
        let src = "<template><p>hi</p></template>\n<script>\nexport default { name: 'Hello' }\n</script>\n";
        let module = VueAnalyzer::new()
            .analyze("src/Hello.vue", src, &Resolver::default())
            .unwrap();
        assert_eq!(module.render_kind, RenderKind::Server);
        assert!(module.elements.is_empty());
        assert!(module.has_role(ModuleKind::Component));
    }

    #[test]
    fn test_kebab_to_pascal() {
        assert_eq!(kebab_to_pascal("base-button"), "BaseButton");
        assert_eq!(kebab_to_pascal("x-y-z"), "XYZ");
    }
}
