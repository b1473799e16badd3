//! Core traits for module analysis.

use thiserror::Error;

use super::{ParsedModule, Resolver};

/// Per-file failure. Recoverable: the file is skipped and the scan continues.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no analyzer handles {0}")]
    UnsupportedExtension(String),
    #[error("loading grammar: {0}")]
    Language(String),
    #[error("syntax error in {path} at {line}:{column}")]
    Syntax {
        path: String,
        line: usize,
        column: usize,
    },
    #[error("parser produced no tree for {0}")]
    NoTree(String),
}

/// Tree-sitter grammar a tree was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    TypeScript,
    /// TypeScript with JSX; also accepts plain JavaScript.
    Tsx,
}

impl Grammar {
    /// `.ts`, `.mts` and `.cts` use the TypeScript grammar, everything else TSX.
    pub fn for_path(path: &str) -> Self {
        if path.ends_with(".ts") || path.ends_with(".mts") || path.ends_with(".cts") {
            Grammar::TypeScript
        } else {
            Grammar::Tsx
        }
    }
}

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// This is kept separate from `ParsedModule` so several extraction passes
/// can share one parse.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// Project-relative path (for error reporting and role classification).
    pub path: String,
    pub grammar: Grammar,
}

impl ParsedFile {
    /// Get the source code as a string slice.
    pub fn source_str(&self) -> &str {
        std::str::from_utf8(&self.source).unwrap_or("")
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Language-specific module analyzer.
///
/// # Thread Safety
///
/// `tree_sitter::Parser` is not `Sync`, so implementations create a parser
/// per call. Analyzers themselves hold no state and are shared across the
/// rayon pool.
pub trait ModuleAnalyzer: Send + Sync {
    /// Returns the language identifier (e.g., "typescript", "vue").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse source text into a tree.
    ///
    /// A tree containing error or missing nodes is a `ParseError::Syntax`.
    fn parse(&self, path: &str, source: &[u8]) -> Result<ParsedFile, ParseError>;

    /// Extract module facts from a parsed file.
    fn extract_facts(
        &self,
        parsed: &ParsedFile,
        resolver: &Resolver,
    ) -> Result<ParsedModule, ParseError>;

    /// Parse and extract in one step.
    fn analyze(
        &self,
        path: &str,
        source: &str,
        resolver: &Resolver,
    ) -> Result<ParsedModule, ParseError> {
        let parsed = self.parse(path, source.as_bytes())?;
        self.extract_facts(&parsed, resolver)
    }

    /// Check if this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
