//! Java parsing front end.
//!
//! This module provides:
//! - `JavaParser`: strict tree-sitter adapter producing an owned AST
//! - `SyntaxError`: the structured error every parse failure surfaces as
//! - `snippet`: normalization of bare statement fragments into a parseable unit
//! - `ast`: the closed AST the analyses consume

use thiserror::Error;
use tree_sitter::{Language, Node, Parser as TsParser};

pub mod ast;
mod lower;
pub mod snippet;

pub use ast::CompilationUnit;
pub use snippet::{normalize, parse_source, Normalized, ParsedSource};

/// Description used when a top-level node is not a declaration. The snippet
/// normalizer keys off this text.
pub const EXPECTED_TYPE_DECLARATION: &str = "expected type declaration";

/// Maximum characters of offending source quoted in an error description.
const SNIPPET_CHARS: usize = 40;

/// A parse failure with a best-effort position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Java syntax error (line {}): {}", line_label(.line), .description)]
pub struct SyntaxError {
    /// 1-based line, when known.
    pub line: Option<usize>,
    /// 1-based column, when known.
    pub column: Option<usize>,
    pub description: String,
}

impl SyntaxError {
    pub fn new(line: Option<usize>, column: Option<usize>, description: impl Into<String>) -> Self {
        Self {
            line,
            column,
            description: description.into(),
        }
    }

    fn at(node: Node, description: impl Into<String>) -> Self {
        let pos = node.start_position();
        Self::new(Some(pos.row + 1), Some(pos.column + 1), description)
    }

    /// Whether this is the "type declaration expected on line 1" failure that
    /// marks a bare statement fragment.
    pub fn is_leading_statement(&self) -> bool {
        self.line == Some(1) && self.description.contains(EXPECTED_TYPE_DECLARATION)
    }
}

/// Render an optional line number, `unknown` when absent.
pub fn line_label(line: &Option<usize>) -> String {
    match line {
        Some(n) => n.to_string(),
        None => "unknown".to_string(),
    }
}

/// Strict Java parser over the tree-sitter grammar.
///
/// Unlike tree-sitter itself, which always returns a tree, `parse` rejects
/// any input containing error recovery nodes or top-level statements.
#[derive(Clone)]
pub struct JavaParser {
    language: Language,
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> Result<TsParser, SyntaxError> {
        let mut parser = TsParser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| SyntaxError::new(None, None, format!("failed to load Java grammar: {}", e)))?;
        Ok(parser)
    }

    /// Parse a compilation unit.
    pub fn parse(&self, source: &str) -> Result<CompilationUnit, SyntaxError> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| SyntaxError::new(None, None, "parser produced no tree"))?;
        let root = tree.root_node();

        let recovery = if root.has_error() {
            first_error(root, source)
        } else {
            None
        };
        let stray = first_stray_statement(root);
        let error = match (recovery, stray) {
            (Some(a), Some(b)) => Some(if position(&a) <= position(&b) { a } else { b }),
            (a, b) => a.or(b),
        };
        if let Some(err) = error {
            return Err(err);
        }

        Ok(lower::Lowering::new(source).unit(root))
    }
}

fn position(err: &SyntaxError) -> (usize, usize) {
    (err.line.unwrap_or(usize::MAX), err.column.unwrap_or(usize::MAX))
}

/// First ERROR or MISSING node in document order.
fn first_error(node: Node, source: &str) -> Option<SyntaxError> {
    if node.is_missing() {
        return Some(SyntaxError::at(node, format!("missing `{}`", node.kind())));
    }
    if node.is_error() {
        let text = node.utf8_text(source.as_bytes()).unwrap_or("");
        let first_line = text.lines().next().unwrap_or("").trim();
        let quoted: String = first_line.chars().take(SNIPPET_CHARS).collect();
        return Some(SyntaxError::at(node, format!("unexpected `{}`", quoted)));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(err) = first_error(child, source) {
                return Some(err);
            }
        }
    }
    None
}

/// First top-level node that is not a package, import, or type declaration.
fn first_stray_statement(root: Node) -> Option<SyntaxError> {
    let mut cursor = root.walk();
    let stray = root.named_children(&mut cursor).find(|n| {
        !matches!(
            n.kind(),
            "package_declaration"
                | "import_declaration"
                | "module_declaration"
                | "class_declaration"
                | "interface_declaration"
                | "enum_declaration"
                | "record_declaration"
                | "annotation_type_declaration"
                | "line_comment"
                | "block_comment"
                | "ERROR"
        )
    });
    stray.map(|n| SyntaxError::at(n, EXPECTED_TYPE_DECLARATION))
}
