//! Source spans of classes and methods, recovered by brace counting over the
//! caller's original text.

use serde::Serialize;

use crate::parser::ast::TypeDecl;
use crate::parser::ParsedSource;

/// Source text of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSpan {
    pub name: String,
    /// Trimmed lines of the class joined with single spaces.
    pub code: String,
}

/// Source text of one method, lines kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSpan {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMethods {
    pub class: String,
    pub methods: Vec<MethodSpan>,
}

/// Class and method spans in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Structure {
    pub classes: Vec<ClassSpan>,
    pub methods: Vec<ClassMethods>,
}

impl Structure {
    pub fn class(&self, name: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.code.as_str())
    }

    pub fn methods_of(&self, class: &str) -> &[MethodSpan] {
        self.methods
            .iter()
            .find(|m| m.class == class)
            .map(|m| m.methods.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.methods.iter().all(|m| m.methods.is_empty())
    }
}

/// Line range `[start, end]` (0-based, inclusive) from `start` to the line
/// where the braces opened at or after it balance. `None` if no `{` occurs.
/// An unbalanced span runs to the last line.
fn brace_span(lines: &[&str], start: usize) -> Option<(usize, usize)> {
    let mut depth: i64 = 0;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        let open = line.matches('{').count() as i64;
        let close = line.matches('}').count() as i64;
        if !opened && open == 0 {
            continue;
        }
        opened = true;
        depth += open - close;
        if depth <= 0 {
            return Some((start, i));
        }
    }
    if opened && start < lines.len() {
        Some((start, lines.len() - 1))
    } else {
        None
    }
}

/// Class text starting at a 1-based original line.
pub fn class_span(lines: &[&str], line: usize) -> Option<String> {
    let (start, end) = brace_span(lines, line.checked_sub(1)?)?;
    let code = lines[start..=end]
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join(" ");
    Some(code.trim().to_string())
}

/// Method text starting at a 1-based original line.
pub fn method_span(lines: &[&str], line: usize) -> Option<String> {
    let (start, end) = brace_span(lines, line.checked_sub(1)?)?;
    Some(lines[start..=end].join("\n").trim().to_string())
}

/// The placeholder class a wrapped snippet was parsed inside.
fn is_wrapper(parsed: &ParsedSource, ty: &TypeDecl) -> bool {
    parsed.wrapped() && parsed.display_line(ty.line) == 0
}

/// Recover class and method spans from the caller's text.
///
/// The placeholder class of a wrapped snippet has no span of its own, but the
/// methods declared directly in the snippet are listed under its name.
pub fn extract_structure(parsed: &ParsedSource) -> Structure {
    let lines: Vec<&str> = parsed.original().lines().collect();
    let mut structure = Structure::default();

    for ty in parsed.unit().classes() {
        if !is_wrapper(parsed, ty) {
            if let Some(code) = class_span(&lines, parsed.display_line(ty.line)) {
                structure.classes.push(ClassSpan {
                    name: ty.name.clone(),
                    code,
                });
            }
        }

        let methods: Vec<MethodSpan> = ty
            .plain_methods()
            .filter(|m| m.body.is_some())
            .filter_map(|m| {
                method_span(&lines, parsed.display_line(m.line)).map(|code| MethodSpan {
                    name: m.name.clone(),
                    code,
                })
            })
            .collect();
        if !is_wrapper(parsed, ty) || !methods.is_empty() {
            structure.methods.push(ClassMethods {
                class: ty.name.clone(),
                methods,
            });
        }
    }
    structure
}
