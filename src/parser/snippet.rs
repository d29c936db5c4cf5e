//! Snippet normalization.
//!
//! Users paste anything from a whole compilation unit to a handful of
//! statements. Fragments that are not a valid unit get wrapped in a
//! placeholder class, once, and every line-dependent result is shifted back
//! by the one line the wrapper adds.

use tracing::debug;

use super::{CompilationUnit, JavaParser, SyntaxError};
use crate::config::Settings;

/// Leading text that marks input as already being a class declaration.
const CLASS_PREFIXES: &[&str] = &[
    "class ",
    "public class ",
    "private class ",
    "protected class ",
    "abstract class ",
    "final class ",
];

/// Normalized source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    /// Whether the placeholder class was synthesized around the input.
    pub wrapped: bool,
}

impl Normalized {
    /// Lines the wrapper adds before the original first line.
    pub fn line_offset(&self) -> usize {
        if self.wrapped {
            1
        } else {
            0
        }
    }
}

fn wrap(source: &str, wrapper_class: &str) -> String {
    format!("public class {} {{\n{}\n}}", wrapper_class, source)
}

/// Normalize and parse in one step. The parse result is the final one: the
/// wrapped text's unit on a successful wrap, the original error otherwise.
fn prepare(
    source: &str,
    parser: &JavaParser,
    wrapper_class: &str,
) -> (Normalized, Result<CompilationUnit, SyntaxError>) {
    let unchanged = Normalized {
        text: source.to_string(),
        wrapped: false,
    };

    let trimmed = source.trim_start();
    if CLASS_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        let result = parser.parse(source);
        return (unchanged, result);
    }

    let original = match parser.parse(source) {
        Ok(unit) => return (unchanged, Ok(unit)),
        Err(err) => err,
    };

    if original.is_leading_statement() {
        debug!("type declaration expected on line 1, wrapping in {}", wrapper_class);
    } else {
        debug!(error = %original, "parse failed, retrying once wrapped in {}", wrapper_class);
    }

    let text = wrap(source, wrapper_class);
    match parser.parse(&text) {
        Ok(unit) => (
            Normalized {
                text,
                wrapped: true,
            },
            Ok(unit),
        ),
        Err(wrapped_err) => {
            debug!(error = %wrapped_err, "wrapped parse failed, keeping original text");
            (unchanged, Err(original))
        }
    }
}

/// Return `source` unchanged when it parses (or starts with a class
/// declaration), or wrapped in `public class <wrapper_class> { ... }` when
/// only the wrapped form parses.
pub fn normalize(source: &str, parser: &JavaParser, wrapper_class: &str) -> Normalized {
    prepare(source, parser, wrapper_class).0
}

/// A successfully parsed input together with its normalization.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    original: String,
    normalized: Normalized,
    unit: CompilationUnit,
}

impl ParsedSource {
    /// The text that was parsed.
    pub fn text(&self) -> &str {
        &self.normalized.text
    }

    /// The caller's text, before any wrapping.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn wrapped(&self) -> bool {
        self.normalized.wrapped
    }

    pub fn line_offset(&self) -> usize {
        self.normalized.line_offset()
    }

    pub fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    /// Map a line of the parsed text to the caller's line.
    pub fn display_line(&self, line: usize) -> usize {
        line.saturating_sub(self.line_offset())
    }
}

/// Normalize `source` and parse it. Failures report the original text's
/// syntax error.
pub fn parse_source(source: &str, settings: &Settings) -> Result<ParsedSource, SyntaxError> {
    let parser = JavaParser::new();
    let (normalized, result) = prepare(source, &parser, &settings.wrapper_class);
    let unit = result?;
    Ok(ParsedSource {
        original: source.to_string(),
        normalized,
        unit,
    })
}
