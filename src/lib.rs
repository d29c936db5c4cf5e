//! Javaflow - control-flow graphs and class structure for Java.
//!
//! Javaflow parses Java compilation units, or bare fragments that it wraps
//! in a placeholder class, and derives:
//! - a block-level control-flow graph with calls inlined across methods and
//!   statically infinite loops left without an exit
//! - class and method source spans
//! - association, aggregation and composition between declared classes
//! - a class hierarchy outline, optionally annotated by a comment generator
//!
//! # Architecture
//!
//! - `parser`: tree-sitter Java parsing, lowering to an owned AST, snippet wrapping
//! - `cfg`: the graph builder, construct translators, loop termination and call linking
//! - `structure`: span extraction, relationship detection and the outline
//! - `comments`: the boundary to an external comment generator
//! - `render`: Graphviz DOT output with per-method colors
//! - `analysis`: per-file driver, parallel over directories
//! - `config`: YAML settings
//! - `report`: pretty and JSON output

pub mod analysis;
pub mod cfg;
pub mod cli;
pub mod comments;
pub mod config;
pub mod parser;
pub mod render;
pub mod report;
pub mod structure;

pub use analysis::{AnalysisContext, AnalysisError, FileAnalysis};
pub use cfg::{analyze_loop, build, BuildOptions, ControlFlowGraph, LoopVerdict};
pub use comments::{generate_comments, CommentGenerator, Comments};
pub use config::Settings;
pub use parser::{normalize, parse_source, JavaParser, ParsedSource, SyntaxError};
pub use render::{to_dot, Theme};
pub use structure::{detect_relationships, extract_structure, outline, Relationships, Structure};
