//! Control-flow graph construction.
//!
//! This module provides:
//! - `graph`: the block arena and edge store
//! - `builder`: the per-method translation engine and statement dispatcher
//! - `constructs`: if/else, loops, switch and labeled statements
//! - `calls`: method registry and interprocedural call inlining
//! - `termination`: static classification of loops as finite or infinite

pub mod builder;
mod calls;
mod constructs;
pub mod graph;
pub mod termination;

pub use builder::{BuildOptions, CfgBuilder, ControlFlowGraph, MethodRecord};
pub use calls::{CallFrame, CallStack};
pub use graph::{BasicBlock, BlockId, BlockKind, Graph, SourceLine};
pub use termination::{analyze_loop, is_always_false, LoopVerdict};

use crate::parser::ParsedSource;

/// Size of the method color palette; method groups cycle through it.
pub const GROUP_COUNT: usize = 15;

/// Build the graph of a parsed input, reporting lines as the caller wrote them.
pub fn build(parsed: &ParsedSource, options: BuildOptions) -> ControlFlowGraph {
    let options = options.with_line_offset(parsed.line_offset());
    CfgBuilder::new(parsed.unit(), parsed.text(), options).build()
}
