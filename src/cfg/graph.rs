//! Block arena and adjacency for the control-flow graph.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use serde::Serialize;

/// Index of a block in the graph arena. Rendered as `B<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

impl Serialize for BlockId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Structural role of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    MethodEntry { name: String, line: usize },
    MethodExit,
    IfCondition,
    ThenBranch,
    ElseBranch,
    IfMerge,
    WhileCondition,
    LoopBody,
    LoopExit,
    ForInit,
    ForCondition,
    ForUpdate,
    DoWhileBody,
    DoWhileCondition,
    SwitchExpression,
    /// A case label block; holds the display form (`case 1, 2`, `default`).
    Case(String),
    SwitchMerge,
    Break,
    Continue,
    /// Start of code that follows a return, jump, or infinite loop.
    Unreachable,
    /// Untagged block where control resumes (after a call or a labeled block).
    Continuation,
}

impl BlockKind {
    /// Header line of the block label, if the kind has one.
    pub fn tag(&self) -> Option<String> {
        let tag = match self {
            BlockKind::MethodEntry { name, line } => {
                return Some(format!("METHOD ENTRY: {}\nLine: {}", name, line))
            }
            BlockKind::Case(labels) => return Some(format!("CASE: {}", labels)),
            BlockKind::Continuation => return None,
            BlockKind::MethodExit => "METHOD EXIT",
            BlockKind::IfCondition => "IF CONDITION",
            BlockKind::ThenBranch => "THEN BRANCH",
            BlockKind::ElseBranch => "ELSE BRANCH",
            BlockKind::IfMerge => "IF MERGE",
            BlockKind::WhileCondition => "WHILE CONDITION",
            BlockKind::LoopBody => "LOOP BODY",
            BlockKind::LoopExit => "LOOP EXIT",
            BlockKind::ForInit => "FOR INIT",
            BlockKind::ForCondition => "FOR CONDITION",
            BlockKind::ForUpdate => "FOR UPDATE",
            BlockKind::DoWhileBody => "DO-WHILE BODY",
            BlockKind::DoWhileCondition => "DO-WHILE CONDITION",
            BlockKind::SwitchExpression => "SWITCH EXPRESSION",
            BlockKind::SwitchMerge => "SWITCH MERGE",
            BlockKind::Break => "BREAK",
            BlockKind::Continue => "CONTINUE",
            BlockKind::Unreachable => "UNREACHABLE",
        };
        Some(tag.to_string())
    }

    /// Short machine-readable name used in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::MethodEntry { .. } => "method_entry",
            BlockKind::MethodExit => "method_exit",
            BlockKind::IfCondition => "if_condition",
            BlockKind::ThenBranch => "then_branch",
            BlockKind::ElseBranch => "else_branch",
            BlockKind::IfMerge => "if_merge",
            BlockKind::WhileCondition => "while_condition",
            BlockKind::LoopBody => "loop_body",
            BlockKind::LoopExit => "loop_exit",
            BlockKind::ForInit => "for_init",
            BlockKind::ForCondition => "for_condition",
            BlockKind::ForUpdate => "for_update",
            BlockKind::DoWhileBody => "do_while_body",
            BlockKind::DoWhileCondition => "do_while_condition",
            BlockKind::SwitchExpression => "switch_expression",
            BlockKind::Case(_) => "case",
            BlockKind::SwitchMerge => "switch_merge",
            BlockKind::Break => "break",
            BlockKind::Continue => "continue",
            BlockKind::Unreachable => "unreachable",
            BlockKind::Continuation => "continuation",
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, BlockKind::MethodExit)
    }
}

/// One annotated source line: `L<n>: <text>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLine {
    pub line: usize,
    pub text: String,
}

impl fmt::Display for SourceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}: {}", self.line, self.text)
    }
}

/// A basic block: structural tag plus the source lines merged into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Key of the method whose translation created the block.
    pub method: Option<String>,
    /// Palette slot of the owning method.
    pub group: Option<usize>,
    pub lines: Vec<SourceLine>,
}

impl BasicBlock {
    /// Full display label: tag, then one line per annotation.
    pub fn label(&self) -> String {
        let mut parts: Vec<String> = self.kind.tag().into_iter().collect();
        parts.extend(self.lines.iter().map(|l| l.to_string()));
        if parts.is_empty() {
            return "BLOCK".to_string();
        }
        parts.join("\n")
    }
}

/// Arena of blocks with edges stored as per-source successor lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    blocks: Vec<BasicBlock>,
    successors: Vec<Vec<BlockId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, kind: BlockKind, method: Option<String>, group: Option<usize>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            id,
            kind,
            method,
            group,
            lines: Vec::new(),
        });
        self.successors.push(Vec::new());
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Append an annotated line to a block.
    pub fn annotate(&mut self, id: BlockId, line: SourceLine) {
        self.blocks[id.0].lines.push(line);
    }

    /// Add an edge. Returns false if the edge already existed.
    pub fn connect(&mut self, from: BlockId, to: BlockId) -> bool {
        let succ = &mut self.successors[from.0];
        if succ.contains(&to) {
            return false;
        }
        succ.push(to);
        true
    }

    pub fn has_edge(&self, from: BlockId, to: BlockId) -> bool {
        self.successors[from.0].contains(&to)
    }

    pub fn successors(&self, id: BlockId) -> &[BlockId] {
        &self.successors[id.0]
    }

    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.successors
            .iter()
            .enumerate()
            .filter(|(_, succ)| succ.contains(&id))
            .map(|(from, _)| BlockId(from))
            .collect()
    }

    /// All edges, ordered by source block then insertion.
    pub fn edges(&self) -> Vec<(BlockId, BlockId)> {
        self.successors
            .iter()
            .enumerate()
            .flat_map(|(from, succ)| succ.iter().map(move |to| (BlockId(from), *to)))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    /// Blocks reachable from `start`, `start` included.
    pub fn reachable_from(&self, start: BlockId) -> BTreeSet<BlockId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            queue.extend(self.successors(id).iter().copied());
        }
        seen
    }

    /// Blocks of the given kind, in creation order.
    pub fn blocks_of(&self, kind: &BlockKind) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| &b.kind == kind)
            .map(|b| b.id)
            .collect()
    }
}
