//! Basic-block builder.
//!
//! The builder registers every method up front, then translates each method
//! body statement by statement. Straight-line statements are merged into the
//! current block; control constructs (see `constructs.rs`) open new blocks and
//! hand the cursor back when they are done. Calls are spliced in by
//! `calls.rs`.
//!
//! Each translation carries a cursor with a flow state. A halted cursor (after
//! a return, a jump, or a statically infinite loop) never gets outgoing
//! edges; the next statement opens an `UNREACHABLE` island instead, so the
//! structure of dead code is still visible without being wired into the
//! graph.

use serde::Serialize;
use tracing::debug;

use super::calls::{CallFrame, CallStack, MethodTable};
use super::graph::{BlockId, BlockKind, Graph, SourceLine};
use crate::config::Settings;
use crate::parser::ast::{CompilationUnit, ExprKind, Stmt, StmtKind};

/// Knobs for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Translate constructors as standalone subgraphs.
    pub include_constructors: bool,
    /// Maximum characters of source quoted per annotated line.
    pub max_line_chars: usize,
    /// Lines to subtract when reporting line numbers (1 for wrapped snippets).
    pub line_offset: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            include_constructors: true,
            max_line_chars: 100,
            line_offset: 0,
        }
    }
}

impl BuildOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            include_constructors: settings.include_constructors,
            max_line_chars: settings.max_line_chars,
            line_offset: 0,
        }
    }

    pub fn with_line_offset(mut self, offset: usize) -> Self {
        self.line_offset = offset;
        self
    }
}

/// A method's place in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodRecord {
    /// Unique key, `Class.name` (`Class.name#2` for later overloads).
    pub key: String,
    pub name: String,
    pub class: String,
    /// Caller-visible declaration line.
    pub line: usize,
    /// `None` for methods without a body.
    pub entry: Option<BlockId>,
    /// Exit blocks reachable from the entry.
    pub exits: Vec<BlockId>,
    /// Palette slot, assigned cyclically in declaration order.
    pub group: usize,
}

/// Finished graph plus the method index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFlowGraph {
    pub graph: Graph,
    pub methods: Vec<MethodRecord>,
}

impl ControlFlowGraph {
    pub fn method(&self, key: &str) -> Option<&MethodRecord> {
        self.methods.iter().find(|m| m.key == key)
    }

    /// First method registered under a bare name.
    pub fn method_named(&self, name: &str) -> Option<&MethodRecord> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BuildState {
    Pending,
    Building,
    Built,
}

/// Whether control can actually be at a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    /// Reachable from the method entry.
    Live,
    /// Inside an island no live path reaches.
    Detached,
    /// Control cannot continue from here.
    Halted,
}

impl Flow {
    pub(super) fn join(self, other: Flow) -> Flow {
        match (self, other) {
            (Flow::Live, _) | (_, Flow::Live) => Flow::Live,
            (Flow::Detached, _) | (_, Flow::Detached) => Flow::Detached,
            _ => Flow::Halted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Cursor {
    pub(super) block: BlockId,
    pub(super) flow: Flow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ScopeKind {
    Loop,
    Switch,
    Labeled,
}

/// A construct `break`/`continue` can target.
#[derive(Debug)]
pub(super) struct JumpScope {
    pub(super) kind: ScopeKind,
    pub(super) label: Option<String>,
    pub(super) breaks: Vec<Cursor>,
    pub(super) continues: Vec<Cursor>,
}

impl JumpScope {
    pub(super) fn new(kind: ScopeKind, label: Option<&str>) -> Self {
        Self {
            kind,
            label: label.map(str::to_string),
            breaks: Vec::new(),
            continues: Vec::new(),
        }
    }
}

/// Translation state of one method body.
pub(super) struct Walk {
    pub(super) cursor: Cursor,
    pub(super) scopes: Vec<JumpScope>,
    /// Exit blocks created while live.
    pub(super) exits: Vec<BlockId>,
    pub(super) stack: CallStack,
}

impl Walk {
    fn new(entry: BlockId, stack: CallStack) -> Self {
        Self {
            cursor: Cursor {
                block: entry,
                flow: Flow::Live,
            },
            scopes: Vec::new(),
            exits: Vec::new(),
            stack,
        }
    }

    /// Innermost scope a jump resolves to.
    pub(super) fn find_scope(&self, label: Option<&str>, is_continue: bool) -> Option<usize> {
        self.scopes.iter().rposition(|s| match (label, is_continue) {
            (Some(l), false) => s.label.as_deref() == Some(l),
            (Some(l), true) => s.kind == ScopeKind::Loop && s.label.as_deref() == Some(l),
            (None, false) => matches!(s.kind, ScopeKind::Loop | ScopeKind::Switch),
            (None, true) => s.kind == ScopeKind::Loop,
        })
    }
}

/// Builds the control-flow graph of one compilation unit.
pub struct CfgBuilder<'a> {
    lines: Vec<&'a str>,
    options: BuildOptions,
    pub(super) graph: Graph,
    pub(super) table: MethodTable<'a>,
}

impl<'a> CfgBuilder<'a> {
    /// `text` is the exact text `unit` was parsed from.
    pub fn new(unit: &'a CompilationUnit, text: &'a str, options: BuildOptions) -> Self {
        let table = MethodTable::register(unit, options.include_constructors, options.line_offset);
        Self {
            lines: text.lines().collect(),
            options,
            graph: Graph::new(),
            table,
        }
    }

    /// Translate every method not already built through a call.
    pub fn build(mut self) -> ControlFlowGraph {
        for idx in 0..self.table.decls.len() {
            if self.table.states[idx] == BuildState::Pending {
                self.build_method(idx, &CallStack::new());
            }
        }
        ControlFlowGraph {
            graph: self.graph,
            methods: self.table.records,
        }
    }

    pub(super) fn build_method(&mut self, idx: usize, stack: &CallStack) {
        let decl = self.table.decls[idx];
        let Some(body) = decl.body.as_ref() else {
            self.table.states[idx] = BuildState::Built;
            return;
        };
        self.table.states[idx] = BuildState::Building;

        let record = &self.table.records[idx];
        let line = record.line;
        let stack = stack.pushed(CallFrame {
            method: record.key.clone(),
            class: record.class.clone(),
            group: record.group,
        });
        let entry = self.new_block(
            BlockKind::MethodEntry {
                name: decl.name.clone(),
                line,
            },
            &stack,
        );
        self.table.records[idx].entry = Some(entry);

        let mut walk = Walk::new(entry, stack);
        self.translate_block(body, &mut walk);

        if walk.cursor.flow != Flow::Halted {
            let exit = self.new_block(BlockKind::MethodExit, &walk.stack);
            self.link(&walk, exit);
            if walk.cursor.flow == Flow::Live {
                walk.exits.push(exit);
            }
        }

        let exits = walk.exits;
        for cont in std::mem::take(&mut self.table.pending[idx]) {
            for exit in &exits {
                self.graph.connect(*exit, cont);
            }
        }
        debug!(
            method = %self.table.records[idx].key,
            exits = exits.len(),
            depth = walk.stack.depth(),
            "built method"
        );
        self.table.records[idx].exits = exits;
        self.table.states[idx] = BuildState::Built;
    }

    /// Create a block owned by the method on top of `stack`.
    pub(super) fn new_block(&mut self, kind: BlockKind, stack: &CallStack) -> BlockId {
        let (method, group) = match stack.top() {
            Some(frame) => (Some(frame.method.clone()), Some(frame.group)),
            None => (None, None),
        };
        self.graph.add_block(kind, method, group)
    }

    /// Draw an edge from the cursor unless control cannot be there.
    pub(super) fn link(&mut self, walk: &Walk, to: BlockId) {
        if walk.cursor.flow != Flow::Halted {
            self.graph.connect(walk.cursor.block, to);
        }
    }

    /// Link to `to` and move the cursor there.
    pub(super) fn advance(&mut self, walk: &mut Walk, to: BlockId) {
        self.link(walk, to);
        walk.cursor.block = to;
    }

    /// Open an island if the cursor is halted.
    pub(super) fn resume(&mut self, walk: &mut Walk) {
        if walk.cursor.flow == Flow::Halted {
            let island = self.new_block(BlockKind::Unreachable, &walk.stack);
            walk.cursor = Cursor {
                block: island,
                flow: Flow::Detached,
            };
        }
    }

    /// Join the given flows into a new block. If none of them can carry
    /// control, no block is created and the walk halts.
    pub(super) fn merge(&mut self, kind: BlockKind, incoming: &[Cursor], walk: &mut Walk) -> Option<BlockId> {
        let open: Vec<Cursor> = incoming
            .iter()
            .copied()
            .filter(|c| c.flow != Flow::Halted)
            .collect();
        if open.is_empty() {
            walk.cursor.flow = Flow::Halted;
            return None;
        }

        let block = self.new_block(kind, &walk.stack);
        let mut flow = Flow::Halted;
        for c in &open {
            self.graph.connect(c.block, block);
            flow = flow.join(c.flow);
        }
        walk.cursor = Cursor { block, flow };
        Some(block)
    }

    pub(super) fn display_line(&self, line: usize) -> usize {
        line.saturating_sub(self.options.line_offset)
    }

    /// Trimmed source text of a parsed-text line, truncated.
    pub(super) fn line_text(&self, line: usize) -> String {
        let text = line
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(|l| l.trim())
            .unwrap_or("");
        text.chars().take(self.options.max_line_chars).collect()
    }

    /// Whitespace-collapsed expression text, truncated.
    pub(super) fn compact(&self, text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.chars().take(self.options.max_line_chars).collect()
    }

    pub(super) fn annotate(&mut self, block: BlockId, line: usize, text: String) {
        let line = self.display_line(line);
        self.graph.annotate(block, SourceLine { line, text });
    }

    /// Annotate with the statement's source line.
    pub(super) fn annotate_stmt(&mut self, block: BlockId, stmt: &Stmt) {
        let text = self.line_text(stmt.line);
        self.annotate(block, stmt.line, text);
    }

    pub(super) fn translate_block(&mut self, stmts: &[Stmt], walk: &mut Walk) {
        for stmt in stmts {
            self.translate_statement(stmt, walk);
        }
    }

    /// Statement dispatcher.
    pub(super) fn translate_statement(&mut self, stmt: &Stmt, walk: &mut Walk) {
        if let StmtKind::Block(stmts) = &stmt.kind {
            self.translate_block(stmts, walk);
            return;
        }
        self.resume(walk);

        match &stmt.kind {
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.translate_if(cond, then_branch, else_branch.as_deref(), walk),
            StmtKind::While { cond, body } => self.translate_while(cond, body, None, walk),
            StmtKind::DoWhile { body, cond } => self.translate_do_while(body, cond, None, walk),
            StmtKind::For {
                init_text,
                cond,
                update,
                body,
                ..
            } => self.translate_for(stmt, init_text, cond.as_ref(), update, body, None, walk),
            StmtKind::ForEach {
                var,
                iterable,
                body,
                ..
            } => self.translate_for_each(stmt, var, iterable, body, None, walk),
            StmtKind::Switch { cases, .. } => self.translate_switch(stmt, cases, None, walk),
            StmtKind::Labeled { label, body } => self.translate_labeled(label, body, walk),
            StmtKind::Return(_) => self.translate_return(stmt, walk),
            StmtKind::Break(label) => self.translate_break(stmt, label.as_deref(), walk),
            StmtKind::Continue(label) => self.translate_continue(stmt, label.as_deref(), walk),
            StmtKind::Expression(expr) if matches!(expr.kind, ExprKind::Call { .. }) => {
                self.translate_call(stmt, expr, walk)
            }
            StmtKind::Expression(_) | StmtKind::LocalVar(_) | StmtKind::Other(_) => {
                self.annotate_stmt(walk.cursor.block, stmt)
            }
            StmtKind::Block(_) => {}
        }
    }

    fn translate_return(&mut self, stmt: &Stmt, walk: &mut Walk) {
        self.annotate_stmt(walk.cursor.block, stmt);
        let exit = self.new_block(BlockKind::MethodExit, &walk.stack);
        self.advance(walk, exit);
        if walk.cursor.flow == Flow::Live {
            walk.exits.push(exit);
        }
        walk.cursor.flow = Flow::Halted;
    }

    pub(super) fn translate_break(&mut self, stmt: &Stmt, label: Option<&str>, walk: &mut Walk) {
        let block = self.new_block(BlockKind::Break, &walk.stack);
        self.annotate_stmt(block, stmt);
        self.advance(walk, block);
        if let Some(i) = walk.find_scope(label, false) {
            let cursor = walk.cursor;
            walk.scopes[i].breaks.push(cursor);
        }
        walk.cursor.flow = Flow::Halted;
    }

    fn translate_continue(&mut self, stmt: &Stmt, label: Option<&str>, walk: &mut Walk) {
        let block = self.new_block(BlockKind::Continue, &walk.stack);
        self.annotate_stmt(block, stmt);
        self.advance(walk, block);
        if let Some(i) = walk.find_scope(label, true) {
            let cursor = walk.cursor;
            walk.scopes[i].continues.push(cursor);
        }
        walk.cursor.flow = Flow::Halted;
    }
}
