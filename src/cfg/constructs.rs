//! Translators for structured control constructs.
//!
//! Every translator starts from a resumed (non-halted) cursor and leaves the
//! walk's cursor where control continues after the construct, or halted when
//! nothing continues.

use tracing::debug;

use super::builder::{CfgBuilder, Cursor, Flow, JumpScope, ScopeKind, Walk};
use super::graph::{BlockId, BlockKind};
use super::termination::{analyze_loop, is_always_false};
use crate::parser::ast::{Expr, Stmt, StmtKind, SwitchCase};

impl<'a> CfgBuilder<'a> {
    pub(super) fn translate_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
        walk: &mut Walk,
    ) {
        let cond_block = self.new_block(BlockKind::IfCondition, &walk.stack);
        let text = self.line_text(cond.line);
        self.annotate(cond_block, cond.line, text);
        self.advance(walk, cond_block);
        let at_cond = walk.cursor;

        let then_block = self.new_block(BlockKind::ThenBranch, &walk.stack);
        self.advance(walk, then_block);
        self.translate_statement(then_branch, walk);
        let then_end = walk.cursor;

        walk.cursor = at_cond;
        let else_end = match else_branch {
            Some(stmt) => {
                let else_block = self.new_block(BlockKind::ElseBranch, &walk.stack);
                self.advance(walk, else_block);
                self.translate_statement(stmt, walk);
                walk.cursor
            }
            None => at_cond,
        };

        self.merge(BlockKind::IfMerge, &[then_end, else_end], walk);
    }

    /// Loop condition block annotated with the condition text.
    fn condition_block(&mut self, kind: BlockKind, cond: &Expr, walk: &Walk) -> BlockId {
        let block = self.new_block(kind, &walk.stack);
        let text = self.compact(&cond.text);
        self.annotate(block, cond.line, text);
        block
    }

    /// Translate a body that can never run: its blocks exist but nothing
    /// reaches them. The cursor is restored afterwards.
    fn translate_dead_body(&mut self, body: &Stmt, walk: &mut Walk) {
        let saved = walk.cursor;
        let body_block = self.new_block(BlockKind::LoopBody, &walk.stack);
        walk.cursor = Cursor {
            block: body_block,
            flow: Flow::Detached,
        };
        walk.scopes.push(JumpScope::new(ScopeKind::Loop, None));
        self.translate_statement(body, walk);
        walk.scopes.pop();
        walk.cursor = saved;
    }

    /// Translate a loop body inside its own jump scope and return the scope
    /// together with the cursor at the end of the body.
    fn translate_loop_body(
        &mut self,
        body: &Stmt,
        label: Option<&str>,
        walk: &mut Walk,
    ) -> (JumpScope, Cursor) {
        walk.scopes.push(JumpScope::new(ScopeKind::Loop, label));
        self.translate_statement(body, walk);
        let end = walk.cursor;
        let scope = walk
            .scopes
            .pop()
            .unwrap_or_else(|| JumpScope::new(ScopeKind::Loop, label));
        (scope, end)
    }

    /// Connect every live way back into `target`.
    fn loop_back(&mut self, from: &[Cursor], target: BlockId) {
        for c in from.iter().filter(|c| c.flow != Flow::Halted) {
            self.graph.connect(c.block, target);
        }
    }

    /// Finish a loop: the exit is fed by the condition when the loop can
    /// terminate, and by every break.
    fn close_loop(&mut self, at_cond: Cursor, finite: bool, breaks: Vec<Cursor>, walk: &mut Walk) {
        let mut incoming = Vec::with_capacity(breaks.len() + 1);
        if finite {
            incoming.push(at_cond);
        }
        incoming.extend(breaks);
        walk.cursor = at_cond;
        self.merge(BlockKind::LoopExit, &incoming, walk);
    }

    pub(super) fn translate_while(&mut self, cond: &Expr, body: &Stmt, label: Option<&str>, walk: &mut Walk) {
        let cond_block = self.condition_block(BlockKind::WhileCondition, cond, walk);

        if is_always_false(cond) {
            debug!(line = cond.line, "while loop never runs");
            self.translate_dead_body(body, walk);
            let exit = self.new_block(BlockKind::LoopExit, &walk.stack);
            self.advance(walk, exit);
            return;
        }

        let verdict = analyze_loop(Some(cond), body, &[]);
        debug!(line = cond.line, infinite = verdict.is_infinite, reason = %verdict.reason, "while loop");

        self.advance(walk, cond_block);
        let at_cond = walk.cursor;
        let body_block = self.new_block(BlockKind::LoopBody, &walk.stack);
        self.advance(walk, body_block);

        let (scope, end) = self.translate_loop_body(body, label, walk);
        self.loop_back(&[end], cond_block);
        self.loop_back(&scope.continues, cond_block);

        self.close_loop(at_cond, !verdict.is_infinite, scope.breaks, walk);
    }

    pub(super) fn translate_do_while(&mut self, body: &Stmt, cond: &Expr, label: Option<&str>, walk: &mut Walk) {
        let body_block = self.new_block(BlockKind::DoWhileBody, &walk.stack);
        self.advance(walk, body_block);

        let (scope, end) = self.translate_loop_body(body, label, walk);

        let cond_block = self.condition_block(BlockKind::DoWhileCondition, cond, walk);
        let mut into_cond = vec![end];
        into_cond.extend(scope.continues.iter().copied());
        self.loop_back(&into_cond, cond_block);

        // A condition nothing reaches still exists, as an island.
        let flow = match into_cond.iter().fold(Flow::Halted, |f, c| f.join(c.flow)) {
            Flow::Halted => Flow::Detached,
            flow => flow,
        };
        let at_cond = Cursor {
            block: cond_block,
            flow,
        };

        if is_always_false(cond) {
            debug!(line = cond.line, "do-while body runs once");
            self.close_loop(at_cond, true, scope.breaks, walk);
            return;
        }

        self.graph.connect(cond_block, body_block);
        let verdict = analyze_loop(Some(cond), body, &[]);
        debug!(line = cond.line, infinite = verdict.is_infinite, reason = %verdict.reason, "do-while loop");
        self.close_loop(at_cond, !verdict.is_infinite, scope.breaks, walk);
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn translate_for(
        &mut self,
        stmt: &Stmt,
        init_text: &str,
        cond: Option<&Expr>,
        update: &[Expr],
        body: &Stmt,
        label: Option<&str>,
        walk: &mut Walk,
    ) {
        let init_block = self.new_block(BlockKind::ForInit, &walk.stack);
        if !init_text.is_empty() {
            let text = self.compact(init_text);
            self.annotate(init_block, stmt.line, text);
        }
        self.advance(walk, init_block);

        let cond_block = match cond {
            Some(c) => self.condition_block(BlockKind::ForCondition, c, walk),
            None => {
                let block = self.new_block(BlockKind::ForCondition, &walk.stack);
                self.annotate(block, stmt.line, "true".to_string());
                block
            }
        };

        if cond.is_some_and(is_always_false) {
            debug!(line = stmt.line, "for loop never runs");
            self.translate_dead_body(body, walk);
            let exit = self.new_block(BlockKind::LoopExit, &walk.stack);
            self.advance(walk, exit);
            return;
        }

        let verdict = analyze_loop(cond, body, update);
        debug!(line = stmt.line, infinite = verdict.is_infinite, reason = %verdict.reason, "for loop");

        self.advance(walk, cond_block);
        let at_cond = walk.cursor;
        let body_block = self.new_block(BlockKind::LoopBody, &walk.stack);
        self.advance(walk, body_block);

        let (scope, end) = self.translate_loop_body(body, label, walk);
        let mut back = vec![end];
        back.extend(scope.continues.iter().copied());

        let reaches_update = back.iter().any(|c| c.flow != Flow::Halted);
        if !update.is_empty() && reaches_update {
            let update_block = self.new_block(BlockKind::ForUpdate, &walk.stack);
            for expr in update {
                let text = self.compact(&expr.text);
                self.annotate(update_block, expr.line, text);
            }
            self.loop_back(&back, update_block);
            self.graph.connect(update_block, cond_block);
        } else {
            self.loop_back(&back, cond_block);
        }

        self.close_loop(at_cond, !verdict.is_infinite, scope.breaks, walk);
    }

    pub(super) fn translate_for_each(
        &mut self,
        stmt: &Stmt,
        var: &str,
        iterable: &Expr,
        body: &Stmt,
        label: Option<&str>,
        walk: &mut Walk,
    ) {
        let init_block = self.new_block(BlockKind::ForInit, &walk.stack);
        self.advance(walk, init_block);

        let cond_block = self.new_block(BlockKind::ForCondition, &walk.stack);
        let text = self.compact(&format!("for ({} : {})", var, iterable.text));
        self.annotate(cond_block, stmt.line, text);
        self.advance(walk, cond_block);
        let at_cond = walk.cursor;

        let body_block = self.new_block(BlockKind::LoopBody, &walk.stack);
        self.advance(walk, body_block);

        let (scope, end) = self.translate_loop_body(body, label, walk);
        self.loop_back(&[end], cond_block);
        self.loop_back(&scope.continues, cond_block);

        // Iteration over a collection always ends.
        self.close_loop(at_cond, true, scope.breaks, walk);
    }

    pub(super) fn translate_switch(
        &mut self,
        stmt: &Stmt,
        cases: &[SwitchCase],
        label: Option<&str>,
        walk: &mut Walk,
    ) {
        let expr_block = self.new_block(BlockKind::SwitchExpression, &walk.stack);
        let text = self.line_text(stmt.line);
        self.annotate(expr_block, stmt.line, text);
        self.advance(walk, expr_block);
        let at_expr = walk.cursor;

        // All case blocks exist before any body runs, so fallthrough has a target.
        let case_blocks: Vec<BlockId> = cases
            .iter()
            .map(|case| {
                let block = self.new_block(BlockKind::Case(case.display()), &walk.stack);
                self.link(walk, block);
                block
            })
            .collect();

        walk.scopes.push(JumpScope::new(ScopeKind::Switch, label));
        let mut to_merge = Vec::new();

        for (i, case) in cases.iter().enumerate() {
            walk.cursor = Cursor {
                block: case_blocks[i],
                flow: at_expr.flow,
            };
            for stmt in &case.body {
                if let StmtKind::Break(target) = &stmt.kind {
                    self.translate_break(stmt, target.as_deref(), walk);
                    break;
                }
                self.translate_statement(stmt, walk);
            }

            let end = walk.cursor;
            match case_blocks.get(i + 1) {
                Some(next) if !case.arrow => {
                    if end.flow != Flow::Halted {
                        self.graph.connect(end.block, *next);
                    }
                }
                _ => to_merge.push(end),
            }
        }

        let scope = walk
            .scopes
            .pop()
            .unwrap_or_else(|| JumpScope::new(ScopeKind::Switch, label));
        if !cases.iter().any(|c| c.is_default) {
            to_merge.push(at_expr);
        }
        to_merge.extend(scope.breaks);

        walk.cursor = at_expr;
        self.merge(BlockKind::SwitchMerge, &to_merge, walk);
    }

    /// A label on a loop or switch names that construct; on anything else it
    /// opens a scope `break label` can leave.
    pub(super) fn translate_labeled(&mut self, label: &str, body: &Stmt, walk: &mut Walk) {
        match &body.kind {
            StmtKind::While { cond, body } => self.translate_while(cond, body, Some(label), walk),
            StmtKind::DoWhile { body, cond } => {
                self.translate_do_while(body, cond, Some(label), walk)
            }
            StmtKind::For {
                init_text,
                cond,
                update,
                body: inner,
                ..
            } => self.translate_for(body, init_text, cond.as_ref(), update, inner, Some(label), walk),
            StmtKind::ForEach {
                var,
                iterable,
                body: inner,
                ..
            } => self.translate_for_each(body, var, iterable, inner, Some(label), walk),
            StmtKind::Switch { cases, .. } => {
                self.translate_switch(body, cases, Some(label), walk)
            }
            _ => {
                walk.scopes.push(JumpScope::new(ScopeKind::Labeled, Some(label)));
                self.translate_statement(body, walk);
                let scope = walk
                    .scopes
                    .pop()
                    .unwrap_or_else(|| JumpScope::new(ScopeKind::Labeled, Some(label)));
                if !scope.breaks.is_empty() {
                    let mut incoming = vec![walk.cursor];
                    incoming.extend(scope.breaks);
                    self.merge(BlockKind::Continuation, &incoming, walk);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cfg::builder::{BuildOptions, CfgBuilder, ControlFlowGraph};
    use crate::cfg::graph::{BlockId, BlockKind};
    use crate::parser::JavaParser;

    fn build_body(body: &str) -> ControlFlowGraph {
        let src = format!("class T {{\n  void f() {{\n{}\n  }}\n}}\n", body);
        let unit = JavaParser::new().parse(&src).unwrap();
        CfgBuilder::new(&unit, &src, BuildOptions::default()).build()
    }

    fn only(cfg: &ControlFlowGraph, kind: BlockKind) -> BlockId {
        let found = cfg.graph.blocks_of(&kind);
        assert_eq!(found.len(), 1, "expected one {:?}, found {:?}", kind, found);
        found[0]
    }

    fn entry(cfg: &ControlFlowGraph) -> BlockId {
        cfg.method("T.f").unwrap().entry.unwrap()
    }

    #[test]
    fn test_if_else() {
        let cfg = build_body("    if (x > 0) {\n      a = 1;\n    } else {\n      a = 2;\n    }");
        let cond = only(&cfg, BlockKind::IfCondition);
        let then = only(&cfg, BlockKind::ThenBranch);
        let els = only(&cfg, BlockKind::ElseBranch);
        let merge = only(&cfg, BlockKind::IfMerge);

        assert!(cfg.graph.has_edge(entry(&cfg), cond));
        assert!(cfg.graph.has_edge(cond, then));
        assert!(cfg.graph.has_edge(cond, els));
        assert!(cfg.graph.has_edge(then, merge));
        assert!(cfg.graph.has_edge(els, merge));
        assert!(!cfg.graph.has_edge(cond, merge));
        assert_eq!(cfg.graph.block(cond).label(), "IF CONDITION\nL3: if (x > 0) {");
    }

    #[test]
    fn test_if_without_else_joins_from_condition() {
        let cfg = build_body("    if (x) {\n      a();\n    }");
        let cond = only(&cfg, BlockKind::IfCondition);
        let merge = only(&cfg, BlockKind::IfMerge);
        assert!(cfg.graph.has_edge(cond, merge));
    }

    #[test]
    fn test_finite_while() {
        let cfg = build_body("    int i = 0;\n    while (i < 10) {\n      i++;\n    }");
        let cond = only(&cfg, BlockKind::WhileCondition);
        let body = only(&cfg, BlockKind::LoopBody);
        let exit = only(&cfg, BlockKind::LoopExit);

        assert!(cfg.graph.has_edge(entry(&cfg), cond));
        assert!(cfg.graph.has_edge(cond, body));
        assert!(cfg.graph.has_edge(body, cond));
        assert!(cfg.graph.has_edge(cond, exit));
        assert_eq!(cfg.graph.block(cond).label(), "WHILE CONDITION\nL4: i < 10");
    }

    #[test]
    fn test_infinite_while_has_no_exit() {
        let cfg = build_body("    while (true) {\n      work();\n    }\n    done();");
        let cond = only(&cfg, BlockKind::WhileCondition);
        let body = only(&cfg, BlockKind::LoopBody);

        assert!(cfg.graph.blocks_of(&BlockKind::LoopExit).is_empty());
        assert_eq!(cfg.graph.successors(cond), &[body]);

        // Code after the loop exists but nothing from the loop reaches it.
        let island = only(&cfg, BlockKind::Unreachable);
        assert!(cfg.graph.predecessors(island).is_empty());
        assert!(cfg.method("T.f").unwrap().exits.is_empty());
    }

    #[test]
    fn test_infinite_while_with_break() {
        let cfg = build_body("    while (true) {\n      if (done()) {\n        break;\n      }\n    }");
        let cond = only(&cfg, BlockKind::WhileCondition);
        let brk = only(&cfg, BlockKind::Break);
        let exit = only(&cfg, BlockKind::LoopExit);

        assert!(cfg.graph.has_edge(brk, exit));
        assert!(!cfg.graph.has_edge(cond, exit));
        assert_eq!(cfg.method("T.f").unwrap().exits.len(), 1);
    }

    #[test]
    fn test_never_running_while() {
        let cfg = build_body("    while (false) {\n      x++;\n    }");
        let cond = only(&cfg, BlockKind::WhileCondition);
        let body = only(&cfg, BlockKind::LoopBody);
        let exit = only(&cfg, BlockKind::LoopExit);

        assert!(cfg.graph.has_edge(entry(&cfg), exit));
        assert!(cfg.graph.predecessors(cond).is_empty());
        assert!(cfg.graph.predecessors(body).is_empty());
        assert!(cfg.graph.successors(cond).is_empty());
    }

    #[test]
    fn test_classic_for() {
        let cfg = build_body("    for (int i = 0; i < 10; i++) {\n      sum += i;\n    }");
        let init = only(&cfg, BlockKind::ForInit);
        let cond = only(&cfg, BlockKind::ForCondition);
        let body = only(&cfg, BlockKind::LoopBody);
        let update = only(&cfg, BlockKind::ForUpdate);
        let exit = only(&cfg, BlockKind::LoopExit);

        assert!(cfg.graph.has_edge(init, cond));
        assert!(cfg.graph.has_edge(cond, body));
        assert!(cfg.graph.has_edge(body, update));
        assert!(cfg.graph.has_edge(update, cond));
        assert!(cfg.graph.has_edge(cond, exit));
        assert_eq!(cfg.graph.block(init).label(), "FOR INIT\nL3: int i = 0");
        assert_eq!(cfg.graph.block(update).label(), "FOR UPDATE\nL3: i++");
    }

    #[test]
    fn test_for_with_opposing_direction_is_infinite() {
        let cfg = build_body("    for (int i = 10; i > 0; i++) {\n      log(i);\n    }");
        assert!(cfg.graph.blocks_of(&BlockKind::LoopExit).is_empty());
    }

    #[test]
    fn test_never_running_for_skips_from_init() {
        let cfg = build_body("    for (int i = 0; 1 > 2; i++) {\n      log(i);\n    }");
        let init = only(&cfg, BlockKind::ForInit);
        let cond = only(&cfg, BlockKind::ForCondition);
        let exit = only(&cfg, BlockKind::LoopExit);

        assert!(cfg.graph.has_edge(init, exit));
        assert!(!cfg.graph.has_edge(init, cond));
        assert!(cfg.graph.blocks_of(&BlockKind::ForUpdate).is_empty());
    }

    #[test]
    fn test_continue_targets_update() {
        let cfg = build_body(
            "    for (int i = 0; i < n; i++) {\n      if (skip(i)) {\n        continue;\n      }\n      use(i);\n    }",
        );
        let cont = only(&cfg, BlockKind::Continue);
        let update = only(&cfg, BlockKind::ForUpdate);
        assert!(cfg.graph.has_edge(cont, update));
    }

    #[test]
    fn test_loop_writing_inside_try_still_exits() {
        let cfg = build_body(
            "    int i = 0;\n    while (i < 10) {\n      try {\n        i++;\n      } catch (Exception e) {\n      }\n    }\n    done();",
        );
        let cond = only(&cfg, BlockKind::WhileCondition);
        let exit = only(&cfg, BlockKind::LoopExit);

        assert!(cfg.graph.has_edge(cond, exit));
        assert!(cfg.graph.blocks_of(&BlockKind::Unreachable).is_empty());
        assert_eq!(cfg.method("T.f").unwrap().exits.len(), 1);
    }

    #[test]
    fn test_for_each() {
        let cfg = build_body("    for (String s : names) {\n      print(s);\n    }");
        let cond = only(&cfg, BlockKind::ForCondition);
        let body = only(&cfg, BlockKind::LoopBody);
        let exit = only(&cfg, BlockKind::LoopExit);

        assert!(cfg.graph.has_edge(body, cond));
        assert!(cfg.graph.has_edge(cond, exit));
        assert_eq!(cfg.graph.block(cond).label(), "FOR CONDITION\nL3: for (s : names)");
    }

    #[test]
    fn test_do_while() {
        let cfg = build_body("    do {\n      n--;\n    } while (n > 0);");
        let body = only(&cfg, BlockKind::DoWhileBody);
        let cond = only(&cfg, BlockKind::DoWhileCondition);
        let exit = only(&cfg, BlockKind::LoopExit);

        assert!(cfg.graph.has_edge(entry(&cfg), body));
        assert!(cfg.graph.has_edge(body, cond));
        assert!(cfg.graph.has_edge(cond, body));
        assert!(cfg.graph.has_edge(cond, exit));
    }

    #[test]
    fn test_do_while_false_runs_once() {
        let cfg = build_body("    do {\n      once();\n    } while (false);");
        let body = only(&cfg, BlockKind::DoWhileBody);
        let cond = only(&cfg, BlockKind::DoWhileCondition);
        let exit = only(&cfg, BlockKind::LoopExit);

        assert!(!cfg.graph.has_edge(cond, body));
        assert!(cfg.graph.has_edge(cond, exit));
    }

    #[test]
    fn test_switch_fallthrough() {
        let cfg = build_body(
            "    switch (x) {\n      case 1:\n        a();\n      case 2:\n        b();\n        break;\n      default:\n        c();\n        break;\n    }",
        );
        let expr = only(&cfg, BlockKind::SwitchExpression);
        let case1 = only(&cfg, BlockKind::Case("case 1".to_string()));
        let case2 = only(&cfg, BlockKind::Case("case 2".to_string()));
        let default = only(&cfg, BlockKind::Case("default".to_string()));
        let merge = only(&cfg, BlockKind::SwitchMerge);

        assert!(cfg.graph.has_edge(expr, case1));
        assert!(cfg.graph.has_edge(expr, case2));
        assert!(cfg.graph.has_edge(expr, default));
        // Case 1 has no break and falls into case 2.
        assert!(cfg.graph.has_edge(case1, case2));
        // With a default, the expression never skips to the merge.
        assert!(!cfg.graph.has_edge(expr, merge));

        let breaks = cfg.graph.blocks_of(&BlockKind::Break);
        assert_eq!(breaks.len(), 2);
        for b in breaks {
            assert!(cfg.graph.has_edge(b, merge));
        }
    }

    #[test]
    fn test_switch_without_default_can_skip() {
        let cfg = build_body("    switch (x) {\n      case 1:\n        a();\n        break;\n    }");
        let expr = only(&cfg, BlockKind::SwitchExpression);
        let merge = only(&cfg, BlockKind::SwitchMerge);
        assert!(cfg.graph.has_edge(expr, merge));
    }

    #[test]
    fn test_switch_statements_after_break_are_skipped() {
        let cfg = build_body("    switch (x) {\n      case 1:\n        break;\n        dead();\n      default:\n    }");
        assert!(cfg.graph.blocks_of(&BlockKind::Unreachable).is_empty());
        let case1 = only(&cfg, BlockKind::Case("case 1".to_string()));
        assert!(!cfg
            .graph
            .block(case1)
            .lines
            .iter()
            .any(|l| l.text.contains("dead")));
    }

    #[test]
    fn test_labeled_break_leaves_outer_loop() {
        let cfg = build_body(
            "    outer:\n    for (int i = 0; i < n; i++) {\n      while (true) {\n        break outer;\n      }\n    }",
        );
        let brk = only(&cfg, BlockKind::Break);
        let exits = cfg.graph.blocks_of(&BlockKind::LoopExit);
        // Only the labeled for loop has an exit; the inner loop never ends.
        assert_eq!(exits.len(), 1);
        assert!(cfg.graph.has_edge(brk, exits[0]));
        let for_cond = only(&cfg, BlockKind::ForCondition);
        assert!(cfg.graph.has_edge(for_cond, exits[0]));
    }

    #[test]
    fn test_every_live_block_is_reachable() {
        let cfg = build_body(
            "    int t = 0;\n    for (int i = 0; i < 3; i++) {\n      if (i % 2 == 0) {\n        t += i;\n      } else {\n        continue;\n      }\n    }\n    switch (t) {\n      case 0: t = 1;\n      default: break;\n    }\n    return;",
        );
        let reach = cfg.graph.reachable_from(entry(&cfg));
        for block in cfg.graph.blocks() {
            assert!(reach.contains(&block.id), "{} unreachable: {}", block.id, block.label());
        }
    }
}
