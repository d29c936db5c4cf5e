//! Method registry and call linking.
//!
//! Calls are inlined: the caller's block connects straight to the callee's
//! entry, and every callee exit connects to a fresh continuation block owned
//! by the caller. Callees are built lazily the first time they are called.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::builder::{BuildState, CfgBuilder, Cursor, Flow, MethodRecord, Walk};
use super::graph::BlockKind;
use super::GROUP_COUNT;
use crate::parser::ast::{CompilationUnit, Expr, ExprKind, MethodDecl, MethodKind, Stmt};

/// Attribution entry: the method whose translation is creating blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub method: String,
    pub class: String,
    pub group: usize,
}

/// Translation stack. Threaded by value through nested builds so that each
/// build sees the chain of methods that triggered it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack(Vec<CallFrame>);

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this stack with `frame` on top.
    pub fn pushed(&self, frame: CallFrame) -> Self {
        let mut frames = self.0.clone();
        frames.push(frame);
        Self(frames)
    }

    pub fn top(&self) -> Option<&CallFrame> {
        self.0.last()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.0.iter().any(|f| f.method == method)
    }
}

/// Declared methods by key, with the lookup tables call sites resolve through.
pub(super) struct MethodTable<'a> {
    pub(super) decls: Vec<&'a MethodDecl>,
    pub(super) records: Vec<MethodRecord>,
    pub(super) states: Vec<BuildState>,
    /// Continuation blocks waiting on a method that was mid-build when called.
    pub(super) pending: Vec<Vec<super::graph::BlockId>>,
    by_key: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    classes: HashSet<String>,
}

impl<'a> MethodTable<'a> {
    /// Register every method (and constructor, when enabled) in document order.
    pub(super) fn register(unit: &'a CompilationUnit, include_constructors: bool, line_offset: usize) -> Self {
        let mut table = MethodTable {
            decls: Vec::new(),
            records: Vec::new(),
            states: Vec::new(),
            pending: Vec::new(),
            by_key: HashMap::new(),
            by_name: HashMap::new(),
            classes: HashSet::new(),
        };

        let mut found: Vec<(&str, &MethodDecl)> = Vec::new();
        for ty in unit.all_types() {
            table.classes.insert(ty.name.clone());
            for method in &ty.methods {
                if method.kind == MethodKind::Constructor && !include_constructors {
                    continue;
                }
                found.push((ty.name.as_str(), method));
            }
        }
        found.sort_by_key(|(_, m)| m.line);

        for (class, method) in found {
            let base = format!("{}.{}", class, method.name);
            let mut key = base.clone();
            let mut n = 1;
            while table.by_key.contains_key(&key) {
                n += 1;
                key = format!("{}#{}", base, n);
            }

            let idx = table.decls.len();
            table.by_key.insert(key.clone(), idx);
            if method.kind == MethodKind::Method {
                table.by_name.entry(method.name.clone()).or_insert(idx);
            }

            table.decls.push(method);
            table.records.push(MethodRecord {
                key,
                name: method.name.clone(),
                class: class.to_string(),
                line: method.line.saturating_sub(line_offset),
                entry: None,
                exits: Vec::new(),
                group: idx % GROUP_COUNT,
            });
            // Bodiless methods never get blocks.
            table.states.push(if method.body.is_some() {
                BuildState::Pending
            } else {
                BuildState::Built
            });
            table.pending.push(Vec::new());
        }
        table
    }

    fn method_by_key(&self, key: &str) -> Option<usize> {
        self.by_key
            .get(key)
            .copied()
            .filter(|&i| self.decls[i].kind == MethodKind::Method)
    }

    /// Resolve a call site. `foo()` and `this.foo()` go to the first method
    /// registered under the bare name, whichever class declares it;
    /// `Known.foo()` resolves only when `Known` is declared in the input.
    pub(super) fn resolve(&self, receiver: Option<&Expr>, name: &str) -> Option<usize> {
        match receiver.map(|r| &r.kind) {
            None | Some(ExprKind::This) => self.by_name.get(name).copied(),
            Some(ExprKind::Name(class)) if self.classes.contains(class) => {
                self.method_by_key(&format!("{}.{}", class, name))
            }
            _ => None,
        }
    }
}

impl<'a> CfgBuilder<'a> {
    /// Annotate the call line, then splice the callee's subgraph in when the
    /// callee is declared in the input.
    pub(super) fn translate_call(&mut self, stmt: &Stmt, call: &Expr, walk: &mut Walk) {
        self.annotate_stmt(walk.cursor.block, stmt);

        let ExprKind::Call { receiver, name, .. } = &call.kind else {
            return;
        };
        let Some(callee) = self.table.resolve(receiver.as_deref(), name) else {
            debug!(call = %name, "unresolved call treated as external");
            return;
        };

        if self.table.states[callee] == BuildState::Pending {
            debug!(callee = %self.table.records[callee].key, "building method on first call");
            self.build_method(callee, &walk.stack);
        }

        let Some(entry) = self.table.records[callee].entry else {
            return;
        };
        self.link(walk, entry);

        let cont = self.new_block(BlockKind::Continuation, &walk.stack);
        let flow = match self.table.states[callee] {
            BuildState::Building => {
                // Recursive call: exits are connected once the callee finishes.
                self.table.pending[callee].push(cont);
                walk.cursor.flow
            }
            _ => {
                let exits = self.table.records[callee].exits.clone();
                for exit in &exits {
                    self.graph.connect(*exit, cont);
                }
                if exits.is_empty() {
                    Flow::Detached
                } else {
                    walk.cursor.flow
                }
            }
        };
        walk.cursor = Cursor { block: cont, flow };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::JavaParser;

    fn table_for(src: &str) -> (CompilationUnit, Vec<String>) {
        let unit = JavaParser::new().parse(src).unwrap();
        let keys = MethodTable::register(&unit, true, 0)
            .records
            .iter()
            .map(|r| r.key.clone())
            .collect();
        (unit, keys)
    }

    #[test]
    fn test_keys_and_overloads() {
        let (_, keys) = table_for(
            "class A {\n  A() {}\n  void f() {}\n  void f(int x) {}\n}\nclass B {\n  void f() {}\n}\n",
        );
        assert_eq!(keys, vec!["A.A", "A.f", "A.f#2", "B.f"]);
    }

    #[test]
    fn test_constructors_can_be_excluded() {
        let unit = JavaParser::new()
            .parse("class A {\n  A() {}\n  void f() {}\n}\n")
            .unwrap();
        let table = MethodTable::register(&unit, false, 0);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].key, "A.f");
    }

    #[test]
    fn test_bare_calls_resolve_to_first_declaration() {
        let unit = JavaParser::new()
            .parse("class A {\n  void f() {}\n}\nclass B {\n  void f() {}\n  void g() { f(); }\n}\n")
            .unwrap();
        let table = MethodTable::register(&unit, true, 0);

        // Called from B.g, yet the name goes to the first declared f.
        let bare = table.resolve(None, "f").unwrap();
        assert_eq!(table.records[bare].key, "A.f");
        let this = Expr {
            line: 6,
            kind: ExprKind::This,
            text: "this".to_string(),
        };
        let through_this = table.resolve(Some(&this), "f").unwrap();
        assert_eq!(table.records[through_this].key, "A.f");

        assert!(table.resolve(None, "missing").is_none());
    }

    #[test]
    fn test_qualified_resolution() {
        let src = "class A {\n  static void f() {}\n  void g() { A.f(); list.f(); }\n}\n";
        let unit = JavaParser::new().parse(src).unwrap();
        let table = MethodTable::register(&unit, true, 0);

        let g = &unit.types[0].methods[1];
        let body = g.body.as_ref().unwrap();
        let receiver_of = |i: usize| match &body[i].kind {
            crate::parser::ast::StmtKind::Expression(Expr {
                kind: ExprKind::Call { receiver, .. },
                ..
            }) => receiver.as_deref().cloned(),
            other => panic!("expected call, got {:?}", other),
        };

        let known = receiver_of(0);
        assert!(table.resolve(known.as_ref(), "f").is_some());
        let external = receiver_of(1);
        assert!(table.resolve(external.as_ref(), "f").is_none());
    }

    #[test]
    fn test_call_stack() {
        let frame = |m: &str| CallFrame {
            method: m.to_string(),
            class: "A".to_string(),
            group: 0,
        };
        let base = CallStack::new().pushed(frame("A.f"));
        let nested = base.pushed(frame("A.g"));

        assert_eq!(base.depth(), 1);
        assert_eq!(nested.depth(), 2);
        assert_eq!(nested.top().unwrap().method, "A.g");
        assert!(nested.contains("A.f"));
        assert!(!base.contains("A.g"));
    }
}
