//! Static loop-termination heuristics.
//!
//! `analyze_loop` classifies a loop as finite or statically infinite from its
//! condition and the writes in its body (and update clause, for classic
//! `for` loops). The analysis is deliberately narrow: only literal-vs-literal
//! comparisons are folded, and when the direction of change of a condition
//! variable cannot be established the loop is assumed to terminate.

use std::collections::{BTreeMap, BTreeSet};

use crate::parser::ast::{
    AssignOp, BinaryOp, Expr, ExprKind, Literal, LiteralKind, Stmt, StmtKind, UnaryOp, UpdateOp,
};

/// Normalized condition texts that always hold.
const ALWAYS_TRUE_PATTERNS: &[&str] = &[
    "true",
    "1==1",
    "true==true",
    "1!=0",
    "true!=false",
    "(true)",
    "(1==1)",
    "1<2",
    "2>1",
    "true||false",
    "1",
    "true&&true",
    "!false",
];

/// Normalized condition texts that never hold.
const NEVER_TRUE_PATTERNS: &[&str] = &[
    "false",
    "0",
    "1==0",
    "false==true",
    "1>2",
    "2<1",
    "(false)",
    "(1==0)",
    "true&&false",
    "!true",
];

/// Classification of one loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopVerdict {
    pub is_infinite: bool,
    pub reason: String,
}

impl LoopVerdict {
    fn infinite(reason: impl Into<String>) -> Self {
        Self {
            is_infinite: true,
            reason: reason.into(),
        }
    }

    fn finite(reason: impl Into<String>) -> Self {
        Self {
            is_infinite: false,
            reason: reason.into(),
        }
    }
}

/// How a variable changes across one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increment,
    Decrement,
    Unknown,
}

impl Direction {
    fn merge(self, other: Direction) -> Direction {
        if self == other {
            self
        } else {
            Direction::Unknown
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Direction::Increment => "incremented",
            Direction::Decrement => "decremented",
            Direction::Unknown => "modified",
        }
    }
}

/// Lowercased condition text with all whitespace removed.
fn normalized_text(expr: &Expr) -> String {
    expr.text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn numeric_value(expr: &Expr) -> Option<f64> {
    match &expr.kind {
        ExprKind::Literal(Literal { kind, value })
            if matches!(kind, LiteralKind::Integer | LiteralKind::Float) =>
        {
            value
                .replace('_', "")
                .trim_end_matches(['l', 'L', 'f', 'F', 'd', 'D'])
                .parse::<f64>()
                .ok()
        }
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => numeric_value(operand).map(|v| -v),
        _ => None,
    }
}

/// Literal operand text, accepting a negated numeric literal.
fn literal_text(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Literal(lit) => Some(lit.value.clone()),
        ExprKind::Unary {
            op: UnaryOp::Neg, ..
        } => numeric_value(expr).map(|v| v.to_string()),
        _ => None,
    }
}

/// Evaluate a bare literal or a literal-vs-literal comparison.
fn fold(expr: &Expr) -> Option<bool> {
    match &expr.kind {
        ExprKind::Literal(lit) => match lit.value.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        ExprKind::Binary { op, left, right } => {
            let (l, r) = (literal_text(left)?, literal_text(right)?);
            let numbers = numeric_value(left).zip(numeric_value(right));
            match op {
                BinaryOp::Eq => Some(match numbers {
                    Some((a, b)) => a == b,
                    None => l == r,
                }),
                BinaryOp::Ne => Some(match numbers {
                    Some((a, b)) => a != b,
                    None => l != r,
                }),
                // Ordering of non-numeric literals is not folded.
                BinaryOp::Lt => numbers.map(|(a, b)| a < b),
                BinaryOp::Le => numbers.map(|(a, b)| a <= b),
                BinaryOp::Gt => numbers.map(|(a, b)| a > b),
                BinaryOp::Ge => numbers.map(|(a, b)| a >= b),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Whether a loop condition can never hold, so the body never runs.
pub fn is_always_false(cond: &Expr) -> bool {
    if fold(cond) == Some(false) {
        return true;
    }
    NEVER_TRUE_PATTERNS.contains(&normalized_text(cond).as_str())
}

/// Variable names read by an expression. Method calls are opaque.
pub fn read_variables(expr: &Expr) -> BTreeSet<String> {
    let mut vars = BTreeSet::new();
    collect_reads(expr, &mut vars);
    vars
}

fn collect_reads(expr: &Expr, vars: &mut BTreeSet<String>) {
    if let Some(name) = expr.simple_name() {
        vars.insert(name.to_string());
        return;
    }
    match &expr.kind {
        ExprKind::Call { .. } => {}
        _ => {
            for child in expr.children() {
                collect_reads(child, vars);
            }
        }
    }
}

/// Variable a write lands on, and whether the target is the variable itself
/// (as opposed to a field or element reached through it).
fn write_target(target: &Expr) -> Option<(String, bool)> {
    if let Some(name) = target.simple_name() {
        return Some((name.to_string(), true));
    }
    match &target.kind {
        ExprKind::FieldAccess { object, .. } => write_target(object).map(|(n, _)| (n, false)),
        ExprKind::ArrayAccess { array, .. } => write_target(array).map(|(n, _)| (n, false)),
        _ => None,
    }
}

/// Direction of `name = <value>`.
fn assignment_direction(name: &str, value: &Expr) -> Direction {
    if let ExprKind::Binary { op, left, right } = &value.kind {
        let is_self = |e: &Expr| e.simple_name() == Some(name);
        let is_lit = |e: &Expr| e.as_literal().is_some();
        if is_self(left) && is_lit(right) || is_lit(left) && is_self(right) {
            return match op {
                BinaryOp::Add => Direction::Increment,
                BinaryOp::Sub => Direction::Decrement,
                _ => Direction::Unknown,
            };
        }
    }
    Direction::Unknown
}

fn record(writes: &mut BTreeMap<String, Direction>, name: String, dir: Direction) {
    writes
        .entry(name)
        .and_modify(|d| *d = d.merge(dir))
        .or_insert(dir);
}

fn record_expr_write(expr: &Expr, writes: &mut BTreeMap<String, Direction>) {
    match &expr.kind {
        ExprKind::Update { op, target, .. } => {
            if let Some((name, direct)) = write_target(target) {
                let dir = match (direct, op) {
                    (false, _) => Direction::Unknown,
                    (true, UpdateOp::Increment) => Direction::Increment,
                    (true, UpdateOp::Decrement) => Direction::Decrement,
                };
                record(writes, name, dir);
            }
        }
        ExprKind::Assign { op, target, value } => {
            if let Some((name, direct)) = write_target(target) {
                let dir = match (direct, op) {
                    (false, _) => Direction::Unknown,
                    (true, AssignOp::Add) => Direction::Increment,
                    (true, AssignOp::Sub) => Direction::Decrement,
                    (true, AssignOp::Assign) => assignment_direction(&name, value),
                    (true, AssignOp::Other) => Direction::Unknown,
                };
                record(writes, name, dir);
            }
        }
        _ => {}
    }
}

/// Every variable written anywhere inside `body`, nested statements included.
pub fn written_variables(body: &Stmt) -> BTreeMap<String, Direction> {
    let mut writes = BTreeMap::new();
    body.walk_exprs(&mut |e| record_expr_write(e, &mut writes));
    body.walk(&mut |s| {
        if let StmtKind::ForEach { var, .. } = &s.kind {
            record(&mut writes, var.clone(), Direction::Unknown);
        }
    });
    writes
}

/// Classify a loop as finite or statically infinite.
///
/// `update` holds the update expressions of a classic `for`; for a variable
/// written there, the update's direction replaces the body's.
pub fn analyze_loop(cond: Option<&Expr>, body: &Stmt, update: &[Expr]) -> LoopVerdict {
    let Some(cond) = cond else {
        return LoopVerdict::infinite("No condition");
    };

    if fold(cond) == Some(true) {
        return match cond.kind {
            ExprKind::Literal(_) => LoopVerdict::infinite("Always true literal"),
            _ => LoopVerdict::infinite("Always true comparison"),
        };
    }
    if ALWAYS_TRUE_PATTERNS.contains(&normalized_text(cond).as_str()) {
        return LoopVerdict::infinite("Always true pattern");
    }

    let reads = read_variables(cond);
    if reads.is_empty() {
        return LoopVerdict::finite("No variables to analyze");
    }

    let mut writes = written_variables(body);
    let mut update_writes = BTreeMap::new();
    for expr in update {
        expr.walk(&mut |e| record_expr_write(e, &mut update_writes));
    }
    writes.extend(update_writes);

    if !reads.iter().any(|v| writes.contains_key(v)) {
        let names: Vec<&str> = reads.iter().map(String::as_str).collect();
        return LoopVerdict::infinite(format!(
            "Condition variables {{{}}} not modified in loop body",
            names.join(", ")
        ));
    }

    if let Some(verdict) = direction_verdict(cond, &writes) {
        return verdict;
    }

    LoopVerdict::finite("Unable to determine - assuming might terminate")
}

/// Apply the direction rule to `var <op> bound` or `bound <op> var`.
fn direction_verdict(cond: &Expr, writes: &BTreeMap<String, Direction>) -> Option<LoopVerdict> {
    let ExprKind::Binary { op, left, right } = &cond.kind else {
        return None;
    };
    if !op.is_ordering() {
        return None;
    }

    // Only literal bounds; a variable bound is left undetermined.
    let is_bound = |e: &Expr| literal_text(e).is_some();

    let (var, var_on_left) = match (left.simple_name(), right.simple_name()) {
        (Some(v), _) if writes.contains_key(v) && is_bound(right) => (v, true),
        (_, Some(v)) if writes.contains_key(v) && is_bound(left) => (v, false),
        _ => return None,
    };
    let dir = writes.get(var).copied().unwrap_or(Direction::Unknown);
    if dir == Direction::Unknown {
        return None;
    }

    // With the variable on the left, `>` holds forever under increments.
    let grows_true = matches!(
        (op, var_on_left),
        (BinaryOp::Gt | BinaryOp::Ge, true) | (BinaryOp::Lt | BinaryOp::Le, false)
    );
    let stays_true = grows_true == (dir == Direction::Increment);

    let condition = format!("{} {} {}", left.text, op, right.text);
    let verdict = if stays_true {
        LoopVerdict::infinite(format!(
            "Variable {} is {}, condition {} stays true",
            var,
            dir.verb(),
            condition
        ))
    } else {
        LoopVerdict::finite(format!(
            "Variable {} is {}, condition {} can become false",
            var,
            dir.verb(),
            condition
        ))
    };
    Some(verdict)
}
