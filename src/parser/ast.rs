//! Owned syntax tree for the Java subset the analyses consume.
//!
//! The tree-sitter concrete tree is lowered into these types once per parse
//! (see `lower.rs`), so the graph builder and the structural passes can match
//! exhaustively on closed enums instead of branching on node-kind strings.
//! Statement kinds that the engine does not expand lower to `StmtKind::Other`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A parsed compilation unit: the top-level type declarations of one input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilationUnit {
    pub types: Vec<TypeDecl>,
}

impl CompilationUnit {
    /// All type declarations in pre-order (outer types before their nested ones).
    pub fn all_types(&self) -> Vec<&TypeDecl> {
        let mut out = Vec::new();
        for ty in &self.types {
            collect_types(ty, &mut out);
        }
        out
    }

    /// Class declarations only (interfaces, enums and records excluded).
    pub fn classes(&self) -> Vec<&TypeDecl> {
        self.all_types()
            .into_iter()
            .filter(|t| t.kind == TypeKind::Class)
            .collect()
    }
}

fn collect_types<'a>(ty: &'a TypeDecl, out: &mut Vec<&'a TypeDecl>) {
    out.push(ty);
    for nested in &ty.types {
        collect_types(nested, out);
    }
}

/// Kind of type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
}

/// A class, interface, enum or record declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    /// 1-based line of the declaration (including leading modifiers).
    pub line: usize,
    pub modifiers: Modifiers,
    pub superclass: Option<TypeRef>,
    pub fields: Vec<FieldDecl>,
    /// Methods and constructors in declaration order.
    pub methods: Vec<MethodDecl>,
    /// Nested type declarations.
    pub types: Vec<TypeDecl>,
}

impl TypeDecl {
    /// Declared methods, constructors excluded.
    pub fn plain_methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.methods
            .iter()
            .filter(|m| m.kind == MethodKind::Method)
    }

    /// Declared constructors.
    pub fn constructors(&self) -> impl Iterator<Item = &MethodDecl> {
        self.methods
            .iter()
            .filter(|m| m.kind == MethodKind::Constructor)
    }
}

/// Keyword modifiers of a declaration, in source order. Annotations are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers(pub Vec<String>);

impl Modifiers {
    pub fn contains(&self, keyword: &str) -> bool {
        self.0.iter().any(|m| m == keyword)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// A (possibly parameterized) type reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRef {
    /// Simple name of the base type (`List` for `java.util.List<Employee>`).
    pub name: String,
    /// Type arguments. Bounded wildcards contribute their bound.
    pub args: Vec<TypeRef>,
    /// Array dimensions.
    pub dims: usize,
    /// Source text of the whole type.
    pub text: String,
}

impl TypeRef {
    pub fn is_generic(&self) -> bool {
        !self.args.is_empty()
    }

    /// Every type argument at any nesting depth.
    pub fn nested_args(&self) -> Vec<&TypeRef> {
        let mut out = Vec::new();
        for arg in &self.args {
            out.push(arg);
            out.extend(arg.nested_args());
        }
        out
    }
}

/// A field declaration; one declaration may introduce several names.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub ty: TypeRef,
    pub names: Vec<String>,
    pub modifiers: Modifiers,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Method,
    Constructor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeRef,
    pub name: String,
}

/// A method or constructor declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub kind: MethodKind,
    pub name: String,
    pub line: usize,
    pub modifiers: Modifiers,
    /// Declared return type; `None` for constructors.
    pub return_type: Option<TypeRef>,
    pub params: Vec<Param>,
    /// `None` for abstract and interface methods.
    pub body: Option<Vec<Stmt>>,
}

/// A statement with its position and source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// 1-based line of the first token.
    pub line: usize,
    pub text: String,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<ForInit>,
        /// Source text of the init clause, empty when absent.
        init_text: String,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    ForEach {
        ty: TypeRef,
        var: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
    },
    Return(Option<Expr>),
    Break(Option<String>),
    Continue(Option<String>),
    Expression(Expr),
    LocalVar(LocalVar),
    Block(Vec<Stmt>),
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    /// Anything not expanded further (try, throw, synchronized, assert, ...).
    /// Holds the blocks nested inside it, such as try, catch and finally
    /// bodies, so that scans over the subtree still see them.
    Other(Vec<Stmt>),
}

/// A local variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub ty: TypeRef,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Decl(LocalVar),
    Expr(Expr),
}

/// One `case`/`default` group of a switch.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub line: usize,
    /// Source text of each case constant.
    pub labels: Vec<String>,
    pub is_default: bool,
    /// `case X -> ...` rules never fall through.
    pub arrow: bool,
    pub body: Vec<Stmt>,
}

impl SwitchCase {
    /// Display form: `case 1, 2` or `default`.
    pub fn display(&self) -> String {
        match (self.labels.is_empty(), self.is_default) {
            (true, _) => "default".to_string(),
            (false, false) => format!("case {}", self.labels.join(", ")),
            (false, true) => format!("case {}, default", self.labels.join(", ")),
        }
    }
}

/// An expression with its position and source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub line: usize,
    pub text: String,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Name(String),
    This,
    FieldAccess {
        object: Box<Expr>,
        field: String,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        receiver: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    New {
        ty: TypeRef,
        args: Vec<Expr>,
    },
    Cast {
        ty: TypeRef,
        value: Box<Expr>,
    },
    /// Unmodelled expression; sub-expressions are kept for traversal.
    Other(Vec<Expr>),
}

impl Expr {
    /// Variable name for `x` and `this.x`.
    pub fn simple_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            ExprKind::FieldAccess { object, field } if object.kind == ExprKind::This => {
                Some(field)
            }
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            ExprKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Direct sub-expressions.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::This => Vec::new(),
            ExprKind::FieldAccess { object, .. } => vec![object.as_ref()],
            ExprKind::ArrayAccess { array, index } => vec![array.as_ref(), index.as_ref()],
            ExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::Unary { operand, .. } => vec![operand.as_ref()],
            ExprKind::Update { target, .. } => vec![target.as_ref()],
            ExprKind::Assign { target, value, .. } => vec![target.as_ref(), value.as_ref()],
            ExprKind::Call { receiver, args, .. } => {
                let mut out: Vec<&Expr> = receiver.iter().map(|r| r.as_ref()).collect();
                out.extend(args.iter());
                out
            }
            ExprKind::New { args, .. } => args.iter().collect(),
            ExprKind::Cast { value, .. } => vec![value.as_ref()],
            ExprKind::Other(children) => children.iter().collect(),
        }
    }

    /// Pre-order traversal of this expression and all sub-expressions.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }
}

impl Stmt {
    /// Direct child statements.
    pub fn children(&self) -> Vec<&Stmt> {
        match &self.kind {
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                let mut out = vec![then_branch.as_ref()];
                if let Some(e) = else_branch {
                    out.push(e.as_ref());
                }
                out
            }
            StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. }
            | StmtKind::For { body, .. }
            | StmtKind::ForEach { body, .. }
            | StmtKind::Labeled { body, .. } => vec![body.as_ref()],
            StmtKind::Switch { cases, .. } => cases.iter().flat_map(|c| c.body.iter()).collect(),
            StmtKind::Block(stmts) | StmtKind::Other(stmts) => stmts.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Expressions owned directly by this statement (not by child statements).
    pub fn own_exprs(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::If { cond, .. }
            | StmtKind::While { cond, .. }
            | StmtKind::DoWhile { cond, .. } => vec![cond],
            StmtKind::For {
                init, cond, update, ..
            } => {
                let mut out = Vec::new();
                for i in init {
                    match i {
                        ForInit::Decl(decl) => {
                            out.extend(decl.declarators.iter().filter_map(|d| d.value.as_ref()))
                        }
                        ForInit::Expr(e) => out.push(e),
                    }
                }
                out.extend(cond.iter());
                out.extend(update.iter());
                out
            }
            StmtKind::ForEach { iterable, .. } => vec![iterable],
            StmtKind::Switch { subject, .. } => vec![subject],
            StmtKind::Return(value) => value.iter().collect(),
            StmtKind::Expression(e) => vec![e],
            StmtKind::LocalVar(decl) => decl
                .declarators
                .iter()
                .filter_map(|d| d.value.as_ref())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Visit every statement in this subtree, pre-order.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Stmt)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Visit every expression in this subtree, nested statements included.
    pub fn walk_exprs<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        self.walk(&mut |stmt| {
            for expr in stmt.own_exprs() {
                expr.walk(&mut *f);
            }
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Integer,
    Float,
    Boolean,
    Char,
    String,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub kind: LiteralKind,
    /// Literal text as written.
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            ">>>" => BinaryOp::UShr,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
        }
    }

    /// Whether this is one of `<`, `<=`, `>`, `>=`.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    /// Any other compound assignment (`*=`, `<<=`, ...).
    Other,
}

impl AssignOp {
    pub fn from_token(token: &str) -> Self {
        match token {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            _ => AssignOp::Other,
        }
    }
}
