//! Lowering from the tree-sitter Java tree into the owned AST.

use tree_sitter::Node;

use super::ast::{
    AssignOp, BinaryOp, CompilationUnit, Declarator, Expr, ExprKind, FieldDecl, ForInit, Literal,
    LiteralKind, LocalVar, MethodDecl, MethodKind, Modifiers, Param, Stmt, StmtKind, SwitchCase,
    TypeDecl, TypeKind, TypeRef, UnaryOp, UpdateOp,
};

/// Node kinds that never carry semantics for the analyses.
fn is_trivia(node: Node) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment") || !node.is_named()
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1 // tree-sitter is 0-indexed
}

/// Converts tree-sitter nodes of one source text into AST values.
pub(crate) struct Lowering<'a> {
    source: &'a str,
}

impl<'a> Lowering<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self { source }
    }

    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    pub(crate) fn unit(&self, root: Node) -> CompilationUnit {
        let types = root
            .named_children(&mut root.walk())
            .filter_map(|n| self.type_decl(n))
            .collect();
        CompilationUnit { types }
    }

    fn type_decl(&self, node: Node) -> Option<TypeDecl> {
        let kind = match node.kind() {
            "class_declaration" => TypeKind::Class,
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "record_declaration" => TypeKind::Record,
            _ => return None,
        };

        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();

        let superclass = node
            .child_by_field_name("superclass")
            .and_then(|s| s.named_child(0))
            .map(|t| self.type_ref(t));

        let mut decl = TypeDecl {
            kind,
            name,
            line: line_of(node),
            modifiers: self.modifiers_of(node),
            superclass,
            fields: Vec::new(),
            methods: Vec::new(),
            types: Vec::new(),
        };

        if let Some(body) = node.child_by_field_name("body") {
            self.members(body, &mut decl);
        }
        Some(decl)
    }

    /// Collect members of a class, interface, enum or record body.
    fn members(&self, body: Node, decl: &mut TypeDecl) {
        for member in body.named_children(&mut body.walk()) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    decl.fields.push(self.field(member));
                }
                "method_declaration" => {
                    decl.methods.push(self.method(member, MethodKind::Method));
                }
                "constructor_declaration" | "compact_constructor_declaration" => {
                    decl.methods.push(self.method(member, MethodKind::Constructor));
                }
                "enum_body_declarations" => self.members(member, decl),
                _ => {
                    if let Some(nested) = self.type_decl(member) {
                        decl.types.push(nested);
                    }
                }
            }
        }
    }

    fn modifiers_of(&self, node: Node) -> Modifiers {
        let Some(mods) = node
            .children(&mut node.walk())
            .find(|c| c.kind() == "modifiers")
        else {
            return Modifiers::default();
        };
        let keywords = mods
            .children(&mut mods.walk())
            .filter(|c| !c.is_named())
            .map(|c| c.kind().to_string())
            .collect();
        Modifiers(keywords)
    }

    fn field(&self, node: Node) -> FieldDecl {
        let ty = node
            .child_by_field_name("type")
            .map(|t| self.type_ref(t))
            .unwrap_or_default();
        let names = node
            .children_by_field_name("declarator", &mut node.walk())
            .filter_map(|d| d.child_by_field_name("name"))
            .map(|n| self.text(n).to_string())
            .collect();
        FieldDecl {
            ty,
            names,
            modifiers: self.modifiers_of(node),
            line: line_of(node),
        }
    }

    fn method(&self, node: Node, kind: MethodKind) -> MethodDecl {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let return_type = match kind {
            MethodKind::Method => node.child_by_field_name("type").map(|t| self.type_ref(t)),
            MethodKind::Constructor => None,
        };
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.params(p))
            .unwrap_or_default();
        let body = node.child_by_field_name("body").map(|b| self.block(b));

        MethodDecl {
            kind,
            name,
            line: line_of(node),
            modifiers: self.modifiers_of(node),
            return_type,
            params,
            body,
        }
    }

    fn params(&self, node: Node) -> Vec<Param> {
        let mut params = Vec::new();
        for p in node.named_children(&mut node.walk()) {
            match p.kind() {
                "formal_parameter" => {
                    let ty = p
                        .child_by_field_name("type")
                        .map(|t| self.type_ref(t))
                        .unwrap_or_default();
                    let name = p
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default();
                    params.push(Param { ty, name });
                }
                "spread_parameter" => {
                    let mut ty = TypeRef::default();
                    let mut name = String::new();
                    for c in p.named_children(&mut p.walk()) {
                        match c.kind() {
                            "modifiers" => {}
                            "variable_declarator" => {
                                name = c
                                    .child_by_field_name("name")
                                    .map(|n| self.text(n).to_string())
                                    .unwrap_or_default();
                            }
                            _ => ty = self.type_ref(c),
                        }
                    }
                    ty.dims += 1;
                    params.push(Param { ty, name });
                }
                _ => {}
            }
        }
        params
    }

    fn type_ref(&self, node: Node) -> TypeRef {
        let text = self.text(node).to_string();
        match node.kind() {
            "generic_type" => {
                let mut name = String::new();
                let mut args = Vec::new();
                for c in node.named_children(&mut node.walk()) {
                    match c.kind() {
                        "type_arguments" => {
                            args = c
                                .named_children(&mut c.walk())
                                .map(|a| self.type_arg(a))
                                .collect();
                        }
                        _ => name = self.type_ref(c).name,
                    }
                }
                TypeRef {
                    name,
                    args,
                    dims: 0,
                    text,
                }
            }
            "scoped_type_identifier" => {
                let last = node
                    .named_children(&mut node.walk())
                    .filter(|c| !matches!(c.kind(), "annotation" | "marker_annotation"))
                    .last();
                match last {
                    Some(inner) => TypeRef {
                        text,
                        ..self.type_ref(inner)
                    },
                    None => TypeRef {
                        name: text.clone(),
                        text,
                        ..TypeRef::default()
                    },
                }
            }
            "array_type" => {
                let element = node
                    .child_by_field_name("element")
                    .map(|e| self.type_ref(e))
                    .unwrap_or_default();
                let dims = node
                    .child_by_field_name("dimensions")
                    .map(|d| self.text(d).matches('[').count())
                    .unwrap_or(1);
                TypeRef {
                    dims: element.dims + dims,
                    text,
                    ..element
                }
            }
            "annotated_type" => {
                let inner = node
                    .named_children(&mut node.walk())
                    .filter(|c| !matches!(c.kind(), "annotation" | "marker_annotation"))
                    .last();
                match inner {
                    Some(inner) => self.type_ref(inner),
                    None => TypeRef::default(),
                }
            }
            _ => TypeRef {
                name: text.clone(),
                text,
                ..TypeRef::default()
            },
        }
    }

    fn type_arg(&self, node: Node) -> TypeRef {
        if node.kind() != "wildcard" {
            return self.type_ref(node);
        }
        let bound = node
            .named_children(&mut node.walk())
            .filter(|c| !matches!(c.kind(), "annotation" | "marker_annotation" | "super"))
            .last();
        match bound {
            Some(b) => self.type_ref(b),
            None => TypeRef {
                name: "?".to_string(),
                text: self.text(node).to_string(),
                ..TypeRef::default()
            },
        }
    }

    /// Lower the statements of a `block` or `constructor_body`.
    fn block(&self, node: Node) -> Vec<Stmt> {
        node.named_children(&mut node.walk())
            .filter(|c| !is_trivia(*c))
            .map(|c| self.statement(c))
            .collect()
    }

    fn statement(&self, node: Node) -> Stmt {
        let kind = match node.kind() {
            "block" => StmtKind::Block(self.block(node)),
            "expression_statement" => match node.named_child(0) {
                Some(e) => StmtKind::Expression(self.expr(e)),
                None => StmtKind::Other(Vec::new()),
            },
            "local_variable_declaration" => StmtKind::LocalVar(self.local_var(node)),
            "if_statement" => {
                let cond = self.field_expr(node, "condition");
                let then_branch = Box::new(self.field_stmt(node, "consequence"));
                let else_branch = node
                    .child_by_field_name("alternative")
                    .map(|a| Box::new(self.statement(a)));
                StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                }
            }
            "while_statement" => StmtKind::While {
                cond: self.field_expr(node, "condition"),
                body: Box::new(self.field_stmt(node, "body")),
            },
            "do_statement" => StmtKind::DoWhile {
                body: Box::new(self.field_stmt(node, "body")),
                cond: self.field_expr(node, "condition"),
            },
            "for_statement" => self.for_statement(node),
            "enhanced_for_statement" => StmtKind::ForEach {
                ty: node
                    .child_by_field_name("type")
                    .map(|t| self.type_ref(t))
                    .unwrap_or_default(),
                var: node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                iterable: self.field_expr(node, "value"),
                body: Box::new(self.field_stmt(node, "body")),
            },
            "switch_expression" | "switch_statement" => StmtKind::Switch {
                subject: self.field_expr(node, "condition"),
                cases: node
                    .child_by_field_name("body")
                    .map(|b| self.switch_cases(b))
                    .unwrap_or_default(),
            },
            "return_statement" => {
                StmtKind::Return(node.named_child(0).map(|e| self.expr(e)))
            }
            "break_statement" => StmtKind::Break(self.jump_label(node)),
            "continue_statement" => StmtKind::Continue(self.jump_label(node)),
            "labeled_statement" => {
                let label = node
                    .named_child(0)
                    .map(|l| self.text(l).to_string())
                    .unwrap_or_default();
                let body = node
                    .named_children(&mut node.walk())
                    .skip(1)
                    .find(|c| !is_trivia(*c));
                match body {
                    Some(b) => StmtKind::Labeled {
                        label,
                        body: Box::new(self.statement(b)),
                    },
                    None => StmtKind::Other(Vec::new()),
                }
            }
            _ => StmtKind::Other(self.nested_blocks(node)),
        };

        Stmt {
            line: line_of(node),
            text: self.text(node).to_string(),
            kind,
        }
    }

    /// Blocks directly inside an unexpanded statement, including the bodies
    /// of its catch and finally clauses.
    fn nested_blocks(&self, node: Node) -> Vec<Stmt> {
        let mut out = Vec::new();
        for child in node.named_children(&mut node.walk()) {
            match child.kind() {
                "block" => out.push(self.statement(child)),
                "catch_clause" | "finally_clause" => out.extend(self.nested_blocks(child)),
                _ => {}
            }
        }
        out
    }

    fn jump_label(&self, node: Node) -> Option<String> {
        node.named_children(&mut node.walk())
            .find(|c| c.kind() == "identifier")
            .map(|c| self.text(c).to_string())
    }

    fn field_stmt(&self, node: Node, field: &str) -> Stmt {
        match node.child_by_field_name(field) {
            Some(s) => self.statement(s),
            None => Stmt {
                line: line_of(node),
                text: String::new(),
                kind: StmtKind::Block(Vec::new()),
            },
        }
    }

    fn field_expr(&self, node: Node, field: &str) -> Expr {
        match node.child_by_field_name(field) {
            Some(e) => self.expr(e),
            None => Expr {
                line: line_of(node),
                text: String::new(),
                kind: ExprKind::Other(Vec::new()),
            },
        }
    }

    fn for_statement(&self, node: Node) -> StmtKind {
        let mut init = Vec::new();
        let mut init_parts = Vec::new();
        for i in node.children_by_field_name("init", &mut node.walk()) {
            if i.kind() == "local_variable_declaration" {
                init.push(ForInit::Decl(self.local_var(i)));
                init_parts.push(self.text(i).trim_end_matches(';').to_string());
            } else {
                init.push(ForInit::Expr(self.expr(i)));
                init_parts.push(self.text(i).to_string());
            }
        }
        let update = node
            .children_by_field_name("update", &mut node.walk())
            .map(|u| self.expr(u))
            .collect();

        StmtKind::For {
            init,
            init_text: init_parts.join(", "),
            cond: node.child_by_field_name("condition").map(|c| self.expr(c)),
            update,
            body: Box::new(self.field_stmt(node, "body")),
        }
    }

    fn local_var(&self, node: Node) -> LocalVar {
        let ty = node
            .child_by_field_name("type")
            .map(|t| self.type_ref(t))
            .unwrap_or_default();
        let declarators = node
            .children_by_field_name("declarator", &mut node.walk())
            .map(|d| Declarator {
                name: d
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                value: d.child_by_field_name("value").map(|v| self.expr(v)),
            })
            .collect();
        LocalVar { ty, declarators }
    }

    fn switch_cases(&self, block: Node) -> Vec<SwitchCase> {
        let mut cases = Vec::new();
        for group in block.named_children(&mut block.walk()) {
            let arrow = match group.kind() {
                "switch_block_statement_group" => false,
                "switch_rule" => true,
                _ => continue,
            };
            let mut case = SwitchCase {
                line: line_of(group),
                labels: Vec::new(),
                is_default: false,
                arrow,
                body: Vec::new(),
            };
            for c in group.named_children(&mut group.walk()) {
                if is_trivia(c) {
                    continue;
                }
                if c.kind() == "switch_label" {
                    let values: Vec<String> = c
                        .named_children(&mut c.walk())
                        .filter(|v| !is_trivia(*v))
                        .map(|v| self.text(v).to_string())
                        .collect();
                    if values.is_empty() {
                        case.is_default = true;
                    }
                    case.labels.extend(values);
                } else {
                    case.body.push(self.statement(c));
                }
            }
            cases.push(case);
        }
        cases
    }

    fn expr(&self, node: Node) -> Expr {
        let kind = match node.kind() {
            "parenthesized_expression" => {
                if let Some(inner) = node.named_children(&mut node.walk()).find(|c| !is_trivia(*c))
                {
                    return self.expr(inner);
                }
                ExprKind::Other(Vec::new())
            }
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => self.literal(node, LiteralKind::Integer),
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                self.literal(node, LiteralKind::Float)
            }
            "true" | "false" => self.literal(node, LiteralKind::Boolean),
            "character_literal" => self.literal(node, LiteralKind::Char),
            "string_literal" | "text_block" => self.literal(node, LiteralKind::String),
            "null_literal" => self.literal(node, LiteralKind::Null),
            "identifier" => ExprKind::Name(self.text(node).to_string()),
            "this" => ExprKind::This,
            "field_access" => match node.child_by_field_name("object") {
                Some(object) => ExprKind::FieldAccess {
                    object: Box::new(self.expr(object)),
                    field: node
                        .child_by_field_name("field")
                        .map(|f| self.text(f).to_string())
                        .unwrap_or_default(),
                },
                None => self.opaque(node),
            },
            "array_access" => ExprKind::ArrayAccess {
                array: Box::new(self.field_expr(node, "array")),
                index: Box::new(self.field_expr(node, "index")),
            },
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .and_then(|o| BinaryOp::from_token(o.kind()));
                match op {
                    Some(op) => ExprKind::Binary {
                        op,
                        left: Box::new(self.field_expr(node, "left")),
                        right: Box::new(self.field_expr(node, "right")),
                    },
                    None => self.opaque(node),
                }
            }
            "unary_expression" => {
                let op = match node.child_by_field_name("operator").map(|o| o.kind()) {
                    Some("!") => UnaryOp::Not,
                    Some("-") => UnaryOp::Neg,
                    Some("+") => UnaryOp::Plus,
                    Some("~") => UnaryOp::BitNot,
                    _ => return self.opaque_expr(node),
                };
                ExprKind::Unary {
                    op,
                    operand: Box::new(self.field_expr(node, "operand")),
                }
            }
            "update_expression" => self.update(node),
            "assignment_expression" => ExprKind::Assign {
                op: node
                    .child_by_field_name("operator")
                    .map(|o| AssignOp::from_token(o.kind()))
                    .unwrap_or(AssignOp::Other),
                target: Box::new(self.field_expr(node, "left")),
                value: Box::new(self.field_expr(node, "right")),
            },
            "method_invocation" => ExprKind::Call {
                receiver: node
                    .child_by_field_name("object")
                    .map(|o| Box::new(self.expr(o))),
                name: node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                args: self.arguments(node),
            },
            "object_creation_expression" => ExprKind::New {
                ty: node
                    .child_by_field_name("type")
                    .map(|t| self.type_ref(t))
                    .unwrap_or_default(),
                args: self.arguments(node),
            },
            "cast_expression" => ExprKind::Cast {
                ty: node
                    .child_by_field_name("type")
                    .map(|t| self.type_ref(t))
                    .unwrap_or_default(),
                value: Box::new(self.field_expr(node, "value")),
            },
            _ => self.opaque(node),
        };

        Expr {
            line: line_of(node),
            text: self.text(node).to_string(),
            kind,
        }
    }

    fn opaque(&self, node: Node) -> ExprKind {
        ExprKind::Other(
            node.named_children(&mut node.walk())
                .filter(|c| !is_trivia(*c))
                .map(|c| self.expr(c))
                .collect(),
        )
    }

    fn opaque_expr(&self, node: Node) -> Expr {
        Expr {
            line: line_of(node),
            text: self.text(node).to_string(),
            kind: self.opaque(node),
        }
    }

    fn literal(&self, node: Node, kind: LiteralKind) -> ExprKind {
        ExprKind::Literal(Literal {
            kind,
            value: self.text(node).to_string(),
        })
    }

    fn update(&self, node: Node) -> ExprKind {
        let mut op = None;
        let mut prefix = false;
        let mut target = None;
        for (i, c) in node.children(&mut node.walk()).enumerate() {
            match c.kind() {
                "++" => {
                    op = Some(UpdateOp::Increment);
                    prefix = i == 0;
                }
                "--" => {
                    op = Some(UpdateOp::Decrement);
                    prefix = i == 0;
                }
                _ if c.is_named() && !is_trivia(c) => target = Some(self.expr(c)),
                _ => {}
            }
        }
        match (op, target) {
            (Some(op), Some(target)) => ExprKind::Update {
                op,
                prefix,
                target: Box::new(target),
            },
            _ => self.opaque(node),
        }
    }

    fn arguments(&self, node: Node) -> Vec<Expr> {
        match node.child_by_field_name("arguments") {
            Some(args) => args
                .named_children(&mut args.walk())
                .filter(|c| !is_trivia(*c))
                .map(|c| self.expr(c))
                .collect(),
            None => Vec::new(),
        }
    }
}
