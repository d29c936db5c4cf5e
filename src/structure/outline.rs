//! Class hierarchy outline.
//!
//! Classes nest under the class they extend when that parent is declared in
//! the same input; everything else is a root. Each class lists its fields and
//! methods, and each method its top-level locals and loops.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::comments::Comments;
use crate::parser::ast::{CompilationUnit, ForInit, LocalVar, MethodDecl, Stmt, StmtKind, TypeDecl};

/// Placeholder comment for nodes the generator produced nothing for.
pub const NO_COMMENT: &str = "No comment available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Class,
    Fields,
    Field,
    Methods,
    Method,
    Variables,
    Variable,
    Loops,
    Loop,
    Subclasses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineNode {
    pub name: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            comment: None,
            children: Vec::new(),
        }
    }

    fn group(name: &str, kind: NodeKind, children: Vec<OutlineNode>) -> Option<Self> {
        if children.is_empty() {
            return None;
        }
        Some(Self {
            children,
            ..Self::new(name, kind)
        })
    }

    /// First direct child of the given kind.
    pub fn child(&self, kind: NodeKind) -> Option<&OutlineNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// Depth-first search by exact name.
    pub fn find(&self, name: &str) -> Option<&OutlineNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Number of nodes in this subtree, itself included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

fn join_words(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn declared(decl: &LocalVar) -> impl Iterator<Item = String> + '_ {
    decl.declarators
        .iter()
        .map(move |d| format!("{} {}", decl.ty.text, d.name))
}

/// Locals declared directly in a statement list, nested blocks excluded.
fn top_level_locals(stmts: &[Stmt]) -> Vec<String> {
    stmts
        .iter()
        .filter_map(|s| match &s.kind {
            StmtKind::LocalVar(decl) => Some(declared(decl)),
            _ => None,
        })
        .flatten()
        .collect()
}

fn body_statements(body: &Stmt) -> &[Stmt] {
    match &body.kind {
        StmtKind::Block(stmts) => stmts,
        _ => std::slice::from_ref(body),
    }
}

fn loop_node(stmt: &Stmt) -> Option<OutlineNode> {
    let (name, mut vars, body) = match &stmt.kind {
        StmtKind::For { init, body, .. } => {
            let vars = init
                .iter()
                .filter_map(|i| match i {
                    ForInit::Decl(decl) => Some(declared(decl)),
                    ForInit::Expr(_) => None,
                })
                .flatten()
                .collect();
            ("For", vars, body)
        }
        StmtKind::ForEach { ty, var, body, .. } => {
            ("ForEach", vec![format!("{} {}", ty.text, var)], body)
        }
        StmtKind::While { body, .. } => ("While", Vec::new(), body),
        StmtKind::DoWhile { body, .. } => ("Do", Vec::new(), body),
        _ => return None,
    };
    vars.extend(top_level_locals(body_statements(body)));

    let mut node = OutlineNode::new(name, NodeKind::Loop);
    node.children = vars
        .into_iter()
        .map(|v| OutlineNode::new(v, NodeKind::Variable))
        .collect();
    Some(node)
}

fn method_signature(method: &MethodDecl) -> String {
    let params = method
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty.text, p.name))
        .collect::<Vec<_>>()
        .join(", ");
    let modifiers = method.modifiers.to_string();
    let ret = method
        .return_type
        .as_ref()
        .map(|t| t.text.as_str())
        .unwrap_or("void");
    format!(
        "{}({})",
        join_words(&[modifiers.as_str(), ret, method.name.as_str()]),
        params
    )
}

fn method_node(class: &str, method: &MethodDecl, comments: Option<&Comments>) -> OutlineNode {
    let mut node = OutlineNode::new(method_signature(method), NodeKind::Method);
    node.comment = comments.map(|c| {
        c.method(class, &method.name)
            .unwrap_or(NO_COMMENT)
            .to_string()
    });

    let body = method.body.as_deref().unwrap_or(&[]);
    let vars = top_level_locals(body)
        .into_iter()
        .map(|v| OutlineNode::new(v, NodeKind::Variable))
        .collect();
    let loops = body.iter().filter_map(loop_node).collect();
    node.children.extend(OutlineNode::group("Variables", NodeKind::Variables, vars));
    node.children.extend(OutlineNode::group("Loops", NodeKind::Loops, loops));
    node
}

struct Hierarchy<'a> {
    subclasses: HashMap<&'a str, Vec<&'a TypeDecl>>,
    comments: Option<&'a Comments>,
}

impl<'a> Hierarchy<'a> {
    fn class_node(&self, ty: &'a TypeDecl, visited: &mut HashSet<&'a str>) -> Option<OutlineNode> {
        if !visited.insert(ty.name.as_str()) {
            return None;
        }

        let name = match &ty.superclass {
            Some(parent) => format!("{} extends {}", ty.name, parent.name),
            None => ty.name.clone(),
        };
        let mut node = OutlineNode::new(name, NodeKind::Class);
        node.comment = self
            .comments
            .map(|c| c.class(&ty.name).unwrap_or(NO_COMMENT).to_string());

        let fields = ty
            .fields
            .iter()
            .flat_map(|f| {
                let modifiers = f.modifiers.to_string();
                f.names
                    .iter()
                    .map(move |n| join_words(&[modifiers.as_str(), f.ty.text.as_str(), n.as_str()]))
                    .collect::<Vec<_>>()
            })
            .map(|n| OutlineNode::new(n, NodeKind::Field))
            .collect();
        let methods = ty
            .plain_methods()
            .map(|m| method_node(&ty.name, m, self.comments))
            .collect();
        node.children.extend(OutlineNode::group("Fields", NodeKind::Fields, fields));
        node.children.extend(OutlineNode::group("Methods", NodeKind::Methods, methods));

        let children = self
            .subclasses
            .get(ty.name.as_str())
            .map(|subs| {
                subs.iter()
                    .copied()
                    .filter_map(|s| self.class_node(s, visited))
                    .collect()
            })
            .unwrap_or_default();
        node.children.extend(OutlineNode::group("Subclasses", NodeKind::Subclasses, children));
        Some(node)
    }
}

/// Build the outline tree of every class in `unit`.
///
/// When `comments` is given, class and method nodes carry their generated
/// comment (or [`NO_COMMENT`]); otherwise they carry none.
pub fn outline(unit: &CompilationUnit, comments: Option<&Comments>) -> OutlineNode {
    let classes = unit.classes();
    let by_name: HashMap<&str, &TypeDecl> =
        classes.iter().map(|t| (t.name.as_str(), *t)).collect();

    let mut roots = Vec::new();
    let mut subclasses: HashMap<&str, Vec<&TypeDecl>> = HashMap::new();
    for ty in &classes {
        match &ty.superclass {
            Some(parent) if by_name.contains_key(parent.name.as_str()) => {
                subclasses.entry(parent.name.as_str()).or_default().push(*ty)
            }
            _ => roots.push(*ty),
        }
    }

    let hierarchy = Hierarchy {
        subclasses,
        comments,
    };
    let mut visited = HashSet::new();
    let mut root = OutlineNode::new("Root", NodeKind::Root);
    for ty in roots {
        root.children.extend(hierarchy.class_node(ty, &mut visited));
    }
    // Inheritance cycles have no root; list their members at the top level.
    for ty in &classes {
        if !visited.contains(ty.name.as_str()) {
            root.children.extend(hierarchy.class_node(ty, &mut visited));
        }
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::JavaParser;

    const SHAPES: &str = r#"
class Square extends Rect {
    void grow() {}
}
class Shape {
    protected String label;
    private int x, y;

    public abstract double area();

    int sum(int[] values, int bias) {
        int total = 0;
        for (int i = 0; i < values.length; i++) {
            int v = values[i];
            total += v;
        }
        while (total > 100) {
            total -= 100;
        }
        for (int v : values) {
            total += v;
        }
        return total;
    }
}
class Rect extends Shape {
    Rect() {}
}
class Widget extends javax.swing.JPanel {}
"#;

    fn tree() -> OutlineNode {
        let unit = JavaParser::new().parse(SHAPES).unwrap();
        outline(&unit, None)
    }

    #[test]
    fn test_hierarchy_nests_regardless_of_order() {
        let root = tree();
        assert_eq!(root.kind, NodeKind::Root);
        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Shape", "Widget extends JPanel"]);

        let shape = &root.children[0];
        let subs = shape.child(NodeKind::Subclasses).unwrap();
        assert_eq!(subs.children[0].name, "Rect extends Shape");
        let square = subs.children[0]
            .child(NodeKind::Subclasses)
            .unwrap();
        assert_eq!(square.children[0].name, "Square extends Rect");
    }

    #[test]
    fn test_fields_and_method_signatures() {
        let root = tree();
        let shape = &root.children[0];

        let fields: Vec<&str> = shape
            .child(NodeKind::Fields)
            .unwrap()
            .children
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(fields, vec!["protected String label", "private int x", "private int y"]);

        let methods = shape.child(NodeKind::Methods).unwrap();
        assert_eq!(methods.children[0].name, "public abstract double area()");
        assert_eq!(methods.children[1].name, "int sum(int[] values, int bias)");

        // Constructors are not listed.
        let rect = root.find("Rect extends Shape").unwrap();
        assert!(rect.child(NodeKind::Methods).is_none());
    }

    #[test]
    fn test_method_variables_and_loops() {
        let root = tree();
        let sum = root.find("int sum(int[] values, int bias)").unwrap();

        let vars = sum.child(NodeKind::Variables).unwrap();
        assert_eq!(vars.children.len(), 1);
        assert_eq!(vars.children[0].name, "int total");

        let loops = sum.child(NodeKind::Loops).unwrap();
        let summary: Vec<(&str, Vec<&str>)> = loops
            .children
            .iter()
            .map(|l| {
                (
                    l.name.as_str(),
                    l.children.iter().map(|v| v.name.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("For", vec!["int i", "int v"]),
                ("While", vec![]),
                ("ForEach", vec!["int v"]),
            ]
        );
    }

    #[test]
    fn test_comments_attached_when_provided() {
        let unit = JavaParser::new().parse(SHAPES).unwrap();
        let mut comments = Comments::default();
        comments.insert_class("Shape", "Base shape.");
        comments.insert_method("Shape", "sum", "Adds values.");

        let root = outline(&unit, Some(&comments));
        let shape = &root.children[0];
        assert_eq!(shape.comment.as_deref(), Some("Base shape."));
        let methods = shape.child(NodeKind::Methods).unwrap();
        assert_eq!(methods.children[0].comment.as_deref(), Some(NO_COMMENT));
        assert_eq!(methods.children[1].comment.as_deref(), Some("Adds values."));

        // Without comments nothing is attached.
        assert!(tree().children[0].comment.is_none());
    }

    #[test]
    fn test_inheritance_cycle_still_listed() {
        let unit = JavaParser::new()
            .parse("class A extends B {}\nclass B extends A {}\n")
            .unwrap();
        let root = outline(&unit, None);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "A extends B");
        assert_eq!(root.len(), 4);
    }

    #[test]
    fn test_json_shape() {
        let node = OutlineNode::new("Root", NodeKind::Root);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "root");
        assert!(json.get("comment").is_none());
        assert!(json["children"].as_array().unwrap().is_empty());
    }
}
