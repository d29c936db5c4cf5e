//! Cross-class relationship detection.
//!
//! Only types declared in the same input count as classes. Fields typed as a
//! parameterized container (or array) of a known class are aggregations; a
//! plain field is a composition when it is final, not public, and created with
//! `new` inside a constructor. Everything else is an association.

use std::collections::HashSet;

use serde::Serialize;

use crate::parser::ast::{CompilationUnit, ExprKind, FieldDecl, TypeDecl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Association,
    Aggregation,
    Composition,
}

/// Where a relationship was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Via {
    Field,
    Parameter,
    Return,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(skip)]
    pub kind: RelationKind,
    pub via: Via,
    pub detail: String,
}

/// Relationships grouped by kind, each list in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Relationships {
    pub association: Vec<Relationship>,
    pub aggregation: Vec<Relationship>,
    pub composition: Vec<Relationship>,
    #[serde(skip)]
    seen: HashSet<(RelationKind, String, String, Via)>,
}

impl Relationships {
    /// Add a relationship unless one with the same `(from, to, via)` is
    /// already listed under its kind. Returns whether it was added.
    pub fn push(&mut self, rel: Relationship) -> bool {
        let key = (rel.kind, rel.from.clone(), rel.to.clone(), rel.via);
        if !self.seen.insert(key) {
            return false;
        }
        match rel.kind {
            RelationKind::Association => self.association.push(rel),
            RelationKind::Aggregation => self.aggregation.push(rel),
            RelationKind::Composition => self.composition.push(rel),
        }
        true
    }

    pub fn of_kind(&self, kind: RelationKind) -> &[Relationship] {
        match kind {
            RelationKind::Association => &self.association,
            RelationKind::Aggregation => &self.aggregation,
            RelationKind::Composition => &self.composition,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.composition
            .iter()
            .chain(self.aggregation.iter())
            .chain(self.association.iter())
    }

    pub fn len(&self) -> usize {
        self.association.len() + self.aggregation.len() + self.composition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether some constructor of `class` assigns `name` (or `this.name`) from a
/// `new` expression.
fn constructed_in_constructor(class: &TypeDecl, name: &str) -> bool {
    class.constructors().any(|ctor| {
        let Some(body) = &ctor.body else {
            return false;
        };
        let mut found = false;
        for stmt in body {
            stmt.walk_exprs(&mut |expr| {
                if let ExprKind::Assign { target, value, .. } = &expr.kind {
                    if target.simple_name() == Some(name)
                        && matches!(value.kind, ExprKind::New { .. })
                    {
                        found = true;
                    }
                }
            });
        }
        found
    })
}

fn field_relationships(
    class: &TypeDecl,
    field: &FieldDecl,
    known: &HashSet<&str>,
    out: &mut Relationships,
) {
    let names = field.names.join(", ");
    let detail = format!("Field: {} ({})", names, field.ty.text);
    let mut push = |to: &str, kind: RelationKind| {
        out.push(Relationship {
            from: class.name.clone(),
            to: to.to_string(),
            kind,
            via: Via::Field,
            detail: detail.clone(),
        });
    };

    let mut contained = HashSet::new();
    for arg in field.ty.nested_args() {
        if known.contains(arg.name.as_str()) {
            contained.insert(arg.name.as_str());
            push(&arg.name, RelationKind::Aggregation);
        }
    }

    let base = field.ty.name.as_str();
    if !known.contains(base) || contained.contains(base) {
        return;
    }
    if field.ty.dims > 0 {
        push(base, RelationKind::Aggregation);
        return;
    }

    let composed = !field.ty.is_generic()
        && field.modifiers.contains("final")
        && !field.modifiers.contains("public")
        && field
            .names
            .iter()
            .any(|n| constructed_in_constructor(class, n));
    if composed {
        push(base, RelationKind::Composition);
    } else {
        push(base, RelationKind::Association);
    }
}

/// Classify every reference from one declared class to another.
pub fn detect_relationships(unit: &CompilationUnit) -> Relationships {
    let classes = unit.classes();
    let known: HashSet<&str> = classes.iter().map(|t| t.name.as_str()).collect();
    let mut out = Relationships::default();

    for class in classes.iter().copied() {
        for field in &class.fields {
            field_relationships(class, field, &known, &mut out);
        }

        for method in class.plain_methods() {
            for param in &method.params {
                if known.contains(param.ty.name.as_str()) {
                    out.push(Relationship {
                        from: class.name.clone(),
                        to: param.ty.name.clone(),
                        kind: RelationKind::Association,
                        via: Via::Parameter,
                        detail: format!("Method: {}(...)", method.name),
                    });
                }
            }
            if let Some(ret) = &method.return_type {
                if known.contains(ret.name.as_str()) {
                    out.push(Relationship {
                        from: class.name.clone(),
                        to: ret.name.clone(),
                        kind: RelationKind::Association,
                        via: Via::Return,
                        detail: format!("Method: {}()", method.name),
                    });
                }
            }
        }
    }
    out
}
