//! Structural passes that run independently of the control-flow graph.
//!
//! - `extract`: class and method source spans by brace counting
//! - `relations`: association, aggregation and composition between classes
//! - `outline`: the class hierarchy tree with fields, methods and loops

pub mod extract;
pub mod outline;
pub mod relations;

pub use extract::{extract_structure, ClassMethods, ClassSpan, MethodSpan, Structure};
pub use outline::{outline, NodeKind, OutlineNode, NO_COMMENT};
pub use relations::{detect_relationships, RelationKind, Relationship, Relationships, Via};
