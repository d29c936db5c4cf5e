//! Integration tests for span extraction, relationship detection and the
//! class outline.

use std::fs;
use std::path::PathBuf;

use javaflow::comments::{CommentError, CommentGenerator};
use javaflow::structure::{NodeKind, RelationKind, Relationships, Via, NO_COMMENT};
use javaflow::{generate_comments, AnalysisContext, FileAnalysis, Settings};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn analyze(name: &str) -> FileAnalysis {
    let ctx = AnalysisContext::new(testdata_path(), Settings::default());
    ctx.analyze_file(name)
        .unwrap_or_else(|e| panic!("failed to analyze {}: {}", name, e))
}

fn has(rels: &Relationships, kind: RelationKind, from: &str, to: &str, via: Via) -> bool {
    rels.of_kind(kind)
        .iter()
        .any(|r| r.from == from && r.to == to && r.via == via)
}

// =============================================================================
// Spans
// =============================================================================

#[test]
fn test_class_spans() {
    let structure = analyze("Bank.java").structure();

    let names: Vec<&str> = structure.classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Bank", "Account", "SavingsAccount", "Ledger", "Auditor"]
    );
    assert_eq!(structure.class("Auditor"), Some("class Auditor { }"));

    let bank = structure.class("Bank").unwrap();
    assert!(bank.starts_with("public class Bank {"));
    assert!(bank.contains("private final Ledger ledger;"));
    assert!(bank.ends_with("ledger.append(event); } }"));
    assert!(!bank.contains("class Account"));
}

#[test]
fn test_method_spans() {
    let structure = analyze("Bank.java").structure();

    let bank: Vec<&str> = structure
        .methods_of("Bank")
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    // Constructors are not listed.
    assert_eq!(bank, vec!["open", "find", "record"]);

    let deposit = structure
        .methods_of("Account")
        .iter()
        .find(|m| m.name == "deposit")
        .unwrap();
    assert_eq!(
        deposit.code,
        "void deposit(int amount) {\n        balance += amount;\n    }"
    );

    let find = &structure.methods_of("Bank")[1];
    assert!(find.code.starts_with("public Account find(String id) {"));
    assert!(find.code.contains("return null;"));
    assert!(find.code.ends_with('}'));

    assert!(structure.methods_of("Auditor").is_empty());
}

#[test]
fn test_snippet_structure() {
    let source = fs::read_to_string(testdata_path().join("snippets/greeter.txt")).unwrap();
    let ctx = AnalysisContext::new(testdata_path(), Settings::default());
    let structure = ctx.analyze_source("-", &source).unwrap().structure();

    // The placeholder class has no span of its own.
    assert!(structure.classes.is_empty());
    let methods = structure.methods_of("Snippet");
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[0].name, "greet");
    assert!(methods[0].code.starts_with("void greet(String name) {"));
    assert_eq!(
        methods[1].code,
        "void log(String message) {\n    System.out.println(message);\n}"
    );
}

// =============================================================================
// Relationships
// =============================================================================

#[test]
fn test_bank_relationships() {
    let rels = analyze("Bank.java").relationships();

    assert!(has(&rels, RelationKind::Composition, "Bank", "Ledger", Via::Field));
    assert!(has(&rels, RelationKind::Aggregation, "Bank", "Account", Via::Field));
    assert!(has(&rels, RelationKind::Association, "Bank", "Auditor", Via::Field));
    assert!(has(&rels, RelationKind::Association, "Bank", "Account", Via::Parameter));
    assert!(has(&rels, RelationKind::Association, "Bank", "Account", Via::Return));

    assert_eq!(rels.of_kind(RelationKind::Composition).len(), 1);
    assert_eq!(rels.of_kind(RelationKind::Aggregation).len(), 1);
    assert_eq!(rels.of_kind(RelationKind::Association).len(), 3);
    assert!(rels.iter().all(|r| r.from == "Bank"));

    let composition = &rels.of_kind(RelationKind::Composition)[0];
    assert_eq!(composition.detail, "Field: ledger (Ledger)");
    let aggregation = &rels.of_kind(RelationKind::Aggregation)[0];
    assert_eq!(aggregation.detail, "Field: accounts (List<Account>)");
}

#[test]
fn test_company_relationships() {
    let rels = analyze("Company.java").relationships();

    assert!(has(&rels, RelationKind::Composition, "Company", "Office", Via::Field));
    // A public field is never composed, even when initialized in place.
    assert!(has(&rels, RelationKind::Association, "Company", "Office", Via::Field));

    assert!(has(&rels, RelationKind::Aggregation, "Company", "Employee", Via::Field));
    assert!(has(&rels, RelationKind::Aggregation, "Company", "Manager", Via::Field));
    assert!(has(&rels, RelationKind::Aggregation, "Manager", "Employee", Via::Field));

    assert!(has(&rels, RelationKind::Association, "Company", "Employee", Via::Parameter));
    assert!(has(&rels, RelationKind::Association, "Company", "Manager", Via::Return));

    assert_eq!(rels.len(), 7);
}

#[test]
fn test_final_collection_built_in_constructor_is_aggregation() {
    let ctx = AnalysisContext::new(testdata_path(), Settings::default());
    let source = "class Employee {}\nclass Dept {\n  private final List<Employee> staff;\n  Dept() {\n    this.staff = new ArrayList<>();\n  }\n}\n";
    let rels = ctx.analyze_source("Dept.java", source).unwrap().relationships();

    assert!(has(&rels, RelationKind::Aggregation, "Dept", "Employee", Via::Field));
    assert!(rels.of_kind(RelationKind::Composition).is_empty());
    assert_eq!(rels.len(), 1);
}

// =============================================================================
// Outline
// =============================================================================

#[test]
fn test_outline_hierarchy() {
    let root = analyze("Bank.java").outline(None);
    assert_eq!(root.kind, NodeKind::Root);

    let tops: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(tops, vec!["Bank", "Account", "Ledger", "Auditor"]);

    let account = root.find("Account").unwrap();
    let subclasses = account.child(NodeKind::Subclasses).unwrap();
    assert_eq!(subclasses.children[0].name, "SavingsAccount extends Account");

    // Classes without members have no groups.
    assert!(root.find("Auditor").unwrap().is_empty());
    assert!(root.find("Auditor").unwrap().comment.is_none());
}

#[test]
fn test_outline_members() {
    let root = analyze("Company.java").outline(None);

    let company = root.find("Company").unwrap();
    let fields: Vec<&str> = company
        .child(NodeKind::Fields)
        .unwrap()
        .children
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(
        fields,
        vec![
            "private final Office headquarters",
            "private List<Employee> staff",
            "private Map<String, List<Manager>> managersByRegion",
            "public final Office branch",
        ]
    );

    let methods = company.child(NodeKind::Methods).unwrap();
    assert!(methods.find("public void hire(Employee employee)").is_some());
    assert!(methods.find("public Manager lead(String region)").is_some());

    let review = root.find("void review()").unwrap();
    let loops = review.child(NodeKind::Loops).unwrap();
    assert_eq!(loops.children[0].name, "ForEach");
    assert_eq!(loops.children[0].children[0].name, "Employee e");

    let manager = root.find("Manager extends Employee").unwrap();
    assert!(manager.find("private Employee[] reports").is_some());
}

/// Comments with the first two words of each input; refuses anything that
/// mentions the auditor.
struct Summarizer;

impl CommentGenerator for Summarizer {
    fn generate_batch(&self, inputs: &[String]) -> Result<Vec<String>, CommentError> {
        inputs
            .iter()
            .map(|input| {
                if input.contains("Auditor") {
                    return Err(CommentError::Generator("refused".to_string()));
                }
                let words: Vec<&str> = input.split_whitespace().take(2).collect();
                Ok(format!("starts with {}", words.join(" ")))
            })
            .collect()
    }
}

#[test]
fn test_outline_with_generated_comments() {
    let analysis = analyze("Bank.java");
    let comments = generate_comments(&analysis.structure(), &Summarizer, 4);

    assert_eq!(comments.class("Bank"), None);
    assert_eq!(
        comments.class("Ledger"),
        Some("Starts with class Ledger.")
    );
    assert_eq!(
        comments.method("Bank", "record"),
        Some("Starts with private void.")
    );

    let root = analysis.outline(Some(&comments));
    let ledger = root.find("Ledger").unwrap();
    assert_eq!(ledger.comment.as_deref(), Some("Starts with class Ledger."));
    // Refused inputs fall back to the placeholder.
    let auditor = root.find("Auditor").unwrap();
    assert_eq!(auditor.comment.as_deref(), Some(NO_COMMENT));
}
