//! Output format tests: JSON documents, DOT source and directory collection.

use std::path::PathBuf;

use javaflow::cli::collect_files;
use javaflow::report::{graph_json, to_json, JsonFile, JsonOutline};
use javaflow::{to_dot, AnalysisContext, FileAnalysis, Settings, Theme};
use serde_json::Value;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn analyze(name: &str) -> FileAnalysis {
    let ctx = AnalysisContext::new(testdata_path(), Settings::default());
    ctx.analyze_file(name)
        .unwrap_or_else(|e| panic!("failed to analyze {}: {}", name, e))
}

#[test]
fn test_graph_json_shape() {
    let analysis = analyze("Loops.java");
    let cfg = analysis.cfg(&Settings::default());
    let files = vec![JsonFile {
        path: analysis.path.clone(),
        wrapped: analysis.wrapped(),
        payload: graph_json(&cfg),
    }];
    let json = to_json(files, &[]).unwrap();
    let doc: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(doc["version"], env!("CARGO_PKG_VERSION"));
    assert!(doc["errors"].as_array().unwrap().is_empty());

    let file = &doc["files"][0];
    assert_eq!(file["path"], "Loops.java");
    assert_eq!(file["wrapped"], false);

    let blocks = file["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), cfg.graph.len());
    assert_eq!(blocks[0]["id"], "B0");
    assert_eq!(blocks[0]["kind"], "method_entry");
    assert_eq!(blocks[0]["method"], "Loops.countUp");
    assert_eq!(blocks[0]["group"], 0);
    assert_eq!(blocks[0]["lines"][0]["line"], 3);
    assert_eq!(blocks[0]["lines"][0]["text"], "int total = 0;");

    let edges = file["edges"].as_array().unwrap();
    assert_eq!(edges.len(), cfg.graph.edge_count());
    assert!(edges.iter().all(|e| e["from"].is_string() && e["to"].is_string()));

    let methods = file["methods"].as_array().unwrap();
    let spin = methods.iter().find(|m| m["key"] == "Loops.spin").unwrap();
    assert!(spin["exits"].as_array().unwrap().is_empty());
    assert_eq!(spin["line"], 10);
}

#[test]
fn test_errors_in_json() {
    let ctx = AnalysisContext::new(testdata_path(), Settings::default());
    let err = ctx
        .analyze_source("Broken.java", "class Broken {\n  void f( {\n}\n")
        .unwrap_err();
    let json = to_json::<Value>(Vec::new(), &[err]).unwrap();
    let doc: Value = serde_json::from_str(&json).unwrap();

    let errors = doc["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], "Broken.java");
    assert!(errors[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Java syntax error"));
    assert!(errors[0]["line"].is_u64());
}

#[test]
fn test_relationships_json() {
    let analysis = analyze("Bank.java");
    let rels = serde_json::to_value(analysis.relationships()).unwrap();

    assert_eq!(rels["composition"][0]["from"], "Bank");
    assert_eq!(rels["composition"][0]["to"], "Ledger");
    assert_eq!(rels["composition"][0]["via"], "field");
    assert_eq!(rels["aggregation"].as_array().unwrap().len(), 1);
    assert_eq!(rels["association"].as_array().unwrap().len(), 3);
    // The kind is implied by the list a relationship sits in.
    assert!(rels["association"][0].get("kind").is_none());
    assert!(rels.get("seen").is_none());
}

#[test]
fn test_outline_json() {
    let analysis = analyze("Company.java");
    let payload = JsonOutline {
        outline: analysis.outline(None),
    };
    let doc = serde_json::to_value(&payload).unwrap();

    let root = &doc["outline"];
    assert_eq!(root["name"], "Root");
    assert_eq!(root["kind"], "root");
    assert!(root.get("comment").is_none());
    assert_eq!(root["children"][0]["name"], "Company");
    assert_eq!(root["children"][0]["kind"], "class");
    assert_eq!(root["children"][0]["children"][0]["kind"], "fields");
}

#[test]
fn test_structure_json() {
    let analysis = analyze("Bank.java");
    let doc = serde_json::to_value(analysis.structure()).unwrap();

    assert_eq!(doc["classes"][0]["name"], "Bank");
    assert!(doc["classes"][0]["code"]
        .as_str()
        .unwrap()
        .starts_with("public class Bank {"));
    assert_eq!(doc["methods"][0]["class"], "Bank");
    assert_eq!(doc["methods"][0]["methods"][0]["name"], "open");
}

#[test]
fn test_dot_output() {
    let cfg = analyze("Switches.java").cfg(&Settings::default());

    let dot = to_dot(&cfg, Theme::Light);
    assert!(dot.starts_with("digraph cfg {"));
    assert!(dot.contains("CASE: case 2, 3"));
    assert!(dot.contains("SWITCH MERGE"));
    assert!(dot.contains("fillcolor=\"#FFE5B4\""));
    // log() is the third method declared and gets the third palette color.
    assert!(dot.contains("fillcolor=\"#B4E6FF\""));
    assert_eq!(dot.matches(" -> ").count(), cfg.graph.edge_count());
    assert_eq!(dot.matches("[label=").count(), cfg.graph.len());

    let dark = to_dot(&cfg, Theme::Dark);
    assert!(dark.contains("bgcolor=\"#000000\""));
    assert!(!dark.contains("fillcolor=\"#FFE5B4\""));
}

#[test]
fn test_collect_files_from_testdata() {
    let files = collect_files(&testdata_path(), &Settings::default()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    // Snippet fixtures are not .java files.
    assert_eq!(
        names,
        vec!["Bank.java", "Company.java", "Loops.java", "Switches.java"]
    );

    let settings = Settings {
        excluded_paths: vec!["Loops.java".to_string(), "Sw*.java".to_string()],
        ..Settings::default()
    };
    let files = collect_files(&testdata_path(), &settings).unwrap();
    assert_eq!(files.len(), 2);
}

#[test]
fn test_parallel_analysis_of_testdata() {
    let files = collect_files(&testdata_path(), &Settings::default()).unwrap();
    let ctx = AnalysisContext::new(testdata_path(), Settings::default());
    let (analyses, errors) = ctx.analyze_files_parallel(&files);

    assert!(errors.is_empty());
    let paths: Vec<&str> = analyses.iter().map(|a| a.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["Bank.java", "Company.java", "Loops.java", "Switches.java"]
    );
    assert!(analyses.iter().all(|a| !a.wrapped()));
}
