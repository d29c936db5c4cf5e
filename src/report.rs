//! Output formatting for javaflow results.
//!
//! Supports two output formats for every command:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//!
//! DOT output for graphs lives in `render`.

use colored::*;
use serde::Serialize;
use std::fmt::Write;

use crate::analysis::AnalysisError;
use crate::cfg::{BlockId, ControlFlowGraph, MethodRecord, SourceLine};
use crate::parser::line_label;
use crate::structure::{NodeKind, OutlineNode, Relationships, Structure};

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON document: one entry per analyzed input.
#[derive(Serialize)]
pub struct JsonReport<T: Serialize> {
    pub version: String,
    pub files: Vec<JsonFile<T>>,
    pub errors: Vec<JsonError>,
}

#[derive(Serialize)]
pub struct JsonFile<T: Serialize> {
    pub path: String,
    /// Whether the input was a snippet wrapped in a placeholder class.
    pub wrapped: bool,
    #[serde(flatten)]
    pub payload: T,
}

#[derive(Serialize)]
pub struct JsonError {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl From<&AnalysisError> for JsonError {
    fn from(e: &AnalysisError) -> Self {
        match e.syntax() {
            Some(syntax) => JsonError {
                path: e.path().to_string(),
                line: syntax.line,
                message: syntax.to_string(),
            },
            None => JsonError {
                path: e.path().to_string(),
                line: None,
                message: e.to_string(),
            },
        }
    }
}

/// Graph payload.
#[derive(Serialize)]
pub struct JsonGraph {
    pub blocks: Vec<JsonBlock>,
    pub edges: Vec<JsonEdge>,
    pub methods: Vec<MethodRecord>,
}

#[derive(Serialize)]
pub struct JsonBlock {
    pub id: BlockId,
    pub kind: &'static str,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
    pub lines: Vec<SourceLine>,
}

#[derive(Serialize)]
pub struct JsonEdge {
    pub from: BlockId,
    pub to: BlockId,
}

#[derive(Serialize)]
pub struct JsonOutline {
    pub outline: OutlineNode,
}

pub fn graph_json(cfg: &ControlFlowGraph) -> JsonGraph {
    JsonGraph {
        blocks: cfg
            .graph
            .blocks()
            .iter()
            .map(|b| JsonBlock {
                id: b.id,
                kind: b.kind.as_str(),
                label: b.label(),
                method: b.method.clone(),
                group: b.group,
                lines: b.lines.clone(),
            })
            .collect(),
        edges: cfg
            .graph
            .edges()
            .into_iter()
            .map(|(from, to)| JsonEdge { from, to })
            .collect(),
        methods: cfg.methods.clone(),
    }
}

/// Serialize a report.
pub fn to_json<T: Serialize>(files: Vec<JsonFile<T>>, errors: &[AnalysisError]) -> anyhow::Result<String> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        files,
        errors: errors.iter().map(JsonError::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Write results in JSON format.
pub fn write_json<T: Serialize>(files: Vec<JsonFile<T>>, errors: &[AnalysisError]) -> anyhow::Result<()> {
    println!("{}", to_json(files, errors)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Banner printed once before pretty output.
pub fn render_header(command: &str, path: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {} v{}",
        "javaflow".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}{} {}", "Command: ".dimmed(), command, path);
    out
}

fn render_file_title(out: &mut String, path: &str, wrapped: bool) {
    let _ = write!(out, "\n  {}", path.blue().bold());
    if wrapped {
        let _ = write!(out, " {}", "(snippet)".dimmed());
    }
    let _ = writeln!(out);
}

/// Methods with their entry and exits, then every block with its successors.
pub fn render_graph(path: &str, wrapped: bool, cfg: &ControlFlowGraph) -> String {
    let mut out = String::new();
    render_file_title(&mut out, path, wrapped);

    let _ = writeln!(
        out,
        "  {} blocks, {} edges, {} methods",
        cfg.graph.len(),
        cfg.graph.edge_count(),
        cfg.methods.len()
    );

    if !cfg.methods.is_empty() {
        let _ = writeln!(out, "\n  {} ({}):", "Methods".bold(), cfg.methods.len());
        for m in &cfg.methods {
            let entry = m
                .entry
                .map(|e| e.to_string())
                .unwrap_or_else(|| "-".to_string());
            let exits = m
                .exits
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "    {:<24} {} entry {} exits [{}]",
                m.key.green(),
                format!("L{}", m.line).dimmed(),
                entry,
                exits
            );
        }
    }

    let _ = writeln!(out, "\n  {}:", "Blocks".bold());
    for block in cfg.graph.blocks() {
        let succ = cfg
            .graph
            .successors(block.id)
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let header = match block.kind.tag() {
            Some(tag) => tag.replace('\n', " "),
            None => "BLOCK".to_string(),
        };
        let _ = write!(out, "    {:<5} {}", block.id.to_string().cyan(), header);
        if let Some(method) = &block.method {
            let _ = write!(out, " {}", format!("[{}]", method).dimmed());
        }
        let _ = writeln!(out);
        for line in &block.lines {
            let _ = writeln!(out, "          {}", line);
        }
        if !succ.is_empty() {
            let _ = writeln!(out, "          {} {}", "->".dimmed(), succ.join(", "));
        }
    }
    out
}

pub fn render_structure(path: &str, wrapped: bool, structure: &Structure) -> String {
    let mut out = String::new();
    render_file_title(&mut out, path, wrapped);

    let _ = writeln!(out, "\n  {} ({}):", "Classes".bold(), structure.classes.len());
    for class in &structure.classes {
        let _ = writeln!(out, "    {}", class.name.green());
        let _ = writeln!(out, "      {}", class.code.dimmed());
    }

    for group in &structure.methods {
        if group.methods.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            "\n  {} {} ({}):",
            "Methods of".bold(),
            group.class.green(),
            group.methods.len()
        );
        for method in &group.methods {
            let _ = writeln!(out, "    {}", method.name.cyan());
            for line in method.code.lines() {
                let _ = writeln!(out, "      {}", line);
            }
        }
    }
    out
}

pub fn render_relationships(path: &str, wrapped: bool, rels: &Relationships) -> String {
    let mut out = String::new();
    render_file_title(&mut out, path, wrapped);

    let sections = [
        ("Composition", &rels.composition),
        ("Aggregation", &rels.aggregation),
        ("Association", &rels.association),
    ];
    for (title, list) in sections {
        let _ = writeln!(out, "\n  {} ({}):", title.bold(), list.len());
        for r in list.iter() {
            let _ = writeln!(
                out,
                "    {} -> {}  {}",
                r.from.green(),
                r.to.green(),
                r.detail.dimmed()
            );
        }
    }
    out
}

fn render_node(out: &mut String, node: &OutlineNode, depth: usize) {
    let indent = "  ".repeat(depth + 2);
    let name = match node.kind {
        NodeKind::Class => node.name.green().bold().to_string(),
        NodeKind::Method => node.name.cyan().to_string(),
        NodeKind::Fields
        | NodeKind::Methods
        | NodeKind::Variables
        | NodeKind::Loops
        | NodeKind::Subclasses => node.name.bold().to_string(),
        _ => node.name.clone(),
    };
    let _ = write!(out, "{}{}", indent, name);
    if let Some(comment) = &node.comment {
        let _ = write!(out, "  {}", format!("// {}", comment).dimmed());
    }
    let _ = writeln!(out);
    for child in &node.children {
        render_node(out, child, depth + 1);
    }
}

pub fn render_outline(path: &str, wrapped: bool, outline: &OutlineNode) -> String {
    let mut out = String::new();
    render_file_title(&mut out, path, wrapped);
    for class in &outline.children {
        render_node(&mut out, class, 0);
    }
    out
}

pub fn render_errors(errors: &[AnalysisError]) -> String {
    let mut out = String::new();
    if errors.is_empty() {
        return out;
    }
    let _ = writeln!(out, "\n  {} ({}):", "Errors".bold(), errors.len());
    for e in errors {
        match e.syntax() {
            Some(syntax) => {
                let _ = writeln!(
                    out,
                    "    {} {}{}",
                    "ERROR".red(),
                    e.path().blue(),
                    format!(":{}", line_label(&syntax.line)).dimmed()
                );
                let _ = writeln!(out, "            {}", syntax.description);
            }
            None => {
                let _ = writeln!(out, "    {} {}", "ERROR".red(), e);
            }
        }
    }
    out
}

/// Final status line.
pub fn render_summary(analyzed: usize, failed: usize) -> String {
    let status = if failed == 0 {
        "✓ OK".green()
    } else {
        "✗ FAILED".red()
    };
    format!(
        "\n  {}  {} analyzed, {} failed\n",
        status, analyzed, failed
    )
}
