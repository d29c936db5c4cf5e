//! Graphviz DOT rendering of a control-flow graph.
//!
//! Blocks are filled with their owning method's palette color so that
//! inlined callees stand out from their callers. Rasterizing the DOT source
//! is left to Graphviz.

use std::fmt::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cfg::ControlFlowGraph;

/// Method colors, assigned by group number.
pub const PALETTE: [&str; crate::cfg::GROUP_COUNT] = [
    "#FFE5B4", "#E6E6FA", "#B4E6FF", "#FFB4E6", "#B4FFE6", "#FFFFB4", "#E6B4FF", "#B4FFB4",
    "#FFE6B4", "#B4E6E6", "#FFB4B4", "#B4B4FF", "#FFD4B4", "#D4FFB4", "#B4FFD4",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn background(&self) -> &'static str {
        match self {
            Theme::Light => "#ffffff",
            Theme::Dark => "#000000",
        }
    }

    /// Fill for blocks that belong to no method.
    pub fn node(&self) -> &'static str {
        match self {
            Theme::Light => "#e0f7fa",
            Theme::Dark => "#2d2d2d",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Theme::Light => "#000000",
            Theme::Dark => "#e0e0e0",
        }
    }

    pub fn edge(&self) -> &'static str {
        match self {
            Theme::Light => "#000000",
            Theme::Dark => "#8b8b8b",
        }
    }

    /// Fill color for a method group.
    pub fn group_color(&self, group: usize) -> String {
        let base = PALETTE[group % PALETTE.len()];
        match self {
            Theme::Light => base.to_string(),
            Theme::Dark => darken(base),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme {:?}, must be 'light' or 'dark'", other)),
        }
    }
}

/// Scale each channel of a `#rrggbb` color to 60%. Other strings pass through.
pub fn darken(color: &str) -> String {
    let channel = |range: std::ops::Range<usize>| {
        color
            .get(range)
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
    };
    match (color.len(), channel(1..3), channel(3..5), channel(5..7)) {
        (7, Some(r), Some(g), Some(b)) if color.starts_with('#') => {
            let scale = |c: u8| (f64::from(c) * 0.6) as u8;
            format!("#{:02x}{:02x}{:02x}", scale(r), scale(g), scale(b))
        }
        _ => color.to_string(),
    }
}

fn escape(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Emit the graph as DOT source.
pub fn to_dot(cfg: &ControlFlowGraph, theme: Theme) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_dot(&mut out, cfg, theme);
    out
}

fn write_dot(out: &mut String, cfg: &ControlFlowGraph, theme: Theme) -> fmt::Result {
    writeln!(out, "digraph cfg {{")?;
    writeln!(out, "    graph [bgcolor=\"{}\"];", theme.background())?;
    writeln!(
        out,
        "    node [shape=box, style=\"rounded,filled\", fontname=\"Courier\"];"
    )?;
    writeln!(out, "    edge [arrowhead=vee, color=\"{}\"];", theme.edge())?;

    for block in cfg.graph.blocks() {
        let fill = match block.group {
            Some(group) => theme.group_color(group),
            None => theme.node().to_string(),
        };
        writeln!(
            out,
            "    {} [label=\"{}\", fillcolor=\"{}\", fontcolor=\"{}\"];",
            block.id,
            escape(&block.label()),
            fill,
            theme.text()
        )?;
    }
    for (from, to) in cfg.graph.edges() {
        writeln!(out, "    {} -> {};", from, to)?;
    }
    writeln!(out, "}}")
}
