use serde::Serialize;
use yabp_core::config::{ConfigWarning, WarnLevel};
use yabp_core::project::FileNode;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:width$}", c, width = widths.get(i).copied().unwrap_or(0)))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in rows {
        line(row);
    }
}

/// Indented project tree; executable prompts are marked with `*`.
pub fn print_tree(nodes: &[FileNode]) {
    fn walk(nodes: &[FileNode], depth: usize) {
        let indent = "  ".repeat(depth);
        for node in nodes {
            match node {
                FileNode::Directory { name, children, .. } => {
                    println!("{indent}{name}/");
                    walk(children, depth + 1);
                }
                FileNode::File {
                    name, executable, ..
                } => {
                    let mark = if *executable { " *" } else { "" };
                    println!("{indent}{name}{mark}");
                }
            }
        }
    }
    walk(nodes, 0);
}

pub fn print_warnings(warnings: &[ConfigWarning]) {
    for w in warnings {
        let prefix = match w.level {
            WarnLevel::Warning => "warning",
            WarnLevel::Error => "error",
        };
        println!("[{prefix}] {}", w.message);
    }
}
