pub mod xml;

use crate::apply::ApplyStats;
use crate::error::Result;
use crate::tree::matcher::MatchResult;
use crate::tree::Tree;
use std::io::Write;
use std::path::Path;

/// Where rendered output goes: a file when `--output` is set, stdout
/// otherwise.
pub fn output_target(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(std::fs::File::create(path)?)),
        None => Ok(Box::new(std::io::stdout())),
    }
}

/// Render a tree as an indented listing, parents before children.
///
/// Verbose mode adds id, owner, modified time and last modifier per node,
/// mirroring what the metadata overlay will read.
pub fn render_tree(tree: &Tree, verbose: bool, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", tree.root_path())?;

    let mut nodes: Vec<_> = tree.nodes().iter().collect();
    nodes.sort_by(|a, b| a.path.cmp(&b.path));

    for node in nodes {
        let indent = "  ".repeat(node.path.depth());
        let name = if node.is_folder() {
            format!("{}/", node.name)
        } else {
            node.name.clone()
        };

        if verbose {
            let owner = node
                .owner
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            let modified = node
                .modified_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            let modifier = node
                .last_modified_by
                .as_ref()
                .map(|p| p.email.clone())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                out,
                "{}{} [{}] ({}) ({}) ({})",
                indent, name, node.id, owner, modified, modifier
            )?;
        } else {
            writeln!(out, "{}{}", indent, name)?;
        }
    }
    Ok(())
}

fn render_path_list<'a>(
    header: &str,
    paths: impl Iterator<Item = &'a crate::model::Node>,
    out: &mut dyn Write,
) -> Result<()> {
    let mut rendered: Vec<String> = paths.map(|n| n.path.to_string()).collect();
    rendered.sort();
    writeln!(out, "{} {}:", header, rendered.len())?;
    for path in rendered {
        writeln!(out, "\t{}", path)?;
    }
    Ok(())
}

/// Full match/duplicate/miss report: sorted path lists with count headers.
pub fn render_match_report(result: &MatchResult, out: &mut dyn Write) -> Result<()> {
    render_path_list(
        "Matched paths:",
        result.matched.iter().map(|p| &p.source),
        out,
    )?;
    writeln!(out)?;
    render_path_list("Missing on destination:", result.missing.iter(), out)?;
    writeln!(out)?;
    render_path_list("Only on destination:", result.unexpected.iter(), out)?;
    writeln!(out)?;
    render_path_list(
        "Duplicate paths in source:",
        result.duplicates_source.iter(),
        out,
    )?;
    writeln!(out)?;
    render_path_list(
        "Duplicate paths in destination:",
        result.duplicates_dest.iter(),
        out,
    )?;
    Ok(())
}

/// Per-pair write failures, appended after the summary when any occurred.
pub fn render_write_errors(stats: &ApplyStats, out: &mut dyn Write) -> Result<()> {
    if stats.errors.is_empty() {
        return Ok(());
    }
    writeln!(out, "Failed writes: {}:", stats.errors.len())?;
    for error in &stats.errors {
        writeln!(out, "\t{} ({}): {}", error.path, error.dest_id, error.error)?;
    }
    Ok(())
}
