//! Report generation for user agent analysis.
//!
//! Renders aligned text tables for stdout and writes JSON artifacts for
//! whatever draws the charts.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use super::migration::{MatrixView, TransitionMatrix};
use super::types::*;

/// Glyph printed for empty matrix cells.
pub const ZERO_PLACEHOLDER: &str = "-";

const LEADERBOARD_RULE: usize = 60;
const MATRIX_RULE: usize = 70;
const ROW_LABEL_WIDTH: usize = 12;
const CELL_WIDTH: usize = 10;

/// Render a leaderboard as a two-column table under its title.
///
/// An empty leaderboard renders the title and header only.
pub fn format_leaderboard(board: &Leaderboard) -> String {
    let label_width = board
        .entries
        .iter()
        .map(|e| e.label.chars().count())
        .chain(std::iter::once("user_agent".len()))
        .max()
        .unwrap_or(0);
    let count_width = board
        .entries
        .iter()
        .map(|e| e.count.to_string().len())
        .chain(std::iter::once("count".len()))
        .max()
        .unwrap_or(0);

    let mut lines: Vec<String> = Vec::new();
    lines.push(board.title.clone());
    lines.push("=".repeat(LEADERBOARD_RULE));
    lines.push(format!(
        "{:<label_width$}  {:>count_width$}",
        "user_agent", "count"
    ));
    for entry in &board.entries {
        lines.push(format!(
            "{:<label_width$}  {:>count_width$}",
            entry.label, entry.count
        ));
    }
    lines.push(String::new());

    lines.join("\n")
}

/// Render a transition matrix, rows = before and columns = after.
pub fn format_matrix(view: &MatrixView, style: LabelStyle) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("Transition matrix (rows=before, cols=after)".to_string());
    lines.push("=".repeat(MATRIX_RULE));

    let mut header = " ".repeat(ROW_LABEL_WIDTH);
    for col in &view.cols {
        header.push_str(&format!("{:>CELL_WIDTH$}", col.label(style)));
    }
    lines.push(header);

    for (row, cells) in view.rows.iter().zip(&view.cells) {
        let mut line = format!("{:<ROW_LABEL_WIDTH$}", row.label(style));
        for &count in cells {
            if count == 0 {
                line.push_str(&format!("{:>CELL_WIDTH$}", ZERO_PLACEHOLDER));
            } else {
                line.push_str(&format!("{:>CELL_WIDTH$}", count));
            }
        }
        lines.push(line);
    }

    if view.hidden_peers > 0 {
        lines.push(format!("({} peers in hidden rows/columns)", view.hidden_peers));
    }
    lines.push(String::new());

    lines.join("\n")
}

/// Assemble the JSON artifact for a transition matrix.
pub fn migration_report(
    matrix: &TransitionMatrix,
    view: &MatrixView,
    metadata: ReportMetadata,
    style: LabelStyle,
) -> MigrationReport {
    MigrationReport {
        metadata,
        label_style: style,
        rows: view.rows.iter().map(|c| c.label(style).to_string()).collect(),
        cols: view.cols.iter().map(|c| c.label(style).to_string()).collect(),
        cells: view.cells.clone(),
        flows: matrix
            .flows()
            .into_iter()
            .filter(|f| view.rows.contains(&f.before) && view.cols.contains(&f.after))
            .map(|f| LabeledFlow::new(&f, style))
            .collect(),
        total_peers: matrix.total(),
        hidden_peers: view.hidden_peers,
    }
}

/// Write any report as pretty-printed JSON.
pub fn write_json_report<T: Serialize>(report: &T, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}
