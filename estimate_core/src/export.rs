//! # Report Export
//!
//! Formats a [`ProjectSummary`] into a document with a fixed layout:
//!
//! 1. title
//! 2. project metadata (name, last modified, generation date, currency)
//! 3. a table of category / detail subtotals, nested by indentation
//! 4. grand total lines
//!
//! Two formats are produced. [`ExportFormat::Typst`] emits Typst markup from
//! an embedded template (data injected by `{{PLACEHOLDER}}` substitution,
//! ready for `typst compile`). [`ExportFormat::Text`] emits a fixed-width
//! plain-text report.
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use estimate_core::export::{render, ExportFormat};
//! use estimate_core::project::Project;
//! use estimate_core::summary::summarize_project;
//!
//! let summary = summarize_project(Some(&Project::new("Demo")));
//! let text = render(&summary, ExportFormat::Text, Utc::now());
//! assert!(text.contains("OVERALL TOTAL"));
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{EstimateError, EstimateResult};
use crate::money::format_money;
use crate::summary::{NodeSummary, ProjectSummary, Totals};
use crate::units::SquareMeters;

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Typst markup source
    Typst,
    /// Fixed-width plain text
    Text,
}

impl ExportFormat {
    /// Conventional file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Typst => "typ",
            ExportFormat::Text => "txt",
        }
    }

    /// Guess the format from a file extension, defaulting to text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("typ") => ExportFormat::Typst,
            _ => ExportFormat::Text,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = EstimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "typst" | "typ" => Ok(ExportFormat::Typst),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(EstimateError::invalid_input(
                "format",
                other,
                "Expected 'typst' or 'text'",
            )),
        }
    }
}

/// One table row of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    /// 0 for top-level categories
    pub depth: usize,
    pub name: String,
    pub area: Option<SquareMeters>,
    pub totals: Totals,
}

/// Flatten the summary tree into table rows, parents before children.
pub fn report_rows(summary: &ProjectSummary) -> Vec<ReportRow> {
    let mut rows = Vec::with_capacity(summary.node_count);
    for category in &summary.categories {
        rows.push(ReportRow {
            depth: 0,
            name: category.name.clone(),
            area: None,
            totals: category.totals,
        });
        push_rows(&category.children, 1, &mut rows);
    }
    rows
}

fn push_rows(nodes: &[NodeSummary], depth: usize, rows: &mut Vec<ReportRow>) {
    for node in nodes {
        rows.push(ReportRow {
            depth,
            name: node.name().to_string(),
            area: node.area(),
            totals: node.totals(),
        });
        push_rows(node.children(), depth + 1, rows);
    }
}

/// Render the summary in the requested format.
///
/// `generated` is printed as the report date; pass it in so output is
/// reproducible.
pub fn render(summary: &ProjectSummary, format: ExportFormat, generated: DateTime<Utc>) -> String {
    match format {
        ExportFormat::Typst => render_typst(summary, generated),
        ExportFormat::Text => render_text(summary, generated),
    }
}

/// Render and write the report, creating parent directories as needed.
pub fn export_to_file(summary: &ProjectSummary, format: ExportFormat, path: &Path) -> EstimateResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            EstimateError::file_error("create directory", dir.display().to_string(), e.to_string())
        })?;
    }

    let document = render(summary, format, Utc::now());
    fs::write(path, document)
        .map_err(|e| EstimateError::file_error("write report", path.display().to_string(), e.to_string()))?;

    debug!(path = %path.display(), ?format, "report exported");
    Ok(())
}

// ============================================================================
// Typst
// ============================================================================

/// Typst template for the project summary report
const SUMMARY_TEMPLATE: &str = r##"
#set page(
  paper: "a4",
  margin: (top: 2cm, bottom: 2cm, left: 1.5cm, right: 1.5cm),
  footer: context [
    #line(length: 100%, stroke: 0.5pt + gray)
    #v(4pt)
    #grid(
      columns: (1fr, 1fr),
      align(left)[#text(size: 9pt)[{{PROJECT_NAME}}]],
      align(right)[#text(size: 9pt)[Page #counter(page).display()]],
    )
  ]
)

#set text(size: 11pt)

#align(center)[
  #text(size: 20pt, weight: "bold")[Project Summary]
]

#v(12pt)

#grid(
  columns: (auto, 1fr),
  gutter: 6pt,
  [*Project:*], [{{PROJECT_NAME}}],
  [*Last modified:*], [{{MODIFIED}}],
  [*Generated:*], [{{DATE}}],
  [*Currency:*], [{{CURRENCY}}],
)

#v(12pt)

#table(
  columns: (1fr, auto, auto, auto, auto),
  align: (left, right, right, right, right),
  stroke: 0.5pt + gray,
  table.header([*Name*], [*Area*], [*Works*], [*Materials*], [*Total*]),
{{ROWS}}
)

#v(12pt)

#align(right)[
  Total works: {{TOTAL_WORKS}} \
  Total materials: {{TOTAL_MATERIALS}} \
  #text(size: 13pt, weight: "bold")[Overall total: {{OVERALL_TOTAL}} {{CURRENCY}}]
]
"##;

fn render_typst(summary: &ProjectSummary, generated: DateTime<Utc>) -> String {
    let mut rows = String::new();
    for row in report_rows(summary) {
        let indent = if row.depth > 0 {
            format!("#h({}em)", row.depth)
        } else {
            String::new()
        };
        let name = if row.depth == 0 {
            format!("*{}*", escape_typst(&row.name))
        } else {
            escape_typst(&row.name)
        };
        let area = row
            .area
            .map(|a| format!("{:.2} m²", a.0))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            rows,
            "  [{indent}{name}], [{area}], [{}], [{}], [{}],",
            format_money(row.totals.works),
            format_money(row.totals.materials),
            format_money(row.totals.total),
        );
    }

    SUMMARY_TEMPLATE
        .replace("{{PROJECT_NAME}}", &escape_typst(&summary.project_name))
        .replace("{{MODIFIED}}", &format_timestamp(summary.modified))
        .replace("{{DATE}}", &generated.format("%Y-%m-%d").to_string())
        .replace("{{CURRENCY}}", &escape_typst(&summary.currency))
        .replace("{{ROWS}}", rows.trim_end())
        .replace("{{TOTAL_WORKS}}", &format_money(summary.works_total()))
        .replace("{{TOTAL_MATERIALS}}", &format_money(summary.materials_total()))
        .replace("{{OVERALL_TOTAL}}", &format_money(summary.overall_total()))
}

/// Escape characters with markup meaning in Typst content blocks.
fn escape_typst(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '#' | '[' | ']' | '*' | '_' | '$' | '<' | '>' | '@' | '`' | '~' | '=' | '-' | '+' | '/') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

// ============================================================================
// Plain text
// ============================================================================

const NAME_WIDTH: usize = 36;
const AMOUNT_WIDTH: usize = 14;
const AREA_WIDTH: usize = 12;

fn render_text(summary: &ProjectSummary, generated: DateTime<Utc>) -> String {
    let rule = "-".repeat(NAME_WIDTH + AREA_WIDTH + 3 * AMOUNT_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "PROJECT SUMMARY");
    let _ = writeln!(out, "===============");
    let _ = writeln!(out, "Project:   {}", summary.project_name);
    let _ = writeln!(out, "Modified:  {}", format_timestamp(summary.modified));
    let _ = writeln!(out, "Generated: {}", generated.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "Currency:  {}", summary.currency);
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "{:<NAME_WIDTH$}{:>AREA_WIDTH$}{:>AMOUNT_WIDTH$}{:>AMOUNT_WIDTH$}{:>AMOUNT_WIDTH$}",
        "Name", "Area", "Works", "Materials", "Total"
    );
    let _ = writeln!(out, "{rule}");
    for row in report_rows(summary) {
        let name = format!("{}{}", "  ".repeat(row.depth), row.name);
        let area = row
            .area
            .map(|a| format!("{:.2} m2", a.0))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<NAME_WIDTH$}{:>AREA_WIDTH$}{:>AMOUNT_WIDTH$}{:>AMOUNT_WIDTH$}{:>AMOUNT_WIDTH$}",
            name,
            area,
            format_money(row.totals.works),
            format_money(row.totals.materials),
            format_money(row.totals.total),
        );
    }
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "Total works:     {:>AMOUNT_WIDTH$}", format_money(summary.works_total()));
    let _ = writeln!(out, "Total materials: {:>AMOUNT_WIDTH$}", format_money(summary.materials_total()));
    let _ = writeln!(
        out,
        "OVERALL TOTAL:   {:>AMOUNT_WIDTH$} {}",
        format_money(summary.overall_total()),
        summary.currency
    );
    out
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
