//! Output formatting for file views, impacted files and tables.

use std::fmt::Write;

use crate::model::DisplayToggles;
use crate::normalize::{CoverageFilePayload, CoverageMap};
use crate::segments::{DiffLine, ImpactedFile};
use crate::table::{Column, TableRow};

/// A source file with its coverage, ready to be formatted.
pub struct FileView<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub coverage: CoverageMap,
    pub percent_covered: f64,
    pub is_critical_file: bool,
    pub toggles: DisplayToggles,
}

impl<'a> FileView<'a> {
    pub fn new(path: &'a str, payload: &'a CoverageFilePayload, toggles: DisplayToggles) -> Self {
        Self {
            path,
            content: &payload.content,
            coverage: payload.coverage_map(),
            percent_covered: payload.percent_covered(),
            is_critical_file: payload.is_critical_file,
            toggles,
        }
    }
}

/// Trait for formatting views.
pub trait ViewFormatter {
    fn file_view(&self, view: &FileView<'_>) -> String;

    fn impacted_file(&self, file: &ImpactedFile, toggles: &DisplayToggles) -> String;

    fn table(&self, columns: &[Column], rows: &[TableRow]) -> String;
}

/// Plain text formatter.
pub struct TextFormatter;

/// Markdown formatter.
pub struct MarkdownFormatter;

/// Source lines paired with their 1-based numbers. Numbering stops at
/// `u32::MAX` rather than wrapping.
fn numbered_lines<'a>(content: &'a str) -> impl Iterator<Item = (u32, &'a str)> + 'a {
    (1..=u32::MAX).zip(content.lines())
}

fn number(n: Option<u32>) -> String {
    n.map(|n| n.to_string()).unwrap_or_default()
}

fn hits(line: &DiffLine) -> String {
    line.coverage_info
        .hit_count
        .map(|h| h.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn percent(p: Option<f64>) -> String {
    p.map(|p| format!("{p:.2}%")).unwrap_or_else(|| "-".to_string())
}

fn impacted_title(file: &ImpactedFile) -> String {
    let mut title = file.head_name.clone();
    if let Some(label) = file.file_label {
        write!(title, " [{label}]").unwrap();
    }
    if file.is_critical_file {
        title.push_str(" (critical)");
    }
    title
}

fn impacted_totals(file: &ImpactedFile) -> String {
    let change = file
        .change_coverage
        .map(|c| format!("{c:+.2}%"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "HEAD {}  BASE {}  PATCH {}  CHANGE {}",
        percent(file.head_coverage),
        percent(file.base_coverage),
        percent(file.patch_coverage),
        change
    )
}

fn cell_widths(columns: &[Column], rows: &[TableRow]) -> Vec<usize> {
    columns
        .iter()
        .map(|col| {
            rows.iter()
                .filter_map(|r| r.get(col.id))
                .map(|c| c.display().chars().count())
                .chain(std::iter::once(col.header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn pad(text: &str, width: usize, left: bool) -> String {
    let fill = width.saturating_sub(text.chars().count());
    if left {
        format!("{text}{}", " ".repeat(fill))
    } else {
        format!("{}{text}", " ".repeat(fill))
    }
}

impl ViewFormatter for TextFormatter {
    fn file_view(&self, view: &FileView<'_>) -> String {
        let mut out = String::new();
        let critical = if view.is_critical_file { " (critical)" } else { "" };
        writeln!(out, "{}{critical}  {:.2}%", view.path, view.percent_covered).unwrap();

        for (line, code) in numbered_lines(view.content) {
            let state = view.coverage.state_for(line, &view.toggles);
            writeln!(out, "{line:>6} {} {code}", state.marker()).unwrap();
        }

        let totals = view.coverage.totals();
        writeln!(
            out,
            "\n{} tracked lines: {} covered, {} partial, {} missed",
            totals.lines, totals.hits, totals.partials, totals.misses
        )
        .unwrap();
        out
    }

    fn impacted_file(&self, file: &ImpactedFile, toggles: &DisplayToggles) -> String {
        let mut out = String::new();
        writeln!(out, "{}", impacted_title(file)).unwrap();
        writeln!(out, "{}", impacted_totals(file)).unwrap();

        for segment in &file.segments {
            writeln!(out, "\n{}", segment.header).unwrap();
            for line in &segment.lines {
                let state = line.display_state(toggles);
                writeln!(
                    out,
                    "{:>6} {:>6} {} {:>5} | {}",
                    number(line.base_number),
                    number(line.head_number),
                    state.marker(),
                    hits(line),
                    line.content
                )
                .unwrap();
            }
        }
        out
    }

    fn table(&self, columns: &[Column], rows: &[TableRow]) -> String {
        let widths = cell_widths(columns, rows);
        let mut out = String::new();

        let header: Vec<String> = columns
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (col, &w))| pad(&col.header.to_uppercase(), w, i == 0))
            .collect();
        writeln!(out, "{}", header.join("  ").trim_end()).unwrap();
        let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        writeln!(out, "{}", "-".repeat(total)).unwrap();

        for row in rows {
            let cells: Vec<String> = columns
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (col, &w))| {
                    let text = row.get(col.id).map(|c| c.display()).unwrap_or_default();
                    pad(&text, w, i == 0)
                })
                .collect();
            writeln!(out, "{}", cells.join("  ").trim_end()).unwrap();
        }
        out
    }
}

impl ViewFormatter for MarkdownFormatter {
    fn file_view(&self, view: &FileView<'_>) -> String {
        let mut md = String::new();
        let critical = if view.is_critical_file { " (critical)" } else { "" };
        writeln!(
            md,
            "### `{}`{critical}: {:.2}%\n",
            view.path, view.percent_covered
        )
        .unwrap();

        md.push_str("```text\n");
        for (line, code) in numbered_lines(view.content) {
            let state = view.coverage.state_for(line, &view.toggles);
            writeln!(md, "{line:>6} {} {code}", state.marker()).unwrap();
        }
        md.push_str("```\n");

        let totals = view.coverage.totals();
        writeln!(
            md,
            "\n**{}** tracked lines: **{}** covered, **{}** partial, **{}** missed",
            totals.lines, totals.hits, totals.partials, totals.misses
        )
        .unwrap();
        md
    }

    fn impacted_file(&self, file: &ImpactedFile, toggles: &DisplayToggles) -> String {
        let mut md = String::new();
        writeln!(md, "### `{}`\n", impacted_title(file)).unwrap();
        writeln!(md, "{}", impacted_totals(file)).unwrap();

        for segment in &file.segments {
            writeln!(md, "\n```diff\n{}", segment.header).unwrap();
            for line in &segment.lines {
                let state = line.display_state(toggles);
                writeln!(
                    md,
                    "{} {:>5} {}",
                    state.marker(),
                    hits(line),
                    line.content
                )
                .unwrap();
            }
            md.push_str("```\n");
        }
        md
    }

    fn table(&self, columns: &[Column], rows: &[TableRow]) -> String {
        let mut md = String::new();
        let headers: Vec<&str> = columns.iter().map(|c| c.header).collect();
        writeln!(md, "| {} |", headers.join(" | ")).unwrap();
        let aligns: Vec<&str> = (0..columns.len())
            .map(|i| if i == 0 { ":-----" } else { "-----:" })
            .collect();
        writeln!(md, "|{}|", aligns.join("|")).unwrap();

        for row in rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|col| {
                    row.get(col.id)
                        .map(|c| c.display().replace('|', "\\|"))
                        .unwrap_or_default()
                })
                .collect();
            writeln!(md, "| {} |", cells.join(" | ")).unwrap();
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineAnnotation, LineType, Totals};
    use crate::table::Cell;

    fn payload() -> CoverageFilePayload {
        CoverageFilePayload {
            content: "fn main() {\n    let x = 1;\n    go(x);\n}".to_string(),
            coverage: vec![
                LineAnnotation::new(1, LineType::Hit),
                LineAnnotation::new(3, LineType::Miss),
            ],
            totals: Totals { coverage: Some(50.0) },
            is_critical_file: false,
        }
    }

    #[test]
    fn test_text_file_view() {
        let payload = payload();
        let view = FileView::new("src/main.rs", &payload, DisplayToggles::default());
        let out = TextFormatter.file_view(&view);
        assert!(out.starts_with("src/main.rs  50.00%"));
        assert!(out.contains("     1 ✓ fn main() {"));
        assert!(out.contains("     2       let x = 1;"));
        assert!(out.contains("     3 ✗     go(x);"));
        assert!(out.contains("2 tracked lines: 1 covered, 0 partial, 1 missed"));
    }

    #[test]
    fn test_text_file_view_hidden_covered() {
        let payload = payload();
        let toggles = DisplayToggles {
            show_covered: false,
            ..Default::default()
        };
        let out = TextFormatter.file_view(&FileView::new("a.rs", &payload, toggles));
        assert!(out.contains("     1   fn main() {"));
    }

    #[test]
    fn test_markdown_file_view() {
        let payload = payload();
        let view = FileView::new("src/main.rs", &payload, DisplayToggles::default());
        let md = MarkdownFormatter.file_view(&view);
        assert!(md.contains("### `src/main.rs`: 50.00%"));
        assert!(md.contains("```text"));
    }

    #[test]
    fn test_tables() {
        let columns = [
            Column { id: "name", header: "Files" },
            Column { id: "hits", header: "Covered" },
        ];
        let rows = vec![TableRow::new("a")
            .with("name", Cell::Text("a|b.rs".to_string()))
            .with("hits", Cell::Count(3))];

        let text = TextFormatter.table(&columns, &rows);
        assert!(text.starts_with("FILES   COVERED"));
        assert!(text.contains("a|b.rs        3"));

        let md = MarkdownFormatter.table(&columns, &rows);
        assert!(md.contains("| Files | Covered |"));
        assert!(md.contains("|:-----|-----:|"));
        assert!(md.contains("| a\\|b.rs | 3 |"));
    }

    #[test]
    fn test_empty_table_is_headers_only() {
        let columns = [Column { id: "name", header: "Flags" }];
        let text = TextFormatter.table(&columns, &[]);
        assert_eq!(text.lines().count(), 2);
        let md = MarkdownFormatter.table(&columns, &[]);
        assert_eq!(md.lines().count(), 2);
    }

    #[test]
    fn test_numbered_lines() {
        let lines: Vec<_> = numbered_lines("a\n\nc\n").collect();
        assert_eq!(lines, vec![(1, "a"), (2, ""), (3, "c")]);
        assert_eq!(numbered_lines("").count(), 0);
    }
}
