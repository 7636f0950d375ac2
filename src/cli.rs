//! Command handler functions for the covlens CLI.
//!
//! Each `cmd_*` function takes an already-loaded payload and returns its
//! output as a `String`, making them easy to test without capturing stdout.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;

use crate::entities::{decode_pages, flatten_pages, has_next_page, Commit, Flag, PathContent, Pull};
use crate::model::DisplayToggles;
use crate::normalize::CoverageFilePayload;
use crate::render::{FileView, MarkdownFormatter, TextFormatter, ViewFormatter};
use crate::segments::ImpactedFile;
use crate::source::{select_first, PayloadSource};
use crate::table::{
    adjust_list_if_up_dir, project, tree_paths, DisplayType, ProjectOptions, TableEntity,
};

/// Output style for every command.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Style {
    Text,
    Markdown,
}

impl Style {
    fn formatter(&self) -> &'static dyn ViewFormatter {
        match self {
            Style::Text => &TextFormatter,
            Style::Markdown => &MarkdownFormatter,
        }
    }
}

/// Entity list rendered by the `table` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TableKind {
    Files,
    Commits,
    Pulls,
    Flags,
}

/// File-explorer navigation state for the `files` table.
#[derive(Debug, Clone, Default)]
pub struct Explorer {
    /// Repository name shown as the root breadcrumb.
    pub root: String,
    /// Directory currently being browsed, relative to the root.
    pub url_path: String,
    /// Force a flat list instead of the tree.
    pub list: bool,
}

/// Fetch a payload and select the part at `pointer`.
pub fn load(source: &dyn PayloadSource, pointer: &str) -> Result<Value> {
    load_first(source, &[pointer])
}

/// Fetch a payload and select the first non-null part among `pointers`.
pub fn load_first(source: &dyn PayloadSource, pointers: &[&str]) -> Result<Value> {
    let document = source.fetch().context("Failed to load payload")?;
    select_first(document, pointers).context("Failed to select payload")
}

pub fn cmd_file(payload: Value, path: &str, toggles: DisplayToggles, style: Style) -> Result<String> {
    let payload: CoverageFilePayload =
        serde_json::from_value(payload).context("Invalid coverage file payload")?;
    let view = FileView::new(path, &payload, toggles);
    Ok(style.formatter().file_view(&view))
}

pub fn cmd_impacted(payload: Value, toggles: DisplayToggles, style: Style) -> Result<String> {
    let file = ImpactedFile::from_json(payload).context("Invalid impacted file payload")?;
    Ok(style.formatter().impacted_file(&file, &toggles))
}

pub fn cmd_table(
    kind: TableKind,
    payload: Value,
    opts: &ProjectOptions,
    explorer: &Explorer,
    style: Style,
) -> Result<String> {
    if let Some(sort) = opts.sort.as_ref().filter(|_| !opts.client_sort) {
        match sort.to_ordering() {
            Some(ordering) => tracing::info!(
                ordering = %serde_json::to_string(&ordering)?,
                "sorting is delegated to the backend, keeping payload order"
            ),
            None => tracing::warn!(field = %sort.field, "backend cannot sort on this column"),
        }
    }

    match kind {
        TableKind::Files => {
            let contents = entities::<PathContent>(payload)?;
            let opts = ProjectOptions {
                url_path: explorer.url_path.clone(),
                ..opts.clone()
            };
            let mut rows = project(&contents, &opts);
            let display = DisplayType::determine(
                explorer.list.then_some(DisplayType::List),
                opts.is_searching(),
            );
            let paths = tree_paths(&explorer.root, &explorer.url_path);
            rows = adjust_list_if_up_dir(&paths, display, rows);
            Ok(style.formatter().table(PathContent::columns(), &rows))
        }
        TableKind::Commits => render_table::<Commit>(payload, opts, style),
        TableKind::Pulls => render_table::<Pull>(payload, opts, style),
        TableKind::Flags => render_table::<Flag>(payload, opts, style),
    }
}

fn entities<E: serde::de::DeserializeOwned>(payload: Value) -> Result<Vec<E>> {
    let pages = decode_pages::<E>(payload).context("Invalid list payload")?;
    if has_next_page(&pages) {
        tracing::info!("more pages are available from the backend");
    }
    Ok(flatten_pages(pages))
}

fn render_table<E>(payload: Value, opts: &ProjectOptions, style: Style) -> Result<String>
where
    E: TableEntity + serde::de::DeserializeOwned,
{
    let items = entities::<E>(payload)?;
    let rows = project(&items, opts);
    Ok(style.formatter().table(E::columns(), &rows))
}
