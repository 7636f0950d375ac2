//! Backend list entities (path contents, commits, pulls, flags), their
//! table projections, and the page structures they arrive in.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{CovlensError, Result};
use crate::model::{null_as_default, Totals};
use crate::segments::ComparisonResult;
use crate::table::{Cell, Column, ProjectOptions, TableEntity, TableRow};

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// One already-fetched page of a list query.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            has_next_page: false,
            end_cursor: None,
        }
    }
}

#[derive(Deserialize)]
struct Edge<T> {
    node: Option<T>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
struct Connection<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    edges: Vec<Option<Edge<T>>>,
    #[serde(default, deserialize_with = "null_as_default")]
    page_info: PageInfo,
}

impl<T> From<Connection<T>> for Page<T> {
    fn from(conn: Connection<T>) -> Self {
        let total = conn.edges.len();
        let items: Vec<T> = conn.edges.into_iter().flatten().filter_map(|e| e.node).collect();
        if items.len() < total {
            tracing::debug!(skipped = total - items.len(), "dropped null connection nodes");
        }
        Page {
            items,
            has_next_page: conn.page_info.has_next_page,
            end_cursor: conn.page_info.end_cursor,
        }
    }
}

/// Decode list payloads in any of the shapes the backend returns: a
/// connection (`{edges, pageInfo}`), a results wrapper (`{results}`), a
/// bare array of items, or an array of either of the first two.
pub fn decode_pages<T: DeserializeOwned>(value: serde_json::Value) -> Result<Vec<Page<T>>> {
    use serde_json::Value;

    fn is_wrapper(value: &Value) -> bool {
        value.get("edges").is_some() || value.get("results").is_some()
    }

    fn decode_one<T: DeserializeOwned>(mut value: Value) -> Result<Page<T>> {
        if value.get("edges").is_some() {
            let conn: Connection<T> = serde_json::from_value(value)?;
            return Ok(conn.into());
        }
        if let Some(results) = value.get_mut("results") {
            let items: Option<Vec<T>> = serde_json::from_value(results.take())?;
            return Ok(Page::new(items.unwrap_or_default()));
        }
        match value {
            Value::Array(_) => Ok(Page::new(serde_json::from_value(value)?)),
            Value::Null => Ok(Page::new(Vec::new())),
            other => Err(CovlensError::Parse(format!(
                "expected a list, connection or results object, got {}",
                kind_of(&other)
            ))),
        }
    }

    let is_page_list = value
        .as_array()
        .and_then(|items| items.first())
        .is_some_and(is_wrapper);

    match value {
        Value::Array(items) if is_page_list => items.into_iter().map(decode_one::<T>).collect(),
        other => Ok(vec![decode_one(other)?]),
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Concatenate pages in fetch order.
pub fn flatten_pages<T>(pages: Vec<Page<T>>) -> Vec<T> {
    pages.into_iter().flat_map(|p| p.items).collect()
}

/// Whether more pages can be requested after the last fetched one.
pub fn has_next_page<T>(pages: &[Page<T>]) -> bool {
    pages.last().is_some_and(|p| p.has_next_page)
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Parse backend timestamps, with or without a UTC offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// First seven characters of a commit id.
fn short_sha(sha: &str) -> &str {
    sha.char_indices().nth(7).map_or(sha, |(end, _)| &sha[..end])
}

// ---------------------------------------------------------------------------
// Path contents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStats {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hits: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub misses: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub partials: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lines: u64,
    #[serde(default)]
    pub percent_covered: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_critical_file: bool,
}

/// Entry of a directory listing in the file explorer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "__typename")]
pub enum PathContent {
    #[serde(rename = "PathContentDir")]
    Dir(PathStats),
    #[serde(rename = "PathContentFile")]
    File(PathStats),
}

impl PathContent {
    pub fn stats(&self) -> &PathStats {
        match self {
            PathContent::Dir(s) | PathContent::File(s) => s,
        }
    }

    /// Link target: the entry's own path when the backend sent one,
    /// otherwise the entry name under the directory being browsed.
    fn target(&self, url_path: &str) -> String {
        let s = self.stats();
        match s.path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => path.to_string(),
            None => {
                let parent = url_path.trim_matches('/');
                if parent.is_empty() {
                    s.name.clone()
                } else {
                    format!("{parent}/{}", s.name)
                }
            }
        }
    }

    fn name_cell(&self, url_path: &str) -> Cell {
        let label = match self {
            PathContent::Dir(s) => format!("{}/", s.name),
            PathContent::File(s) if s.is_critical_file => format!("{} (critical)", s.name),
            PathContent::File(s) => s.name.clone(),
        };
        Cell::Link {
            label,
            target: self.target(url_path),
        }
    }
}

const PATH_COLUMNS: &[Column] = &[
    Column { id: "name", header: "Files" },
    Column { id: "lines", header: "Tracked lines" },
    Column { id: "hits", header: "Covered" },
    Column { id: "partials", header: "Partial" },
    Column { id: "misses", header: "Missed" },
    Column { id: "coverage", header: "Coverage %" },
];

impl TableEntity for PathContent {
    fn columns() -> &'static [Column] {
        PATH_COLUMNS
    }

    fn search_name(&self) -> &str {
        &self.stats().name
    }

    fn to_row(&self, opts: &ProjectOptions) -> TableRow {
        let s = self.stats();
        TableRow::new(self.target(&opts.url_path))
            .with("name", self.name_cell(&opts.url_path))
            .with("lines", Cell::Count(s.lines))
            .with("hits", Cell::Count(s.hits))
            .with("partials", Cell::Count(s.partials))
            .with("misses", Cell::Count(s.misses))
            .with(
                "coverage",
                Cell::Progress {
                    percent: s.percent_covered,
                    color: opts.indication_range.color(s.percent_covered),
                },
            )
    }
}

// ---------------------------------------------------------------------------
// Commits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub commitid: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub ci_passed: Option<bool>,
    #[serde(default)]
    pub totals: Option<Totals>,
    #[serde(default)]
    pub compare_with_parent: Option<ComparisonResult>,
}

impl Commit {
    fn title(&self) -> String {
        let message = self
            .message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("commit message unavailable");
        let mut parts = vec![message.to_string(), short_sha(&self.commitid).to_string()];
        if let Some(username) = self.author.as_ref().and_then(|a| a.username.as_deref()) {
            parts.push(username.to_string());
        }
        if let Some(created) = self.created_at.as_deref().and_then(parse_timestamp) {
            parts.push(created.format("%Y-%m-%d").to_string());
        }
        parts.join(" · ")
    }

    fn ci_status(&self) -> &'static str {
        match self.ci_passed {
            Some(true) => "Passed",
            Some(false) => "Failed",
            None => "Pending",
        }
    }

    fn patch_cell(&self) -> Cell {
        match self.compare_with_parent.as_ref().and_then(|c| c.patch_percent()) {
            Some(percent) => Cell::Percent(Some(percent)),
            None => Cell::Text("No report uploaded".to_string()),
        }
    }
}

const COMMIT_COLUMNS: &[Column] = &[
    Column { id: "name", header: "Name" },
    Column { id: "ciStatus", header: "CI status" },
    Column { id: "coverage", header: "Coverage" },
    Column { id: "patch", header: "Patch %" },
];

impl TableEntity for Commit {
    fn columns() -> &'static [Column] {
        COMMIT_COLUMNS
    }

    fn search_name(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    fn to_row(&self, _opts: &ProjectOptions) -> TableRow {
        TableRow::new(self.commitid.clone())
            .with("name", Cell::Text(self.title()))
            .with("ciStatus", Cell::Text(self.ci_status().to_string()))
            .with("coverage", Cell::Percent(self.totals.and_then(|t| t.coverage)))
            .with("patch", self.patch_cell())
    }
}

// ---------------------------------------------------------------------------
// Pulls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PullHead {
    #[serde(default)]
    pub totals: Option<Totals>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pull {
    pub pull_id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub updatestamp: Option<String>,
    #[serde(default)]
    pub head: Option<PullHead>,
    #[serde(default)]
    pub compare_with_base: Option<ComparisonResult>,
}

impl Pull {
    fn title_text(&self) -> String {
        let title = self.title.as_deref().unwrap_or("Untitled pull");
        let mut text = format!("{title} #{}", self.pull_id);
        if let Some(username) = self.author.as_ref().and_then(|a| a.username.as_deref()) {
            text.push_str(&format!(" · {username}"));
        }
        if let Some(state) = self.state.as_deref() {
            text.push_str(&format!(" · {}", state.to_lowercase()));
        }
        text
    }

    fn change_cell(&self) -> Cell {
        match &self.compare_with_base {
            Some(ComparisonResult::Comparison { change_coverage, .. }) => {
                Cell::Change(*change_coverage)
            }
            Some(other) => Cell::Text(other.message().unwrap_or_default()),
            None => Cell::Change(None),
        }
    }
}

const PULL_COLUMNS: &[Column] = &[
    Column { id: "title", header: "Name" },
    Column { id: "coverage", header: "Coverage on HEAD" },
    Column { id: "change", header: "Change from BASE" },
];

impl TableEntity for Pull {
    fn columns() -> &'static [Column] {
        PULL_COLUMNS
    }

    fn search_name(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    fn to_row(&self, _opts: &ProjectOptions) -> TableRow {
        let coverage = self
            .head
            .as_ref()
            .and_then(|h| h.totals)
            .and_then(|t| t.coverage);
        TableRow::new(self.pull_id.to_string())
            .with("title", Cell::Text(self.title_text()))
            .with("coverage", Cell::Percent(coverage))
            .with("change", self.change_cell())
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Measurement {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub avg: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl Measurement {
    /// Average for the period, or the maximum when no average was sent.
    pub fn value(&self) -> Option<f64> {
        self.avg.or(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub name: String,
    #[serde(default)]
    pub percent_covered: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub measurements: Vec<Measurement>,
}

impl Flag {
    /// Change between the first and last recorded values.
    pub fn trend(&self) -> Option<f64> {
        let mut values = self.measurements.iter().filter_map(Measurement::value);
        let first = values.next()?;
        let last = values.last()?;
        Some(last - first)
    }
}

const FLAG_COLUMNS: &[Column] = &[
    Column { id: "name", header: "Flags" },
    Column { id: "coverage", header: "file coverage %" },
    Column { id: "trend", header: "trend last year" },
];

impl TableEntity for Flag {
    fn columns() -> &'static [Column] {
        FLAG_COLUMNS
    }

    fn search_name(&self) -> &str {
        &self.name
    }

    fn to_row(&self, opts: &ProjectOptions) -> TableRow {
        TableRow::new(self.name.clone())
            .with("name", Cell::Text(self.name.clone()))
            .with(
                "coverage",
                Cell::Progress {
                    percent: self.percent_covered,
                    color: opts.indication_range.color(self.percent_covered),
                },
            )
            .with("trend", Cell::Change(self.trend()))
    }
}
