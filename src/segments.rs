//! Decoding of comparison payloads: impacted files, their diff segments,
//! and the `__typename` union the backend uses for comparison results.
//!
//! Segments are passed through in backend order and content; the only
//! derived values are the file label and the parsed hunk headers.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::classify::classify;
use crate::error::Result;
use crate::model::{
    de_line_number, de_line_type, null_as_default, DisplayToggles, LineState, LineType,
    PercentCovered,
};

static HUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap()
});

// ---------------------------------------------------------------------------
// Comparison results
// ---------------------------------------------------------------------------

/// Result of comparing a head commit against its base, discriminated by the
/// backend's `__typename`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "__typename")]
pub enum ComparisonResult {
    #[serde(rename_all = "camelCase")]
    Comparison {
        #[serde(default)]
        patch_totals: Option<PercentCovered>,
        #[serde(default)]
        change_coverage: Option<f64>,
    },
    FirstPullRequest {
        #[serde(default)]
        message: Option<String>,
    },
    MissingBaseCommit {
        #[serde(default)]
        message: Option<String>,
    },
    MissingHeadCommit {
        #[serde(default)]
        message: Option<String>,
    },
    MissingComparison {
        #[serde(default)]
        message: Option<String>,
    },
    MissingBaseReport {
        #[serde(default)]
        message: Option<String>,
    },
    MissingHeadReport {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl ComparisonResult {
    /// Patch coverage, or `None` when no comparison could be made.
    /// A comparison without patch totals counts as 0%.
    pub fn patch_percent(&self) -> Option<f64> {
        match self {
            ComparisonResult::Comparison { patch_totals, .. } => Some(
                patch_totals
                    .and_then(|t| t.percent_covered)
                    .unwrap_or(0.0),
            ),
            _ => None,
        }
    }

    /// Human-readable reason a comparison is unavailable.
    pub fn message(&self) -> Option<String> {
        let (message, fallback) = match self {
            ComparisonResult::Comparison { .. } => return None,
            ComparisonResult::FirstPullRequest { message } => (message, "First pull request"),
            ComparisonResult::MissingBaseCommit { message } => (message, "Missing base commit"),
            ComparisonResult::MissingHeadCommit { message } => (message, "Missing head commit"),
            ComparisonResult::MissingComparison { message } => (message, "Missing comparison"),
            ComparisonResult::MissingBaseReport { message } => (message, "Missing base report"),
            ComparisonResult::MissingHeadReport { message } => (message, "Missing head report"),
            ComparisonResult::Unknown => return Some("Unknown comparison result".to_string()),
        };
        Some(message.clone().unwrap_or_else(|| fallback.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// Per-upload hit data. `None` means the backend has no data, which is
/// different from zero hits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageInfo {
    #[serde(default)]
    pub hit_count: Option<u64>,
    #[serde(default)]
    pub hit_upload_ids: Option<Vec<u64>>,
}

/// Whether a diff line was added, removed or unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Added,
    Removed,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    #[serde(default, deserialize_with = "de_line_number")]
    pub base_number: Option<u32>,
    #[serde(default, deserialize_with = "de_line_number")]
    pub head_number: Option<u32>,
    #[serde(default, deserialize_with = "de_line_type")]
    pub base_coverage: Option<LineType>,
    #[serde(default, deserialize_with = "de_line_type")]
    pub head_coverage: Option<LineType>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub coverage_info: CoverageInfo,
}

impl DiffLine {
    pub fn kind(&self) -> LineKind {
        match (self.base_number, self.head_number) {
            (None, Some(_)) => LineKind::Added,
            (Some(_), None) => LineKind::Removed,
            _ if self.content.starts_with('+') => LineKind::Added,
            _ if self.content.starts_with('-') => LineKind::Removed,
            _ => LineKind::Context,
        }
    }

    /// Removed lines are highlighted with their base coverage, everything
    /// else with head coverage.
    pub fn display_state(&self, toggles: &DisplayToggles) -> LineState {
        let coverage = match self.kind() {
            LineKind::Removed => self.base_coverage,
            LineKind::Added | LineKind::Context => self.head_coverage,
        };
        classify(coverage, toggles)
    }
}

/// A contiguous block of diffed lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiffSegment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub header: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lines: Vec<DiffLine>,
}

impl DiffSegment {
    pub fn hunk(&self) -> Option<HunkHeader> {
        HunkHeader::parse(&self.header)
    }
}

/// Position of a segment, parsed from `@@ -b,bl +h,hl @@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub base_start: u32,
    pub base_len: u32,
    pub head_start: u32,
    pub head_len: u32,
}

impl HunkHeader {
    /// Omitted lengths default to 1. Returns `None` for malformed headers.
    pub fn parse(header: &str) -> Option<Self> {
        let caps = HUNK_RE.captures(header.trim_start())?;
        let num = |i: usize, default: u32| -> Option<u32> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(default),
            }
        };
        Some(Self {
            base_start: num(1, 0)?,
            base_len: num(2, 1)?,
            head_start: num(3, 0)?,
            head_len: num(4, 1)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Impacted files
// ---------------------------------------------------------------------------

/// Badge shown next to an impacted file. Files modified in place have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileLabel {
    New,
    Renamed,
    Deleted,
}

impl FileLabel {
    /// First match wins: new, then renamed, then deleted.
    pub fn resolve(is_new: bool, is_renamed: bool, is_deleted: bool) -> Option<Self> {
        if is_new {
            Some(FileLabel::New)
        } else if is_renamed {
            Some(FileLabel::Renamed)
        } else if is_deleted {
            Some(FileLabel::Deleted)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileLabel::New => "New",
            FileLabel::Renamed => "Renamed",
            FileLabel::Deleted => "Deleted",
        }
    }
}

impl std::fmt::Display for FileLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SegmentPage {
    #[serde(default, deserialize_with = "null_as_default")]
    results: Vec<DiffSegment>,
}

/// Impacted file as returned by the comparison query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImpactedFile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub head_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_new_file: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_renamed_file: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_deleted_file: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_critical_file: bool,
    #[serde(default)]
    pub head_coverage: Option<PercentCovered>,
    #[serde(default)]
    pub base_coverage: Option<PercentCovered>,
    #[serde(default)]
    pub patch_coverage: Option<PercentCovered>,
    #[serde(default)]
    pub change_coverage: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    segments: SegmentPage,
}

/// Impacted file ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactedFile {
    pub head_name: String,
    pub file_label: Option<FileLabel>,
    pub is_critical_file: bool,
    pub head_coverage: Option<f64>,
    pub base_coverage: Option<f64>,
    pub patch_coverage: Option<f64>,
    pub change_coverage: Option<f64>,
    pub segments: Vec<DiffSegment>,
}

impl ImpactedFile {
    /// Resolve the label and move the segments across untouched.
    pub fn assemble(raw: RawImpactedFile) -> Self {
        let file_label =
            FileLabel::resolve(raw.is_new_file, raw.is_renamed_file, raw.is_deleted_file);
        tracing::debug!(
            file = %raw.head_name,
            label = ?file_label,
            segments = raw.segments.results.len(),
            "assembled impacted file"
        );
        Self {
            head_name: raw.head_name,
            file_label,
            is_critical_file: raw.is_critical_file,
            head_coverage: raw.head_coverage.and_then(|c| c.percent_covered),
            base_coverage: raw.base_coverage.and_then(|c| c.percent_covered),
            patch_coverage: raw.patch_coverage.and_then(|c| c.percent_covered),
            change_coverage: raw.change_coverage,
            segments: raw.segments.results,
        }
    }

    /// Decode and assemble in one step.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let raw: RawImpactedFile = serde_json::from_value(value)?;
        Ok(Self::assemble(raw))
    }

    /// Number of diff rows the renderer will draw.
    pub fn row_count(&self) -> usize {
        self.segments.iter().map(|s| s.lines.len()).sum()
    }
}
