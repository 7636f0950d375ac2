//! Turn the sparse `{line, coverage}` list from a coverage-by-file query
//! into a dense per-line lookup.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::classify::classify;
use crate::model::{null_as_default, rate, DisplayToggles, LineAnnotation, LineState, LineType, Totals};

/// Line number -> coverage state. Lines without an entry have no coverage
/// data, which renders as blank rather than as a miss.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageMap {
    lines: HashMap<u32, LineType>,
}

impl CoverageMap {
    /// Build the map in one pass. A repeated line number keeps the last
    /// value seen; annotations whose state was not recognized are skipped.
    pub fn from_annotations(annotations: &[LineAnnotation]) -> Self {
        let mut lines = HashMap::with_capacity(annotations.len());
        for ann in annotations {
            match ann.coverage {
                Some(state) => {
                    lines.insert(ann.line, state);
                }
                None => {
                    // Last write wins, including an unrecognized state.
                    lines.remove(&ann.line);
                }
            }
        }
        Self { lines }
    }

    #[must_use]
    pub fn get(&self, line: u32) -> Option<LineType> {
        self.lines.get(&line).copied()
    }

    /// Display state for `line` under `toggles`.
    #[must_use]
    pub fn state_for(&self, line: u32, toggles: &DisplayToggles) -> LineState {
        classify(self.get(line), toggles)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Entries ordered by line number.
    pub fn sorted(&self) -> Vec<(u32, LineType)> {
        let mut entries: Vec<_> = self.lines.iter().map(|(&l, &t)| (l, t)).collect();
        entries.sort_unstable_by_key(|&(line, _)| line);
        entries
    }

    /// Count hits, misses and partials across all annotated lines.
    #[must_use]
    pub fn totals(&self) -> LineTotals {
        let mut totals = LineTotals::default();
        for state in self.lines.values() {
            match state {
                LineType::Hit => totals.hits += 1,
                LineType::Miss => totals.misses += 1,
                LineType::Partial => totals.partials += 1,
            }
        }
        totals.lines = totals.hits + totals.misses + totals.partials;
        totals
    }
}

impl FromIterator<LineAnnotation> for CoverageMap {
    fn from_iter<I: IntoIterator<Item = LineAnnotation>>(iter: I) -> Self {
        let annotations: Vec<_> = iter.into_iter().collect();
        Self::from_annotations(&annotations)
    }
}

/// Tracked-line counts for a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineTotals {
    pub hits: u64,
    pub misses: u64,
    pub partials: u64,
    pub lines: u64,
}

impl LineTotals {
    /// Hits over tracked lines, as a percentage.
    #[must_use]
    pub fn percent_covered(&self) -> f64 {
        rate(self.hits, self.lines) * 100.0
    }
}

/// Body of a coverage-by-file query for one commit or branch head.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageFilePayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "de_annotations")]
    pub coverage: Vec<LineAnnotation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub totals: Totals,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_critical_file: bool,
}

impl CoverageFilePayload {
    pub fn coverage_map(&self) -> CoverageMap {
        CoverageMap::from_annotations(&self.coverage)
    }

    /// Backend-reported percentage, falling back to the annotated totals.
    pub fn percent_covered(&self) -> f64 {
        self.totals
            .coverage
            .unwrap_or_else(|| self.coverage_map().totals().percent_covered())
    }
}

/// Decode annotations one by one, dropping records that cannot be read.
fn de_annotations<'de, D>(deserializer: D) -> Result<Vec<LineAnnotation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    let raw = raw.unwrap_or_default();
    let total = raw.len();
    let annotations: Vec<LineAnnotation> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(ann) => Some(ann),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed coverage annotation");
                None
            }
        })
        .collect();
    if annotations.len() < total {
        tracing::debug!(skipped = total - annotations.len(), "dropped coverage annotations");
    }
    Ok(annotations)
}
