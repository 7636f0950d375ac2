//! Shared value types for coverage rendering. Everything here is produced
//! by decoding backend payloads and is immutable once constructed; the
//! derived views (maps, display states, rows) live in their own modules.

use serde::{Deserialize, Deserializer};

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Per-line coverage outcome reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineType {
    Hit,
    Miss,
    Partial,
}

impl LineType {
    /// Decode a wire code (`H`, `M`, `P`). Anything else is `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "H" => Some(LineType::Hit),
            "M" => Some(LineType::Miss),
            "P" => Some(LineType::Partial),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            LineType::Hit => "H",
            LineType::Miss => "M",
            LineType::Partial => "P",
        }
    }
}

impl std::fmt::Display for LineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A single `{line, coverage}` record from a coverage-by-file query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineAnnotation {
    #[serde(deserialize_with = "de_required_line")]
    pub line: u32,
    #[serde(default, deserialize_with = "de_line_type")]
    pub coverage: Option<LineType>,
}

impl LineAnnotation {
    pub fn new(line: u32, coverage: LineType) -> Self {
        Self {
            line,
            coverage: Some(coverage),
        }
    }
}

/// Which coverage states the viewer currently highlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayToggles {
    pub show_covered: bool,
    pub show_uncovered: bool,
    pub show_partial: bool,
}

impl Default for DisplayToggles {
    fn default() -> Self {
        Self {
            show_covered: true,
            show_uncovered: true,
            show_partial: true,
        }
    }
}

/// Rendered state of one line, derived from its coverage and the toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineState {
    Covered,
    Uncovered,
    Partial,
    Blank,
}

impl LineState {
    /// Accessible label for the line-number cell.
    pub fn label(&self) -> &'static str {
        match self {
            LineState::Covered => "covered line of code",
            LineState::Uncovered => "uncovered line of code",
            LineState::Partial => "partial line of code",
            LineState::Blank => "line of code",
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            LineState::Covered => "✓",
            LineState::Uncovered => "✗",
            LineState::Partial => "◐",
            LineState::Blank => " ",
        }
    }
}

/// `{percentCovered}` wrapper used by several comparison payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentCovered {
    #[serde(default)]
    pub percent_covered: Option<f64>,
}

/// `{coverage}` totals wrapper used by commit and file payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Totals {
    #[serde(default)]
    pub coverage: Option<f64>,
}

/// Decode a coverage code, mapping unrecognized values to `None`.
pub(crate) fn de_line_type<'de, D>(deserializer: D) -> Result<Option<LineType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(code)) => {
            let parsed = LineType::from_code(&code);
            if parsed.is_none() {
                tracing::debug!(code = %code, "unrecognized coverage state, treating as blank");
            }
            parsed
        }
        Some(serde_json::Value::Null) | None => None,
        Some(other) => {
            tracing::debug!(value = %other, "non-string coverage state, treating as blank");
            None
        }
    })
}

/// Decode a line number sent either as an integer or as a numeric string.
pub(crate) fn de_line_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

/// Like [`de_line_number`], but a record without a usable line is an error.
fn de_required_line<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    de_line_number(deserializer)?.ok_or_else(|| serde::de::Error::custom("expected a line number"))
}

/// Treat an explicit JSON `null` the same as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
