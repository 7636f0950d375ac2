use crate::model::{DisplayToggles, LineState, LineType};

/// Decide how a line is highlighted.
///
/// Pure and total: a line without coverage data is always blank, and each
/// coverage state is only highlighted when its toggle is on.
#[must_use]
pub fn classify(coverage: Option<LineType>, toggles: &DisplayToggles) -> LineState {
    match coverage {
        None => LineState::Blank,
        Some(LineType::Hit) if toggles.show_covered => LineState::Covered,
        Some(LineType::Miss) if toggles.show_uncovered => LineState::Uncovered,
        Some(LineType::Partial) if toggles.show_partial => LineState::Partial,
        Some(_) => LineState::Blank,
    }
}
