mod common;

use covlens::classify::classify;
use covlens::cli::{self, Style};
use covlens::model::{DisplayToggles, LineAnnotation, LineState, LineType};
use covlens::normalize::{CoverageFilePayload, CoverageMap};
use covlens::source::{FileSource, COVERAGE_FILE_POINTER, COVERAGE_FILE_POINTERS};

fn load_payload() -> CoverageFilePayload {
    let value = cli::load(
        &FileSource::new(common::fixture_path("coverage_file.json")),
        COVERAGE_FILE_POINTER,
    )
    .unwrap();
    serde_json::from_value(value).unwrap()
}

/// Annotations for lines 1 and 3 leave line 2 without data.
#[test]
fn sparse_annotations_classify_per_line() {
    let map = CoverageMap::from_annotations(&[
        LineAnnotation::new(1, LineType::Hit),
        LineAnnotation::new(3, LineType::Miss),
    ]);
    let toggles = DisplayToggles::default();

    assert_eq!(map.len(), 2);
    assert_eq!(map.state_for(1, &toggles), LineState::Covered);
    assert_eq!(map.state_for(2, &toggles), LineState::Blank);
    assert_eq!(map.state_for(3, &toggles), LineState::Uncovered);
}

#[test]
fn hidden_covered_lines_are_blank() {
    let toggles = DisplayToggles {
        show_covered: false,
        ..Default::default()
    };
    assert_eq!(classify(Some(LineType::Hit), &toggles), LineState::Blank);
    assert_eq!(classify(Some(LineType::Miss), &toggles), LineState::Uncovered);
}

#[test]
fn classification_is_repeatable() {
    let payload = load_payload();
    let toggles = DisplayToggles::default();
    let first: Vec<_> = (1..=7).map(|l| payload.coverage_map().state_for(l, &toggles)).collect();
    let second: Vec<_> = (1..=7).map(|l| payload.coverage_map().state_for(l, &toggles)).collect();
    assert_eq!(first, second);
}

#[test]
fn fixture_payload_decodes() {
    let payload = load_payload();
    let map = payload.coverage_map();

    assert!(payload.is_critical_file);
    assert_eq!(payload.percent_covered(), 53.43);
    // Line 6 carries an unrecognized code and is dropped.
    assert_eq!(map.len(), 4);
    assert_eq!(map.get(4), Some(LineType::Partial));
    assert_eq!(map.get(6), None);
    assert_eq!(map.state_for(6, &DisplayToggles::default()), LineState::Blank);

    let totals = map.totals();
    assert_eq!((totals.hits, totals.partials, totals.misses), (2, 1, 1));
}

#[test]
fn renders_annotated_file() {
    let value = cli::load(
        &FileSource::new(common::fixture_path("coverage_file.json")),
        COVERAGE_FILE_POINTER,
    )
    .unwrap();
    let out = cli::cmd_file(value, "src/total.js", DisplayToggles::default(), Style::Text).unwrap();

    assert!(out.starts_with("src/total.js (critical)  53.43%"));
    assert!(out.contains("     1 ✓ import { add } from './math'"));
    assert!(out.contains("     4 ◐   if (!xs) return 0"));
    assert!(out.contains("     5 ✗   return xs.reduce(add, 0)"));
    assert!(out.contains("     6   }"));
    assert!(out.contains("4 tracked lines: 2 covered, 1 partial, 1 missed"));
}

#[test]
fn renders_markdown_with_partials_hidden() {
    let value = cli::load(
        &FileSource::new(common::fixture_path("coverage_file.json")),
        COVERAGE_FILE_POINTER,
    )
    .unwrap();
    let toggles = DisplayToggles {
        show_partial: false,
        ..Default::default()
    };
    let out = cli::cmd_file(value, "src/total.js", toggles, Style::Markdown).unwrap();

    assert!(out.contains("### `src/total.js` (critical): 53.43%"));
    assert!(out.contains("     4     if (!xs) return 0"));
}

#[test]
fn branch_name_ref_uses_branch_head() {
    let value = cli::load_first(
        &FileSource::new(common::fixture_path("coverage_branch.json")),
        COVERAGE_FILE_POINTERS,
    )
    .unwrap();
    let out = cli::cmd_file(value, "src/main.rs", DisplayToggles::default(), Style::Text).unwrap();

    assert!(out.starts_with("src/main.rs  50.00%"));
    assert!(out.contains("     1 ✓ fn main() {"));
    assert!(out.contains("     2 ✗     run();"));
}

#[test]
fn commit_pointer_alone_misses_branch_payload() {
    let result = cli::load(
        &FileSource::new(common::fixture_path("coverage_branch.json")),
        COVERAGE_FILE_POINTER,
    );
    assert!(result.is_err());
}
