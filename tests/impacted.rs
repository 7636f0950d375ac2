mod common;

use covlens::cli::{self, Style};
use covlens::model::{DisplayToggles, LineState};
use covlens::segments::{FileLabel, HunkHeader, ImpactedFile, LineKind};
use covlens::source::{extract_data, select, IMPACTED_FILE_POINTER};

fn new_file() -> ImpactedFile {
    let data = extract_data(common::fixture("impacted_new_file.json")).unwrap();
    let payload = select(data, IMPACTED_FILE_POINTER).unwrap();
    ImpactedFile::from_json(payload).unwrap()
}

#[test]
fn new_file_is_labelled_and_segments_pass_through() {
    let file = new_file();

    assert_eq!(file.head_name, "file A");
    assert_eq!(file.file_label, Some(FileLabel::New));
    assert!(!file.is_critical_file);
    assert_eq!(file.head_coverage, Some(90.23));
    assert_eq!(file.patch_coverage, Some(27.43));

    assert_eq!(file.segments.len(), 2);
    assert_eq!(file.segments[0].header, "@@ -0,0 +1,45 @@");
    assert_eq!(file.segments[1].header, "@@ -10,3 +12,2 @@");
    assert_eq!(file.row_count(), 5);

    let contents: Vec<&str> = file.segments[0]
        .lines
        .iter()
        .map(|l| l.content.as_str())
        .collect();
    assert_eq!(
        contents,
        vec![
            "+export default class Calculator {",
            "+  private value = 0;",
            "+  private calcMode = \"\"",
        ]
    );
}

#[test]
fn coverage_info_is_carried_verbatim() {
    let file = new_file();
    let first = &file.segments[0].lines;

    assert_eq!(first[0].coverage_info.hit_count, None);
    assert_eq!(first[0].coverage_info.hit_upload_ids, None);
    assert_eq!(first[1].coverage_info.hit_count, Some(18));
    assert_eq!(first[1].coverage_info.hit_upload_ids, Some(vec![0]));

    let second = &file.segments[1].lines;
    assert_eq!(second[0].coverage_info.hit_count, Some(0));
    assert_eq!(second[0].coverage_info.hit_upload_ids, Some(vec![]));
    assert_eq!(second[1].coverage_info.hit_count, None);
}

#[test]
fn segment_lines_classify() {
    let file = new_file();
    let toggles = DisplayToggles::default();
    let lines = &file.segments[1].lines;

    assert_eq!(lines[0].kind(), LineKind::Context);
    assert_eq!(lines[0].display_state(&toggles), LineState::Partial);
    assert_eq!(lines[1].kind(), LineKind::Removed);
    assert_eq!(lines[1].display_state(&toggles), LineState::Uncovered);

    assert_eq!(
        file.segments[1].hunk(),
        Some(HunkHeader {
            base_start: 10,
            base_len: 3,
            head_start: 12,
            head_len: 2
        })
    );
}

#[test]
fn deleted_file_with_no_segments_renders_no_rows() {
    let file = ImpactedFile::from_json(common::fixture("impacted_deleted_file.json")).unwrap();
    assert_eq!(file.file_label, Some(FileLabel::Deleted));
    assert!(file.segments.is_empty());
    assert_eq!(file.row_count(), 0);

    let out = cli::cmd_impacted(
        common::fixture("impacted_deleted_file.json"),
        DisplayToggles::default(),
        Style::Text,
    )
    .unwrap();
    assert_eq!(out.lines().count(), 2);
    assert!(out.starts_with("file A [Deleted]"));
}

#[test]
fn renders_hit_counts_without_inventing_zeros() {
    let data = extract_data(common::fixture("impacted_new_file.json")).unwrap();
    let payload = select(data, IMPACTED_FILE_POINTER).unwrap();
    let out = cli::cmd_impacted(payload, DisplayToggles::default(), Style::Text).unwrap();

    assert!(out.contains("file A [New]"));
    assert!(out.contains("HEAD 90.23%  BASE 23.42%  PATCH 27.43%  CHANGE +58.33%"));
    assert!(out.contains("            1 ✓     - | +export default class Calculator {"));
    assert!(out.contains("            2 ✓    18 | +  private value = 0;"));
    assert!(out.contains("    10     12 ◐     0 |    add(x) {"));
    assert!(out.contains("    11        ✗     - | -    this.value += x"));
}

#[test]
fn renders_markdown_diff_blocks() {
    let data = extract_data(common::fixture("impacted_new_file.json")).unwrap();
    let payload = select(data, IMPACTED_FILE_POINTER).unwrap();
    let out = cli::cmd_impacted(payload, DisplayToggles::default(), Style::Markdown).unwrap();

    assert!(out.contains("### `file A [New]`"));
    assert_eq!(out.matches("```diff").count(), 2);
}
