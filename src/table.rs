//! Projection of backend entities into table rows.
//!
//! Rows come out in backend order. Sorting is normally done by the backend,
//! so a [`SortSpec`] is turned into query ordering variables; rows are only
//! re-sorted here when the caller explicitly asks for a client-side sort.

use std::cmp::Ordering as CmpOrdering;

use serde::{Deserialize, Serialize};

/// A declared table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub id: &'static str,
    pub header: &'static str,
}

/// Coverage bar color derived from the repository's indication range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressColor {
    Danger,
    Warning,
    Primary,
}

/// Lower/upper coverage thresholds configured for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicationRange {
    pub lower_range: f64,
    pub upper_range: f64,
}

impl Default for IndicationRange {
    fn default() -> Self {
        Self {
            lower_range: 60.0,
            upper_range: 80.0,
        }
    }
}

impl IndicationRange {
    #[must_use]
    pub fn color(&self, coverage: Option<f64>) -> Option<ProgressColor> {
        let coverage = coverage?;
        Some(if coverage < self.lower_range {
            ProgressColor::Danger
        } else if coverage < self.upper_range {
            ProgressColor::Warning
        } else {
            ProgressColor::Primary
        })
    }
}

/// Value of a single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Count(u64),
    Percent(Option<f64>),
    /// Signed change in percentage points.
    Change(Option<f64>),
    Progress {
        percent: Option<f64>,
        color: Option<ProgressColor>,
    },
    Link {
        label: String,
        target: String,
    },
    Empty,
}

impl Cell {
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Count(n) => n.to_string(),
            Cell::Percent(Some(p)) | Cell::Progress { percent: Some(p), .. } => format!("{p:.2}%"),
            Cell::Percent(None) | Cell::Progress { percent: None, .. } => "-".to_string(),
            Cell::Change(Some(c)) => format!("{c:+.2}%"),
            Cell::Change(None) => "-".to_string(),
            Cell::Link { label, .. } => label.clone(),
            Cell::Empty => String::new(),
        }
    }

    fn sort_number(&self) -> Option<f64> {
        match self {
            Cell::Count(n) => Some(*n as f64),
            Cell::Percent(p) | Cell::Change(p) | Cell::Progress { percent: p, .. } => *p,
            _ => None,
        }
    }

    fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Percent(None) | Cell::Change(None) | Cell::Progress { percent: None, .. } => true,
            _ => false,
        }
    }

    /// Ascending comparison of two cells of the same column.
    fn compare(&self, other: &Cell) -> CmpOrdering {
        match (self.sort_number(), other.sort_number()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => self.display().to_lowercase().cmp(&other.display().to_lowercase()),
        }
    }
}

/// Render-only projection of one entity, with cells keyed by column id.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub key: String,
    cells: Vec<(&'static str, Cell)>,
}

impl TableRow {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cells: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, id: &'static str, cell: Cell) -> Self {
        self.cells.push((id, cell));
        self
    }

    pub fn get(&self, id: &str) -> Option<&Cell> {
        self.cells.iter().find(|(c, _)| *c == id).map(|(_, cell)| cell)
    }

    pub fn cells(&self) -> &[(&'static str, Cell)] {
        &self.cells
    }

    /// Display text of the first cell.
    pub fn name(&self) -> String {
        self.cells
            .first()
            .map(|(_, cell)| cell.display())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Column and direction requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Ordering variables for the backend query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOrdering {
    pub direction: SortDirection,
    pub parameter: &'static str,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Backend ordering for this sort, or `None` when the backend does not
    /// sort on that column.
    pub fn to_ordering(&self) -> Option<QueryOrdering> {
        let parameter = match self.field.as_str() {
            "name" => "NAME",
            "coverage" => "COVERAGE",
            "hits" => "HITS",
            "misses" => "MISSES",
            "partials" => "PARTIALS",
            "lines" => "LINES",
            _ => return None,
        };
        Some(QueryOrdering {
            direction: self.direction,
            parameter,
        })
    }
}

/// Parameters shared by every projection.
#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    pub search: Option<String>,
    pub sort: Option<SortSpec>,
    /// Re-sort rows locally instead of trusting backend order.
    pub client_sort: bool,
    pub indication_range: IndicationRange,
    /// Directory being browsed; entries without a path of their own link
    /// below it.
    pub url_path: String,
}

impl ProjectOptions {
    pub fn is_searching(&self) -> bool {
        self.search.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Anything that can be shown as a table row.
pub trait TableEntity {
    fn columns() -> &'static [Column];

    /// Raw name matched by search, without any display decoration.
    fn search_name(&self) -> &str;

    fn to_row(&self, opts: &ProjectOptions) -> TableRow;
}

/// Keep entities whose name matches the search, map them to rows and, if
/// requested, apply a stable client-side sort. Empty input yields no rows.
pub fn project<E: TableEntity>(entities: &[E], opts: &ProjectOptions) -> Vec<TableRow> {
    let term = opts
        .search
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let mut rows: Vec<TableRow> = entities
        .iter()
        .filter(|e| {
            term.as_deref()
                .map_or(true, |t| e.search_name().to_lowercase().contains(t))
        })
        .map(|e| e.to_row(opts))
        .collect();

    if opts.client_sort {
        if let Some(sort) = &opts.sort {
            sort_rows(&mut rows, sort);
        }
    }

    rows
}

/// Stable sort on one column; rows with missing values go last.
fn sort_rows(rows: &mut [TableRow], sort: &SortSpec) {
    let field = sort.field.as_str();
    rows.sort_by(|a, b| match (a.get(field), b.get(field)) {
        (Some(x), Some(y)) => match (x.is_missing(), y.is_missing()) {
            (true, true) => CmpOrdering::Equal,
            (true, false) => CmpOrdering::Greater,
            (false, true) => CmpOrdering::Less,
            (false, false) => {
                let ord = x.compare(y);
                match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
        },
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    });
}

// ---------------------------------------------------------------------------
// Directory navigation
// ---------------------------------------------------------------------------

/// Tree or flat list presentation of path contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayType {
    Tree,
    List,
}

impl DisplayType {
    /// Searching always flattens the tree.
    pub fn determine(requested: Option<DisplayType>, is_searching: bool) -> Self {
        if is_searching || requested == Some(DisplayType::List) {
            DisplayType::List
        } else {
            DisplayType::Tree
        }
    }
}

/// One breadcrumb in the file explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePath {
    pub text: String,
    pub path: String,
}

/// Breadcrumbs from the repository root down to `url_path`.
pub fn tree_paths(root: &str, url_path: &str) -> Vec<TreePath> {
    let mut paths = vec![TreePath {
        text: root.to_string(),
        path: String::new(),
    }];
    let mut current = String::new();
    for part in url_path.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        paths.push(TreePath {
            text: part.to_string(),
            path: current.clone(),
        });
    }
    paths
}

/// Prepend a `..` row when browsing below the root in tree mode. The row
/// is a fixed prefix; the remaining rows keep their order.
pub fn adjust_list_if_up_dir(
    tree_paths: &[TreePath],
    display_type: DisplayType,
    rows: Vec<TableRow>,
) -> Vec<TableRow> {
    if rows.is_empty() || display_type != DisplayType::Tree || tree_paths.len() < 2 {
        return rows;
    }
    let parent = &tree_paths[tree_paths.len() - 2];
    let up = TableRow::new("..")
        .with(
            "name",
            Cell::Link {
                label: "..".to_string(),
                target: parent.path.clone(),
            },
        )
        .with("lines", Cell::Empty)
        .with("hits", Cell::Empty)
        .with("partials", Cell::Empty)
        .with("misses", Cell::Empty)
        .with("coverage", Cell::Empty);

    let mut adjusted = Vec::with_capacity(rows.len() + 1);
    adjusted.push(up);
    adjusted.extend(rows);
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        name: &'static str,
        hits: u64,
        coverage: Option<f64>,
    }

    const COLUMNS: &[Column] = &[
        Column { id: "name", header: "Name" },
        Column { id: "hits", header: "Covered" },
        Column { id: "coverage", header: "Coverage %" },
    ];

    impl TableEntity for Item {
        fn columns() -> &'static [Column] {
            COLUMNS
        }

        fn search_name(&self) -> &str {
            self.name
        }

        fn to_row(&self, _opts: &ProjectOptions) -> TableRow {
            TableRow::new(self.name)
                .with("name", Cell::Text(self.name.to_string()))
                .with("hits", Cell::Count(self.hits))
                .with("coverage", Cell::Percent(self.coverage))
        }
    }

    fn items() -> Vec<Item> {
        vec![
            Item { name: "b.rs", hits: 5, coverage: Some(50.0) },
            Item { name: "a.rs", hits: 9, coverage: None },
            Item { name: "c.rs", hits: 1, coverage: Some(90.0) },
        ]
    }

    fn keys(rows: &[TableRow]) -> Vec<&str> {
        rows.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_project_empty() {
        let rows = project::<Item>(&[], &ProjectOptions::default());
        assert!(rows.is_empty());
    }

    #[test]
    fn test_project_keeps_backend_order() {
        let opts = ProjectOptions {
            sort: Some(SortSpec::new("hits", SortDirection::Asc)),
            ..Default::default()
        };
        let rows = project(&items(), &opts);
        assert_eq!(keys(&rows), vec!["b.rs", "a.rs", "c.rs"]);
    }

    #[test]
    fn test_project_client_sort() {
        let opts = ProjectOptions {
            sort: Some(SortSpec::new("hits", SortDirection::Desc)),
            client_sort: true,
            ..Default::default()
        };
        assert_eq!(keys(&project(&items(), &opts)), vec!["a.rs", "b.rs", "c.rs"]);
    }

    #[test]
    fn test_client_sort_missing_values_last() {
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let opts = ProjectOptions {
                sort: Some(SortSpec::new("coverage", direction)),
                client_sort: true,
                ..Default::default()
            };
            let rows = project(&items(), &opts);
            assert_eq!(rows.last().unwrap().key, "a.rs");
        }
    }

    #[test]
    fn test_project_search() {
        let opts = ProjectOptions {
            search: Some("A.R".to_string()),
            ..Default::default()
        };
        assert_eq!(keys(&project(&items(), &opts)), vec!["a.rs"]);

        let opts = ProjectOptions {
            search: Some("zzz".to_string()),
            ..Default::default()
        };
        assert!(project(&items(), &opts).is_empty());
    }

    #[test]
    fn test_sort_to_ordering() {
        let ordering = SortSpec::new("misses", SortDirection::Desc).to_ordering().unwrap();
        assert_eq!(ordering.parameter, "MISSES");
        assert_eq!(
            serde_json::to_value(&ordering).unwrap(),
            serde_json::json!({"direction": "DESC", "parameter": "MISSES"})
        );
        assert_eq!(SortSpec::new("trend", SortDirection::Asc).to_ordering(), None);
    }

    #[test]
    fn test_indication_range_color() {
        let range = IndicationRange::default();
        assert_eq!(range.color(None), None);
        assert_eq!(range.color(Some(59.9)), Some(ProgressColor::Danger));
        assert_eq!(range.color(Some(60.0)), Some(ProgressColor::Warning));
        assert_eq!(range.color(Some(80.0)), Some(ProgressColor::Primary));
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Percent(Some(93.256)).display(), "93.26%");
        assert_eq!(Cell::Percent(None).display(), "-");
        assert_eq!(Cell::Change(Some(2.5)).display(), "+2.50%");
        assert_eq!(Cell::Change(Some(-1.0)).display(), "-1.00%");
        assert_eq!(Cell::Count(12).display(), "12");
    }

    #[test]
    fn test_tree_paths() {
        let paths = tree_paths("gazebo", "src/ui/");
        let texts: Vec<_> = paths.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["gazebo", "src", "ui"]);
        assert_eq!(paths[2].path, "src/ui");
        assert_eq!(tree_paths("gazebo", "").len(), 1);
    }

    #[test]
    fn test_up_dir_prepended_below_root() {
        let rows = project(&items(), &ProjectOptions::default());
        let adjusted = adjust_list_if_up_dir(&tree_paths("repo", "src/ui"), DisplayType::Tree, rows);
        assert_eq!(keys(&adjusted), vec!["..", "b.rs", "a.rs", "c.rs"]);
        assert_eq!(
            adjusted[0].get("name"),
            Some(&Cell::Link {
                label: "..".to_string(),
                target: "src".to_string()
            })
        );
    }

    #[test]
    fn test_up_dir_skipped() {
        let rows = || project(&items(), &ProjectOptions::default());
        // At root
        assert_eq!(adjust_list_if_up_dir(&tree_paths("repo", ""), DisplayType::Tree, rows()).len(), 3);
        // List mode
        assert_eq!(adjust_list_if_up_dir(&tree_paths("repo", "src"), DisplayType::List, rows()).len(), 3);
        // No rows
        assert!(adjust_list_if_up_dir(&tree_paths("repo", "src"), DisplayType::Tree, vec![]).is_empty());
    }

    #[test]
    fn test_display_type() {
        assert_eq!(DisplayType::determine(None, false), DisplayType::Tree);
        assert_eq!(DisplayType::determine(Some(DisplayType::Tree), true), DisplayType::List);
        assert_eq!(DisplayType::determine(Some(DisplayType::List), false), DisplayType::List);
    }
}
