use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use covlens::cli::{self, Explorer, Style, TableKind};
use covlens::model::DisplayToggles;
use covlens::source::{
    ApiConfig, FileSource, GraphqlSource, COVERAGE_FILE_POINTERS, COVERAGE_FILE_QUERY,
    IMPACTED_FILE_POINTER, IMPACTED_FILE_QUERY,
};
use covlens::table::{IndicationRange, ProjectOptions, SortDirection, SortSpec};

/// Render coverage payloads as annotated files, diffs and tables.
#[derive(Parser)]
#[command(name = "covlens", version, about)]
struct Cli {
    /// Log filter (e.g. "warn", "covlens=debug"); RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output style.
    #[arg(long, global = true, value_enum, default_value = "text")]
    style: Style,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct ToggleArgs {
    /// Do not highlight covered lines.
    #[arg(long)]
    hide_covered: bool,

    /// Do not highlight uncovered lines.
    #[arg(long)]
    hide_uncovered: bool,

    /// Do not highlight partially covered lines.
    #[arg(long)]
    hide_partial: bool,
}

impl From<ToggleArgs> for DisplayToggles {
    fn from(args: ToggleArgs) -> Self {
        DisplayToggles {
            show_covered: !args.hide_covered,
            show_uncovered: !args.hide_uncovered,
            show_partial: !args.hide_partial,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show a source file annotated with line coverage.
    File {
        /// JSON payload file, or "-" for stdin.
        input: PathBuf,

        /// JSON pointer to the coverage file payload inside the document.
        #[arg(long, default_value = "")]
        select: String,

        /// File path shown in the heading.
        #[arg(long, default_value = "<file>")]
        path: String,

        #[command(flatten)]
        toggles: ToggleArgs,
    },

    /// Show an impacted file from a comparison, segment by segment.
    Impacted {
        /// JSON payload file, or "-" for stdin.
        input: PathBuf,

        /// JSON pointer to the impacted file payload inside the document.
        #[arg(long, default_value = "")]
        select: String,

        #[command(flatten)]
        toggles: ToggleArgs,
    },

    /// Render a list payload (files, commits, pulls, flags) as a table.
    Table {
        #[arg(value_enum)]
        kind: TableKind,

        /// JSON payload file, or "-" for stdin.
        input: PathBuf,

        /// JSON pointer to the list inside the document.
        #[arg(long, default_value = "")]
        select: String,

        /// Keep only rows whose name contains this term.
        #[arg(long)]
        search: Option<String>,

        /// Column id to sort on (e.g. name, coverage, misses).
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending.
        #[arg(long)]
        desc: bool,

        /// Sort rows locally instead of keeping backend order.
        #[arg(long)]
        client_sort: bool,

        /// Repository name for the root breadcrumb (files only).
        #[arg(long, default_value = "")]
        root: String,

        /// Directory being browsed (files only).
        #[arg(long, default_value = "")]
        url_path: String,

        /// Show files as a flat list (files only).
        #[arg(long)]
        list: bool,

        /// Coverage below this is shown as danger.
        #[arg(long, default_value_t = 60.0)]
        lower_range: f64,

        /// Coverage below this is shown as warning.
        #[arg(long, default_value_t = 80.0)]
        upper_range: f64,
    },

    /// Fetch a file's coverage from the API and show it annotated.
    FetchFile {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        repo: String,

        /// Commit SHA or branch name.
        #[arg(long = "ref")]
        reference: String,

        #[arg(long)]
        path: String,

        /// Restrict coverage to these flags.
        #[arg(long = "flag")]
        flags: Vec<String>,

        #[command(flatten)]
        toggles: ToggleArgs,
    },

    /// Fetch an impacted file of a pull request from the API.
    FetchImpacted {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        repo: String,

        #[arg(long)]
        pull: u64,

        #[arg(long)]
        path: String,

        #[command(flatten)]
        toggles: ToggleArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let style = cli.style;
    let output = match cli.command {
        Commands::File {
            input,
            select,
            path,
            toggles,
        } => {
            let payload = cli::load(&FileSource::new(input), &select)?;
            cli::cmd_file(payload, &path, toggles.into(), style)?
        }
        Commands::Impacted {
            input,
            select,
            toggles,
        } => {
            let payload = cli::load(&FileSource::new(input), &select)?;
            cli::cmd_impacted(payload, toggles.into(), style)?
        }
        Commands::Table {
            kind,
            input,
            select,
            search,
            sort,
            desc,
            client_sort,
            root,
            url_path,
            list,
            lower_range,
            upper_range,
        } => {
            let direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            let opts = ProjectOptions {
                search,
                sort: sort.map(|field| SortSpec::new(field, direction)),
                client_sort,
                indication_range: IndicationRange {
                    lower_range,
                    upper_range,
                },
                ..Default::default()
            };
            let explorer = Explorer {
                root,
                url_path,
                list,
            };
            let payload = cli::load(&FileSource::new(input), &select)?;
            cli::cmd_table(kind, payload, &opts, &explorer, style)?
        }
        Commands::FetchFile {
            owner,
            repo,
            reference,
            path,
            flags,
            toggles,
        } => {
            let source = GraphqlSource {
                config: ApiConfig::from_env().context("API is not configured")?,
                query: COVERAGE_FILE_QUERY.to_string(),
                variables: serde_json::json!({
                    "owner": owner,
                    "repo": repo,
                    "ref": reference,
                    "path": path,
                    "flags": flags,
                }),
            };
            let payload = cli::load_first(&source, COVERAGE_FILE_POINTERS)?;
            cli::cmd_file(payload, &path, toggles.into(), style)?
        }
        Commands::FetchImpacted {
            owner,
            repo,
            pull,
            path,
            toggles,
        } => {
            let source = GraphqlSource {
                config: ApiConfig::from_env().context("API is not configured")?,
                query: IMPACTED_FILE_QUERY.to_string(),
                variables: serde_json::json!({
                    "owner": owner,
                    "repo": repo,
                    "pullId": pull,
                    "path": path,
                }),
            };
            let payload = cli::load(&source, IMPACTED_FILE_POINTER)?;
            cli::cmd_impacted(payload, toggles.into(), style)?
        }
    };

    print!("{output}");
    Ok(())
}
