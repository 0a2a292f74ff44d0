use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tabula_api::{Engine, PageView};
use tabula_core::{EngineConfig, FilterValue, SortDirection, SortKey, Value, ViewState};
use tabula_view::{Facet, PageItem};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "tabulactl", version, about = "Filter, sort, facet and page a JSON record file")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

/// Record file plus the filters shared by `view` and `facet`.
#[derive(Args, Debug)]
struct Source {
    /// JSON file holding an array of flat objects
    file: PathBuf,
    /// Field carrying the record id; rows without it are numbered by position
    #[arg(long = "id-field", default_value = "id")]
    id_field: String,
    /// Text filter, e.g. `name=ann` (repeatable)
    #[arg(long = "filter", value_name = "COL=QUERY")]
    filters: Vec<String>,
    /// Numeric range filter, e.g. `age=18..65`; either bound may be omitted (repeatable)
    #[arg(long = "range", value_name = "COL=LO..HI")]
    ranges: Vec<String>,
    /// Query matched against every fuzzy text column
    #[arg(long = "global")]
    global: Option<String>,
    /// Saved view state (JSON), applied before the other flags
    #[arg(long = "state")]
    state: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one page of the filtered, sorted records
    View {
        #[command(flatten)]
        source: Source,
        /// Sort key, e.g. `age:desc` (repeatable; earlier keys win)
        #[arg(long = "sort", value_name = "COL[:asc|desc]")]
        sort: Vec<String>,
        /// 1-based page number; clamps to the last page
        #[arg(long = "page", default_value_t = 1)]
        page: usize,
        /// Rows per page (default: TABULA_PAGE_SIZE or 5)
        #[arg(long = "page-size")]
        page_size: Option<usize>,
        /// Hide a column (repeatable)
        #[arg(long = "hide", value_name = "COL")]
        hide: Vec<String>,
        /// Pages shown on each side of the current one (default: TABULA_WINDOW_RADIUS or 2)
        #[arg(long = "radius")]
        radius: Option<usize>,
        /// Write the resulting view state as JSON
        #[arg(long = "save-state")]
        save_state: Option<PathBuf>,
    },
    /// Distinct values (text) or bounds (numeric) of a column, ignoring its own filter
    Facet {
        #[command(flatten)]
        source: Source,
        column: String,
    },
    /// Print the page-number window for a position
    Window {
        #[arg(long = "current")]
        current: usize,
        #[arg(long = "total")]
        total: usize,
        #[arg(long = "radius", default_value_t = 2)]
        radius: usize,
    },
}

fn init_tracing() {
    let env = std::env::var("TABULA_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn parse_filter(raw: &str) -> Result<(String, String)> {
    let (col, query) = raw.split_once('=').ok_or_else(|| anyhow!("expected COL=QUERY, got {raw:?}"))?;
    Ok((col.trim().to_string(), query.to_string()))
}

fn parse_bound(s: &str, open: f64) -> Result<f64> {
    let s = s.trim();
    if s.is_empty() { return Ok(open); }
    s.parse::<f64>().with_context(|| format!("invalid number {s:?}"))
}

fn parse_range(raw: &str) -> Result<(String, f64, f64)> {
    let (col, bounds) = raw.split_once('=').ok_or_else(|| anyhow!("expected COL=LO..HI, got {raw:?}"))?;
    let (lo, hi) = bounds.split_once("..").ok_or_else(|| anyhow!("expected LO..HI, got {bounds:?}"))?;
    Ok((col.trim().to_string(), parse_bound(lo, f64::NEG_INFINITY)?, parse_bound(hi, f64::INFINITY)?))
}

fn parse_sort(raw: &str) -> Result<SortKey> {
    let (col, dir) = match raw.rsplit_once(':') {
        Some((col, dir)) => (col, dir),
        None => (raw, "asc"),
    };
    let direction = match dir.to_ascii_lowercase().as_str() {
        "asc" => SortDirection::Asc,
        "desc" => SortDirection::Desc,
        other => bail!("unknown sort direction {other:?}; expected asc or desc"),
    };
    Ok(SortKey { column: col.trim().to_string(), direction })
}

fn open(source: &Source, config: EngineConfig) -> Result<Engine> {
    let records = tabula_store::load_path(&source.file, &source.id_field)?;
    let columns = tabula_store::infer_columns(&records);
    debug!(columns = ?columns.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), "columns inferred");
    let mut engine = Engine::with_config(records, columns, config).context("records do not fit their columns")?;
    if let Some(path) = &source.state {
        engine.restore(read_state(path)?).with_context(|| format!("restoring {}", path.display()))?;
    }
    for raw in source.filters.iter() {
        let (col, query) = parse_filter(raw)?;
        engine.set_filter(&col, FilterValue::text(query)).with_context(|| format!("--filter {raw}"))?;
    }
    for raw in source.ranges.iter() {
        let (col, lo, hi) = parse_range(raw)?;
        engine.set_filter(&col, FilterValue::range(lo, hi)).with_context(|| format!("--range {raw}"))?;
    }
    if let Some(q) = &source.global {
        engine.set_global_filter(q);
    }
    Ok(engine)
}

fn read_state(path: &Path) -> Result<ViewState> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing view state {}", path.display()))
}

fn render_window(items: &[PageItem], current: usize) -> String {
    items
        .iter()
        .map(|it| match it {
            PageItem::Page(p) if *p == current => format!("[{p}]"),
            PageItem::Page(p) => p.to_string(),
            PageItem::Ellipsis => "…".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_cell(v: &Option<Value>) -> String {
    v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_table(page: &PageView) {
    let mut widths: Vec<usize> = page.columns.iter().map(|c| c.chars().count()).collect();
    let cells: Vec<Vec<String>> = page.rows.iter().map(|r| r.cells.iter().map(render_cell).collect()).collect();
    for row in cells.iter() {
        for (w, c) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(c.chars().count());
        }
    }
    let line = |vals: &[String]| {
        vals.iter().zip(widths.iter()).map(|(v, w)| format!("{v:<width$}", width = *w)).collect::<Vec<_>>().join("  ")
    };
    println!("{}", line(&page.columns.iter().map(|c| c.to_uppercase()).collect::<Vec<_>>()).trim_end());
    for row in cells.iter() {
        println!("{}", line(row).trim_end());
    }
}

#[derive(Serialize)]
struct ViewOut<'a> {
    page: &'a PageView,
    window: &'a [PageItem],
    state: &'a ViewState,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = EngineConfig::from_env();

    match cli.command {
        Commands::View { source, sort, page, page_size, hide, radius, save_state } => {
            info!(file = %source.file.display(), "view invoked");
            let mut engine = open(&source, config)?;
            if !sort.is_empty() {
                let keys = sort.iter().map(|s| parse_sort(s)).collect::<Result<Vec<_>>>()?;
                engine.set_sort(keys).context("--sort")?;
            }
            for col in hide.iter() {
                engine.set_column_visibility(col, false).with_context(|| format!("--hide {col}"))?;
            }
            if let Some(n) = page_size {
                engine.set_page_size(n).context("--page-size")?;
            }
            if page == 0 {
                bail!("--page is 1-based");
            }
            engine.set_page(page - 1);
            let view = engine.page()?;
            let window = engine.page_window(radius.unwrap_or(config.window_radius))?;
            if let Some(path) = &save_state {
                let json = serde_json::to_string_pretty(engine.view_state())?;
                std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            }
            match cli.output {
                Output::Human => {
                    print_table(&view);
                    if view.page_count == 0 {
                        println!("(no matching rows)");
                    } else {
                        println!();
                        println!("page {}/{} • {} rows • {}", view.index + 1, view.page_count, view.total_rows, render_window(&window, view.index + 1));
                    }
                }
                Output::Json => {
                    let out = ViewOut { page: &view, window: &window, state: engine.view_state() };
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
            }
        }
        Commands::Facet { source, column } => {
            info!(file = %source.file.display(), column = %column, "facet invoked");
            let engine = open(&source, config)?;
            let facet = engine.facet(&column)?;
            match cli.output {
                Output::Human => match &facet {
                    Facet::Unique(values) => {
                        let width = values.iter().map(|v| v.value.to_string().chars().count()).max().unwrap_or(0);
                        for v in values {
                            println!("{:<width$}  {}", v.value.to_string(), v.count);
                        }
                    }
                    Facet::Range(Some((lo, hi))) => println!("{}..{}", Value::Number(*lo), Value::Number(*hi)),
                    Facet::Range(None) => println!("(no values)"),
                },
                Output::Json => println!("{}", serde_json::to_string_pretty(&facet)?),
            }
        }
        Commands::Window { current, total, radius } => {
            let items = tabula_view::page_window(current, total, radius)?;
            match cli.output {
                Output::Human => println!("{}", render_window(&items, current)),
                Output::Json => println!("{}", serde_json::to_string(&items)?),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flag_values() {
        assert_eq!(parse_filter("name=an=a").unwrap(), ("name".to_string(), "an=a".to_string()));
        assert!(parse_filter("name").is_err());
        assert_eq!(parse_range("age=18..65").unwrap(), ("age".to_string(), 18.0, 65.0));
        assert_eq!(parse_range("age=..5").unwrap(), ("age".to_string(), f64::NEG_INFINITY, 5.0));
        assert!(parse_range("age=x..1").is_err());
        assert_eq!(parse_sort("age:DESC").unwrap(), SortKey::desc("age"));
        assert_eq!(parse_sort("name").unwrap(), SortKey::asc("name"));
        assert!(parse_sort("name:up").is_err());
    }

    #[test]
    fn window_marks_current_page() {
        let items = tabula_view::page_window(5, 10, 2).unwrap();
        assert_eq!(render_window(&items, 5), "1 … 3 4 [5] 6 7 … 10");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
