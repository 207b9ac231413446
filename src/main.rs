// sqldumpjson CLI: convert an INSERT dump to JSON, compact it, mirror it into
// SQLite, and recount records from either side for acceptance checks.

use clap::{CommandFactory, Parser, Subcommand};
use sqldumpjson::config::Config;
use sqldumpjson::dump::DumpText;
use sqldumpjson::parser::TableSet;
use sqldumpjson::pipeline::{parse_dump, ParseOptions};
use sqldumpjson::progress::ProgressManager;
use sqldumpjson::report::{self, SizeDelta};
use sqldumpjson::store::SqliteWriter;
use sqldumpjson::{logger, Diagnostics};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Enable debug logging (disables progress bars).
    #[arg(long, global = true)]
    debug: bool,

    /// Disable progress bars.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Threads used to decode statements (0 = num CPU).
    #[arg(long, global = true, default_value_t = 0)]
    workers: usize,

    /// JSON config file (key map, dropped fields, exclusions, indexed columns).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a machine-readable run summary to this file.
    #[arg(long, global = true)]
    summary_json: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an SQL dump into a JSON object of tables.
    Convert {
        dump: PathBuf,
        output: PathBuf,
        /// Write JSON without whitespace.
        #[arg(long)]
        minify: bool,
        /// Apply key compaction before writing.
        #[arg(long)]
        compact: bool,
    },
    /// Rename and drop keys in an existing JSON table file (output is minified).
    Compact { input: PathBuf, output: PathBuf },
    /// Mirror a JSON table file into a SQLite database (replaces the output file).
    Store { input: PathBuf, output: PathBuf },
    /// Count records per table directly from an SQL dump.
    Count { dump: PathBuf },
    /// Compare per-table counts between an SQL dump and a JSON table file.
    Compare {
        dump: PathBuf,
        json: PathBuf,
        /// Also compare record counts grouped by a column, as `table.column`.
        #[arg(long)]
        group_by: Option<String>,
    },
}

fn main() {
    if std::env::args().len() == 1 {
        let _ = Args::command().print_help();
        eprintln!();
        std::process::exit(1);
    }
    let args = Args::parse();
    logger::set_debug(args.debug);

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            logger::error(&e.to_string());
            std::process::exit(1);
        }
    }
}

// Returns Ok(false) when a comparison found differences.
fn run(args: Args) -> Result<bool, BoxError> {
    let wall_start = Instant::now();
    let config = Config::load(args.config.as_deref())?;
    // Progress bars are disabled in debug mode to avoid mangled output.
    let progress = ProgressManager::new(!args.debug && !args.no_progress);
    let options = ParseOptions {
        workers: args.workers,
        values_lookahead: config.values_lookahead,
    };

    let mut summary = serde_json::Map::new();
    let mut all_match = true;

    match args.command {
        Command::Convert {
            dump,
            output,
            minify,
            compact,
        } => {
            logger::debug(&format!("main: converting {} -> {}", dump.display(), output.display()));
            let text = DumpText::open(&dump)?;
            let bar = progress.new_scan_bar(text.len() as u64, &format!("Scan {}", basename(&dump)));
            let parsed = parse_dump(text.as_str(), &options, bar.as_ref())?;
            drop(text);

            let tables = if compact {
                config.compactor().compact(parsed.tables)
            } else {
                parsed.tables
            };
            std::fs::write(&output, tables.to_json(!minify)?)?;

            let sizes = SizeDelta {
                before: file_size(&dump),
                after: file_size(&output),
            };
            print_diagnostics(&parsed.diagnostics);
            print_table_counts(&report::table_counts(&tables))?;
            print_sizes("Dump", "JSON", &sizes)?;
            summary.insert("diagnostics".into(), serde_json::to_value(&parsed.diagnostics)?);
            summary.insert("tables".into(), serde_json::to_value(report::table_counts(&tables))?);
            summary.insert("sizes".into(), serde_json::to_value(sizes)?);
        }
        Command::Compact { input, output } => {
            let tables = load_tables(&input)?;
            let tables = config.compactor().compact(tables);
            std::fs::write(&output, tables.to_json(false)?)?;
            let sizes = SizeDelta {
                before: file_size(&input),
                after: file_size(&output),
            };
            print_table_counts(&report::table_counts(&tables))?;
            print_sizes("Original", "Compacted", &sizes)?;
            summary.insert("tables".into(), serde_json::to_value(report::table_counts(&tables))?);
            summary.insert("sizes".into(), serde_json::to_value(sizes)?);
        }
        Command::Store { input, output } => {
            let tables = load_tables(&input)?;
            let projector = config.projector();
            let writer = SqliteWriter::new(&projector, &config.index_columns);
            let bar = progress.new_table_bar(tables.len() as u64, "Storing tables");
            let stored = writer.write(&output, &tables, bar.as_ref())?;
            let sizes = SizeDelta {
                before: file_size(&input),
                after: file_size(&output),
            };
            let counts: indexmap::IndexMap<String, usize> = stored
                .tables
                .iter()
                .map(|(k, v)| (k.clone(), *v as usize))
                .collect();
            print_table_counts(&counts)?;
            print_sizes("JSON", "Database", &sizes)?;
            summary.insert("store".into(), serde_json::to_value(&stored)?);
            summary.insert("sizes".into(), serde_json::to_value(sizes)?);
        }
        Command::Count { dump } => {
            let text = DumpText::open(&dump)?;
            let counts = report::count_rows(text.as_str(), options.values_lookahead);
            print_table_counts(&counts)?;
            summary.insert("tables".into(), serde_json::to_value(&counts)?);
        }
        Command::Compare {
            dump,
            json,
            group_by,
        } => {
            let text = DumpText::open(&dump)?;
            let sql_counts = report::count_rows(text.as_str(), options.values_lookahead);
            let tables = load_tables(&json)?;
            let diffs = report::compare_counts(&sql_counts, &report::table_counts(&tables));
            all_match = diffs.iter().all(|d| d.matches());
            print_count_diffs(&diffs)?;
            summary.insert("counts".into(), serde_json::to_value(&diffs)?);

            if let Some(group) = group_by {
                let (table, column) = group
                    .split_once('.')
                    .ok_or_else(|| format!("--group-by expects table.column, got {}", group))?;
                let parsed = parse_dump(text.as_str(), &options, None)?;
                let sql_groups = report::group_counts(parsed.tables.get(table).unwrap_or(&[]), column);
                let json_groups = report::group_counts(tables.get(table).unwrap_or(&[]), column);
                let groups = report::compare_counts(
                    &sql_groups.into_iter().collect(),
                    &json_groups.into_iter().collect(),
                );
                all_match &= groups.iter().all(|d| d.matches());
                print_count_diffs(&groups)?;
                summary.insert("groups".into(), serde_json::to_value(&groups)?);
            }

            let sep = "=".repeat(60);
            let mut stderr = io::stderr();
            if all_match {
                writeln!(stderr, "{}\nAll counts match\n{}", sep, sep)?;
            } else {
                writeln!(stderr, "{}\nCounts differ between dump and JSON\n{}", sep, sep)?;
            }
        }
    }

    if let Some(path) = args.summary_json.as_ref() {
        summary.insert("wall_ms".into(), serde_json::json!(wall_start.elapsed().as_millis() as u64));
        let json = serde_json::to_string_pretty(&serde_json::Value::Object(summary))?;
        std::fs::write(path, json)?;
    }
    logger::debug(&format!("Timing: total wall time {:?}", wall_start.elapsed()));
    Ok(all_match)
}

fn load_tables(path: &Path) -> Result<TableSet, BoxError> {
    logger::debug(&format!("main: loading {}", path.display()));
    let text = std::fs::read_to_string(path)?;
    TableSet::from_json_str(&text).map_err(|e| format!("{}: {}", path.display(), e).into())
}

fn print_diagnostics(diag: &Diagnostics) {
    logger::info(&format!(
        "Parsed {} statements, {} rows, {} records",
        diag.statements, diag.rows, diag.records
    ));
    if diag.dropped_statements() > 0 {
        logger::info(&format!("Dropped {} malformed statements", diag.dropped_statements()));
    }
    if diag.mismatches() > 0 {
        logger::info(&format!("Skipped {} rows with a wrong value count", diag.mismatches()));
    }
    if diag.structured_fallbacks > 0 {
        logger::info(&format!(
            "Kept {} JSON-looking values as text",
            diag.structured_fallbacks
        ));
    }
    for issue in &diag.issues {
        logger::debug(&issue.to_string());
    }
}

fn print_table_counts(counts: &indexmap::IndexMap<String, usize>) -> io::Result<()> {
    let sep = "=".repeat(60);
    let mut stderr = io::stderr();
    writeln!(stderr, "\n{}\nRECORDS\n{}", sep, sep)?;
    for (table, count) in counts {
        writeln!(stderr, "{:<30} {:>10}", table, count)?;
    }
    writeln!(stderr, "{}", sep)
}

fn print_count_diffs(diffs: &[report::CountDiff]) -> io::Result<()> {
    let sep = "-".repeat(70);
    let mut stderr = io::stderr();
    writeln!(stderr, "{:<30} {:>12} {:>12} {:>8}", "Table", "SQL", "JSON", "Match")?;
    writeln!(stderr, "{}", sep)?;
    for d in diffs {
        let mark = if d.matches() { "yes" } else { "NO" };
        writeln!(stderr, "{:<30} {:>12} {:>12} {:>8}", d.table, d.sql, d.json, mark)?;
    }
    writeln!(stderr, "{}", sep)
}

fn print_sizes(before: &str, after: &str, sizes: &SizeDelta) -> io::Result<()> {
    let mut stderr = io::stderr();
    writeln!(stderr, "{:<12} {:>10.2} MB", before, report::mib(sizes.before))?;
    writeln!(stderr, "{:<12} {:>10.2} MB", after, report::mib(sizes.after))?;
    writeln!(stderr, "{:<12} {:>10.1}%", "Reduction", sizes.reduction_pct())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn basename(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}
