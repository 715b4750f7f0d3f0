pub mod atd;
pub mod cell;
pub mod cli;
pub mod context;
pub mod datatype;
pub mod dialect_extract;
pub mod error;
pub mod fetch;
pub mod io_utils;
pub mod metadata;
pub mod rows;
pub mod table;
pub mod uri_template;
pub mod value;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use anyhow::{Context as _, Result, bail};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use log::{LevelFilter, error, info, warn};
use serde_json::Value as Json;

use crate::cli::{AtdArgs, Cli, Commands, ProbeArgs, ValidateArgs};
use crate::context::Context;
use crate::error::Diagnostics;
use crate::fetch::FileFetcher;
use crate::metadata::node::{DialectData, NodeKind, Trim};
use crate::metadata::parse::{Metadata, ParseOptions};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if std::env::var("RUST_LOG").is_err() {
            builder.filter_module("csvw", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => run_operation("validate", || run_validate(&args)),
        Commands::Atd(args) => run_operation("atd", || run_atd(&args)),
        Commands::Probe(args) => run_operation("probe", || run_probe(&args)),
    }
}

/// Wraps a subcommand with start/end/duration logging, matching the
/// teacher's `lib.rs::run_operation` helper.
fn run_operation<F>(name: &str, op: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let start_clock = Utc::now();
    let start_instant = Instant::now();
    let result = op();
    let end_clock = Utc::now();
    let duration_secs = start_instant.elapsed().as_secs_f64();
    let start_str = start_clock.to_rfc3339_opts(SecondsFormat::Millis, true);
    let end_str = end_clock.to_rfc3339_opts(SecondsFormat::Millis, true);

    match &result {
        Ok(_) => info!(
            "Operation '{name}' completed (status=ok)\nstart: {start_str}\nend: {end_str}\nduration_secs: {duration_secs:.3}"
        ),
        Err(err) => error!(
            "Operation '{name}' failed (status=error)\nstart: {start_str}\nend: {end_str}\nduration_secs: {duration_secs:.3}\nerror: {err:?}"
        ),
    }

    result
}

fn parse_options_for(args_default_language: Option<&str>, base_url: Option<url::Url>) -> ParseOptions {
    ParseOptions {
        base_url,
        default_language: args_default_language.map(|l| l.to_string()),
        strict: false,
    }
}

fn file_base_url(path: &Path) -> url::Url {
    url::Url::from_file_path(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()))
        .unwrap_or_else(|_| url::Url::parse("file:///").unwrap())
}

fn load_metadata_document(path: &Path) -> Result<Json> {
    let bytes = fs::read(path).with_context(|| format!("reading metadata document {path:?}"))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing metadata document {path:?} as JSON"))
}

fn run_validate(args: &ValidateArgs) -> Result<()> {
    let mut diagnostics = Diagnostics::new();
    let metadata = match (&args.metadata, &args.input) {
        (Some(metadata_path), _) => {
            let json = load_metadata_document(metadata_path)?;
            let options = parse_options_for(args.default_language.as_deref(), Some(file_base_url(metadata_path)));
            Metadata::parse(&json, &options, &mut diagnostics)?
        }
        (None, Some(input)) => {
            let dir = input.parent().unwrap_or_else(|| Path::new("."));
            let fetcher = FileFetcher::new(dir);
            let file_name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let options = parse_options_for(args.default_language.as_deref(), None);
            match Metadata::for_input(file_name, None, &fetcher, &options, &mut diagnostics) {
                Ok(metadata) => metadata,
                Err(_) => {
                    warn!("no linked metadata document found for {input:?}, inferring from the CSV header");
                    let file = io_utils::open_input(input)?;
                    let url = input.to_string_lossy().to_string();
                    let extracted = dialect_extract::embedded_metadata(file, &DialectData::default(), &url)?;
                    Metadata { arena: extracted.arena, root: extracted.table, context: Context::default() }
                }
            }
        }
        (None, None) => bail!("validate requires either --metadata or --input"),
    };

    let normalized = metadata.normalize();
    let errors = metadata::validate::validate(&normalized);

    for warning in diagnostics.warnings() {
        warn!("{warning}");
    }
    if !errors.is_empty() {
        let rows = errors
            .iter()
            .enumerate()
            .map(|(i, message)| vec![(i + 1).to_string(), message.clone()])
            .collect::<Vec<_>>();
        table::print_table(&["#".to_string(), "error".to_string()], &rows);
    }
    if errors.is_empty() {
        info!("metadata document is valid ({} warning(s))", diagnostics.warnings().len());
        Ok(())
    } else if args.strict && !diagnostics.is_empty() {
        bail!("{} validation error(s), {} warning(s) (strict mode)", errors.len(), diagnostics.warnings().len())
    } else {
        bail!("{} validation error(s)", errors.len())
    }
}

fn resolve_table_path(metadata_dir: &Path, url: &str) -> PathBuf {
    if let Ok(parsed) = url::Url::parse(url)
        && let Ok(path) = parsed.to_file_path()
    {
        return path;
    }
    let candidate = Path::new(url);
    if candidate.is_absolute() { candidate.to_path_buf() } else { metadata_dir.join(candidate) }
}

fn run_atd(args: &AtdArgs) -> Result<()> {
    let mut diagnostics = Diagnostics::new();
    let json = load_metadata_document(&args.metadata)?;
    let options = parse_options_for(None, Some(file_base_url(&args.metadata)));
    let metadata = Metadata::parse(&json, &options, &mut diagnostics)?;
    let normalized = metadata.normalize();
    for warning in diagnostics.warnings() {
        warn!("{warning}");
    }

    let mut document = atd::metadata_to_atd(&normalized);
    let mut cell_error_rows: Vec<Vec<String>> = Vec::new();

    if args.rows {
        let NodeKind::TableGroup(group) = &normalized.arena.node(normalized.root).kind else {
            bail!("metadata document root is not a TableGroup");
        };
        let metadata_dir = args.metadata.parent().unwrap_or_else(|| Path::new("."));
        let tables = document
            .get_mut("tables")
            .and_then(|t| t.as_array_mut())
            .ok_or_else(|| anyhow::anyhow!("rendered ATD is missing a 'tables' array"))?;

        for (table_id, table_json) in group.tables.iter().zip(tables.iter_mut()) {
            let NodeKind::Table(table) = &normalized.arena.node(*table_id).kind else { continue };
            let path = resolve_table_path(metadata_dir, &table.url);
            let file = match io_utils::open_input(&path) {
                Ok(file) => file,
                Err(err) => {
                    warn!("skipping rows for table {:?}: {err}", table.url);
                    continue;
                }
            };
            let mut rows = Vec::new();
            let limit = args.limit;
            rows::each_row(&normalized, *table_id, file, |event| {
                if let rows::RowEvent::Row(row) = event {
                    for cell in &row.cells {
                        for message in &cell.errors {
                            cell_error_rows.push(vec![
                                table.url.clone(),
                                row.source_number.to_string(),
                                message.clone(),
                            ]);
                        }
                    }
                    if limit == 0 || rows.len() < limit {
                        rows.push(atd::row_to_atd(&normalized.arena, &row));
                    }
                }
                Ok(())
            })?;
            if let Some(obj) = table_json.as_object_mut() {
                obj.insert("rows".to_string(), Json::Array(rows));
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&document)?);

    if !cell_error_rows.is_empty() {
        let headers = ["table".to_string(), "row".to_string(), "error".to_string()];
        eprintln!("{}", table::render_table(&headers, &cell_error_rows));
    }
    Ok(())
}

fn run_probe(args: &ProbeArgs) -> Result<()> {
    let dialect = DialectData {
        delimiter: args.delimiter.map(|d| d as char).unwrap_or(','),
        header_row_count: args.header_row_count,
        skip_rows: args.skip_rows,
        comment_prefix: args.comment_prefix,
        trim: Trim::True,
        encoding: args.input_encoding.clone().unwrap_or_else(|| "utf-8".to_string()),
        ..DialectData::default()
    };
    let file = io_utils::open_input(&args.input)?;
    let url = args.input.to_string_lossy().to_string();
    let extracted = dialect_extract::embedded_metadata(file, &dialect, &url)?;
    let document = atd::node_to_atd(&extracted.arena, extracted.table);
    println!("{}", serde_json::to_string_pretty(&document)?);
    for comment in &extracted.comments {
        info!("comment: {comment}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_table_path_joins_relative_url_to_metadata_directory() {
        let resolved = resolve_table_path(Path::new("/data/tables"), "people.csv");
        assert_eq!(resolved, Path::new("/data/tables/people.csv"));
    }

    #[test]
    fn resolve_table_path_leaves_absolute_path_untouched() {
        let resolved = resolve_table_path(Path::new("/data/tables"), "/tmp/people.csv");
        assert_eq!(resolved, Path::new("/tmp/people.csv"));
    }
}
