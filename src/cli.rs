//! Command-line surface over the CSVW core (`spec.md` §6's
//! `Metadata`/`Dialect`/row-iteration entry points), built the way the
//! teacher's `cli.rs` lays out one `Args` struct per subcommand.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Inspect and validate CSV on the Web (CSVW) tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse and validate a CSVW metadata document (or discover one for a CSV file)
    Validate(ValidateArgs),
    /// Render a metadata document's annotated table group as JSON, optionally with row data
    Atd(AtdArgs),
    /// Infer table metadata directly from a CSV file's header, with no metadata document
    Probe(ProbeArgs),
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Explicit metadata document (JSON) to validate
    #[arg(short = 'm', long = "metadata")]
    pub metadata: Option<PathBuf>,
    /// CSV file to validate via linked-metadata discovery (describedby link, `-metadata.json`, `metadata.json`)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Treat metadata warnings (invalid property values reverted to defaults) as errors
    #[arg(long)]
    pub strict: bool,
    /// BCP47 language tag to use when a document has no explicit default language
    #[arg(long = "default-language")]
    pub default_language: Option<String>,
}

#[derive(Debug, Args)]
pub struct AtdArgs {
    /// Metadata document (JSON) describing the table group
    #[arg(short = 'm', long = "metadata")]
    pub metadata: PathBuf,
    /// Also interpret each table's data rows and nest them under the table's ATD
    #[arg(long)]
    pub rows: bool,
    /// Maximum rows to interpret per table when `--rows` is set (0 means no limit)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Number of header rows
    #[arg(long = "header-row-count", default_value_t = 1)]
    pub header_row_count: usize,
    /// Number of leading rows to skip before the header
    #[arg(long = "skip-rows", default_value_t = 0)]
    pub skip_rows: usize,
    /// Comment-line prefix, e.g. '#'
    #[arg(long = "comment-prefix")]
    pub comment_prefix: Option<char>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
