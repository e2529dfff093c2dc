use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use sheetgate::pipeline::{run, RunOptions, RunStatus};
use sheetgate_spec::DiagnosticSink;

/// Validate a spreadsheet against a TOML schema and export typed JSON.
///
/// Both file names are resolved against the data directory; the sheet named
/// after the schema file (without extension) is validated, and on success
/// `<out-dir>/<schema>.json` is written.
#[derive(Parser, Debug)]
#[command(name = "sheetgate", version, about)]
struct Cli {
    /// Spreadsheet file name (e.g. sample.xlsx).
    workbook: PathBuf,

    /// Schema file name (e.g. item.toml).
    schema: PathBuf,

    /// Directory containing the workbook and schema files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory the JSON export is written to.
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// Emit compact JSON instead of pretty-printed.
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let opts = RunOptions {
        workbook_path: cli.data_dir.join(&cli.workbook),
        schema_path: cli.data_dir.join(&cli.schema),
        out_dir: cli.out_dir,
        pretty: !cli.compact,
    };

    let mut sink = DiagnosticSink::new();
    let mut stdout = io::stdout().lock();
    let status = run(&opts, &mut sink, &mut stdout).context("failed to complete the run")?;

    Ok(match status {
        RunStatus::Exported { .. } => ExitCode::SUCCESS,
        RunStatus::Blocked => ExitCode::FAILURE,
    })
}
