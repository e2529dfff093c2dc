use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sheetgate_spec::{DiagnosticSink, Schema, StageOutcome};
use thiserror::Error;

use crate::convert::convert;
use crate::table::TableView;
use crate::validate::Validator;
use crate::workbook::load_sheet;

/// Inputs for one validation/export run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workbook_path: PathBuf,
    pub schema_path: PathBuf,
    /// Directory the JSON file is written to (created if missing).
    pub out_dir: PathBuf,
    pub pretty: bool,
}

/// Outcome of a run. Blocking is a normal result, not an `Err`: every detail
/// has already been written to the diagnostic output, and the caller only
/// has to map the status to an exit code.
#[derive(Debug, PartialEq, Eq)]
pub enum RunStatus {
    Exported { path: PathBuf, rows: usize },
    Blocked,
}

/// Failures while reading and parsing the schema file itself. Data-shape
/// problems inside a syntactically valid schema are diagnostics, not errors;
/// this type only covers the file being absent or unparsable.
#[derive(Debug, Error)]
pub enum SchemaFileError {
    #[error("no such file")]
    Missing,
    #[error("schema syntax error: {0}")]
    Syntax(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn load_schema_tree(path: &Path) -> Result<toml::Value, SchemaFileError> {
    if !path.exists() {
        return Err(SchemaFileError::Missing);
    }
    let text = fs::read_to_string(path)?;
    Ok(text.parse()?)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run the full pipeline: schema load, sheet load, table slicing, the
/// four-check battery, the warning gate, and finally JSON export.
///
/// The sink is flushed to `out` at every stage boundary so fatal findings
/// surface as early as possible; any flushed error stops the run and nothing
/// is written. After the battery, any warning ever recorded blocks the
/// export too — warnings are advisory in wording but release-gating by
/// policy, so authors fix the complete list in one round. `Err` is reserved
/// for I/O failures of the diagnostic writer or the output file; the library
/// never terminates the process.
pub fn run<W: Write>(
    opts: &RunOptions,
    sink: &mut DiagnosticSink,
    out: &mut W,
) -> io::Result<RunStatus> {
    // Stage 1: schema.
    let schema_name = base_name(&opts.schema_path);
    let tree = match load_schema_tree(&opts.schema_path) {
        Ok(tree) => Some(tree),
        Err(err) => {
            sink.error(format!("{}: {err}", opts.schema_path.display()));
            None
        }
    };
    let schema = tree.map(|tree| Schema::from_toml(&schema_name, &tree, sink));
    if sink.flush(out)? == StageOutcome::Abort {
        return Ok(RunStatus::Blocked);
    }
    // The flush continued, so the schema file was read and parsed.
    let Some(schema) = schema else {
        return Ok(RunStatus::Blocked);
    };

    // Stage 2: workbook sheet, selected by the schema file's base name.
    let sheet = stem(&opts.schema_path);
    let matrix = match load_sheet(&opts.workbook_path, &sheet) {
        Ok(matrix) => matrix,
        Err(err) => {
            sink.error(format!("{}: {err}", opts.workbook_path.display()));
            sink.flush(out)?;
            return Ok(RunStatus::Blocked);
        }
    };

    // Stage 3: header slicing.
    let table = TableView::build(&base_name(&opts.workbook_path), matrix, schema.header_row, sink);
    if sink.flush(out)? == StageOutcome::Abort {
        return Ok(RunStatus::Blocked);
    }
    let Some(table) = table else {
        return Ok(RunStatus::Blocked);
    };

    // Stage 4: the battery, flushed per group.
    let validator = Validator::new(&schema, &table);
    validator.check_existence(sink);
    if sink.flush(out)? == StageOutcome::Abort {
        return Ok(RunStatus::Blocked);
    }
    validator.check_types(sink);
    if sink.flush(out)? == StageOutcome::Abort {
        return Ok(RunStatus::Blocked);
    }
    validator.check_unique(sink);
    if sink.flush(out)? == StageOutcome::Abort {
        return Ok(RunStatus::Blocked);
    }
    validator.check_range(sink);
    if sink.flush(out)? == StageOutcome::Abort {
        return Ok(RunStatus::Blocked);
    }

    // Stage 5: the warning gate.
    if sink.warned() {
        sink.error("validation failed: fix the warnings above and re-run");
        sink.flush(out)?;
        return Ok(RunStatus::Blocked);
    }

    // Stage 6: convert and export.
    let records = convert(&schema, &table);
    let json = if opts.pretty {
        serde_json::to_string_pretty(&records)
    } else {
        serde_json::to_string(&records)
    }
    .map_err(io::Error::from)?;

    fs::create_dir_all(&opts.out_dir)?;
    let path = opts.out_dir.join(format!("{}.json", stem(&opts.schema_path)));
    fs::write(&path, json)?;

    let rows = records.len();
    writeln!(out, "wrote {rows} rows to {}", path.display())?;
    Ok(RunStatus::Exported { path, rows })
}
