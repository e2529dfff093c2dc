use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use thiserror::Error;

/// Failures while turning a workbook file into a cell matrix.
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("no such file")]
    Missing,
    #[error("sheet `{0}` not found")]
    MissingSheet(String),
    #[error(transparent)]
    Read(#[from] XlsxError),
}

/// Load one sheet as a rectangular matrix of strings.
///
/// Rows and columns before the sheet's used range are padded with empty
/// strings so 1-based spreadsheet coordinates survive the conversion; every
/// row has the same width.
pub fn load_sheet(path: &Path, sheet: &str) -> Result<Vec<Vec<String>>, WorkbookError> {
    if !path.exists() {
        return Err(WorkbookError::Missing);
    }

    let mut workbook: Xlsx<BufReader<File>> = open_workbook(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(WorkbookError::MissingSheet(sheet.to_string()));
    }
    let range = workbook.worksheet_range(sheet)?;

    let (top, left) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));
    let width = left + range.width();

    let mut matrix: Vec<Vec<String>> = vec![vec![String::new(); width]; top];
    for row in range.rows() {
        let mut cells = Vec::with_capacity(width);
        cells.resize(left, String::new());
        cells.extend(row.iter().map(cell_text));
        matrix.push(cells);
    }
    Ok(matrix)
}

/// Normalize one cell to its textual form. Numbers render via `Display`
/// (so an Excel-stored `2.0` reads back as `2`), booleans as `true`/`false`,
/// empty cells as `""`.
fn cell_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Error(e) => e.to_string(),
    }
}
