use std::collections::HashSet;

use sheetgate_spec::DiagnosticSink;

/// View over a raw cell matrix, split at the schema's header row.
///
/// The row at `header_row` (1-based) becomes the header; everything after it
/// becomes data. The view is immutable once built.
#[derive(Debug)]
pub struct TableView {
    source: String,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableView {
    /// Slice `matrix` at the 1-based `header_row`.
    ///
    /// Returns `None` (with a fatal diagnostic) when the offset falls outside
    /// the matrix; a header offset that points past the sheet means the
    /// schema and sheet disagree and nothing later can be trusted. Duplicate
    /// header names are reported as one aggregated error, but the view is
    /// still returned so the flush at the stage boundary carries the message.
    pub fn build(
        source: &str,
        matrix: Vec<Vec<String>>,
        header_row: u32,
        sink: &mut DiagnosticSink,
    ) -> Option<TableView> {
        let offset = header_row as usize;
        if offset == 0 || offset > matrix.len() {
            sink.error(format!(
                "{source}: start_param {header_row} is beyond the sheet's last row ({})",
                matrix.len()
            ));
            return None;
        }

        let mut remaining = matrix.into_iter().skip(offset - 1);
        let header = remaining.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = remaining.collect();

        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for name in &header {
            if !seen.insert(name.as_str()) && !duplicates.contains(&name.as_str()) {
                duplicates.push(name.as_str());
            }
        }
        if !duplicates.is_empty() {
            sink.error(format!(
                "{source}: duplicate header names: {}",
                duplicates.join(", ")
            ));
        }

        Some(TableView {
            source: source.to_string(),
            header,
            rows,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Position of the named column in the header, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Values of the named column in row order, or empty when the column is
    /// absent. Absence is not an error here; the validator's existence check
    /// reports all missing parameters at once instead of failing on the
    /// first lookup.
    pub fn column(&self, name: &str) -> Vec<&str> {
        match self.column_index(name) {
            Some(idx) => self
                .rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
            None => Vec::new(),
        }
    }
}
