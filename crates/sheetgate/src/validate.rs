use std::collections::HashSet;
use std::path::Path;

use sheetgate_spec::{DiagnosticSink, RangeCheck, Schema};

use crate::table::TableView;

/// Runs the fixed-order battery of checks against a schema/table pair.
///
/// The order is existence, type, uniqueness, range; each check is evaluated
/// in full before the next so every diagnostic of a kind is collected
/// together. No check short-circuits another — the caller flushes the sink
/// between groups and decides whether to continue.
pub struct Validator<'a> {
    schema: &'a Schema,
    table: &'a TableView,
    /// `workbook@sheet` prefix attributing every finding.
    context: String,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a Schema, table: &'a TableView) -> Self {
        let sheet = Path::new(&schema.source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| schema.source.clone());
        let context = format!("{}@{sheet}", table.source());
        Self {
            schema,
            table,
            context,
        }
    }

    /// Existence check, one-directional by policy: every schema parameter
    /// must appear in the table header, while extra header columns are
    /// tolerated (they are skipped at conversion). Missing names aggregate
    /// into a single error.
    pub fn check_existence(&self, sink: &mut DiagnosticSink) {
        let header: HashSet<&str> = self.table.header().iter().map(String::as_str).collect();
        let missing: Vec<&str> = self
            .schema
            .params
            .iter()
            .map(|p| p.name.as_str())
            .filter(|name| !header.contains(name))
            .collect();
        if !missing.is_empty() {
            sink.error(format!(
                "{}: parameters missing from the header row: [{}] (is start_param correct?)",
                self.context,
                missing.join(", ")
            ));
        }
    }

    /// Predict whether every cell converts to its parameter's declared type.
    /// Failures are warnings; nothing is mutated here.
    pub fn check_types(&self, sink: &mut DiagnosticSink) {
        for param in &self.schema.params {
            let Some(col) = self.table.column_index(&param.name) else {
                continue;
            };
            for (row, cell) in self.table.column(&param.name).into_iter().enumerate() {
                if !param.ty.accepts(cell) {
                    sink.warn(format!(
                        "{}: [{}] `{cell}` is not a valid {}",
                        self.context,
                        self.cell_label(col, row),
                        param.ty
                    ));
                }
            }
        }
    }

    /// For `unique` parameters, warn on the second and later occurrence of
    /// each value.
    pub fn check_unique(&self, sink: &mut DiagnosticSink) {
        for param in self.schema.params.iter().filter(|p| p.unique) {
            let Some(col) = self.table.column_index(&param.name) else {
                continue;
            };
            let mut seen = HashSet::new();
            for (row, cell) in self.table.column(&param.name).into_iter().enumerate() {
                if !seen.insert(cell) {
                    sink.warn(format!(
                        "{}: [{}] duplicate value `{cell}` for unique parameter `{}`",
                        self.context,
                        self.cell_label(col, row),
                        param.name
                    ));
                }
            }
        }
    }

    /// Inclusive bound check for range-constrained parameters. A cell that
    /// does not parse cannot be range-checked and is warned about instead.
    pub fn check_range(&self, sink: &mut DiagnosticSink) {
        for param in &self.schema.params {
            let Some(bounds) = param.range else { continue };
            let Some(col) = self.table.column_index(&param.name) else {
                continue;
            };
            for (row, cell) in self.table.column(&param.name).into_iter().enumerate() {
                match bounds.check(cell) {
                    RangeCheck::Pass => {}
                    RangeCheck::OutOfBounds => sink.warn(format!(
                        "{}: [{}] `{cell}` is outside the allowed range {bounds}",
                        self.context,
                        self.cell_label(col, row)
                    )),
                    RangeCheck::Unparseable => sink.warn(format!(
                        "{}: [{}] `{cell}` cannot be range-checked",
                        self.context,
                        self.cell_label(col, row)
                    )),
                }
            }
        }
    }

    /// A1-style label for the cell at 0-based column `col` and 0-based data
    /// row `row` (data rows start right below the header).
    fn cell_label(&self, col: usize, row: usize) -> String {
        let sheet_row = self.schema.header_row as usize + 1 + row;
        format!("{}{sheet_row}", column_letters(col))
    }
}

/// 0-based column index to spreadsheet letters (0 -> A, 25 -> Z, 26 -> AA).
fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetgate_spec::{Severity, SinkState};

    fn schema(text: &str) -> Schema {
        let root: toml::Value = text.parse().expect("test schema must parse");
        let mut sink = DiagnosticSink::new();
        let schema = Schema::from_toml("item.toml", &root, &mut sink);
        assert_eq!(sink.state(), SinkState::Clean, "test schema must be valid");
        schema
    }

    fn table(rows: &[&[&str]]) -> TableView {
        let matrix = rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        let mut sink = DiagnosticSink::new();
        TableView::build("sample.xlsx", matrix, 1, &mut sink).unwrap()
    }

    fn messages(sink: &DiagnosticSink, severity: Severity) -> Vec<String> {
        sink.pending()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn existence_aggregates_missing_parameters_into_one_error() {
        let schema = schema(
            r#"
            start_param = 1
            [[params]]
            name = "id"
            type = "int"
            [[params]]
            name = "hp"
            type = "int"
            [[params]]
            name = "label"
            type = "string"
            "#,
        );
        let table = table(&[&["label", "extra"], &["a", "x"]]);

        let mut sink = DiagnosticSink::new();
        Validator::new(&schema, &table).check_existence(&mut sink);

        let errors = messages(&sink, Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("sample.xlsx@item"));
        assert!(errors[0].contains("[id, hp]"));
        // One-directional policy: the extra header column is not flagged.
        assert!(!errors[0].contains("extra"));
    }

    #[test]
    fn type_check_warns_per_bad_cell_with_its_coordinate() {
        let schema = schema(
            r#"
            start_param = 1
            [[params]]
            name = "id"
            type = "int"
            "#,
        );
        let table = table(&[&["id"], &["1"], &["two"], &["3.5"]]);

        let mut sink = DiagnosticSink::new();
        Validator::new(&schema, &table).check_types(&mut sink);

        let warnings = messages(&sink, Severity::Warning);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("[A3] `two` is not a valid int"));
        assert!(warnings[1].contains("[A4] `3.5` is not a valid int"));
    }

    #[test]
    fn unique_check_flags_second_and_later_occurrences() {
        let schema = schema(
            r#"
            start_param = 1
            [[params]]
            name = "id"
            type = "int"
            unique = true
            "#,
        );
        let table = table(&[&["id"], &["1"], &["1"], &["2"], &["1"]]);

        let mut sink = DiagnosticSink::new();
        Validator::new(&schema, &table).check_unique(&mut sink);

        let warnings = messages(&sink, Severity::Warning);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("[A3] duplicate value `1`"));
        assert!(warnings[1].contains("[A5] duplicate value `1`"));
    }

    #[test]
    fn range_check_is_inclusive_and_skips_unparseable_cells_with_a_warning() {
        let schema = schema(
            r#"
            start_param = 1
            [[params]]
            name = "lv"
            type = "int"
            [params.range]
            min = 1
            max = 10
            "#,
        );
        let table = table(&[&["lv"], &["1"], &["10"], &["11"], &["0"], &["??"]]);

        let mut sink = DiagnosticSink::new();
        Validator::new(&schema, &table).check_range(&mut sink);

        let warnings = messages(&sink, Severity::Warning);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("[A4] `11` is outside the allowed range [1, 10]"));
        assert!(warnings[1].contains("[A5] `0` is outside the allowed range [1, 10]"));
        assert!(warnings[2].contains("[A6] `??` cannot be range-checked"));
    }

    #[test]
    fn all_checks_run_even_when_earlier_ones_warned() {
        let schema = schema(
            r#"
            start_param = 1
            [[params]]
            name = "id"
            type = "int"
            unique = true
            [params.range]
            min = 1
            max = 5
            "#,
        );
        let table = table(&[&["id"], &["9"], &["9"], &["abc"]]);

        let mut sink = DiagnosticSink::new();
        let validator = Validator::new(&schema, &table);
        validator.check_existence(&mut sink);
        validator.check_types(&mut sink);
        validator.check_unique(&mut sink);
        validator.check_range(&mut sink);

        let warnings = messages(&sink, Severity::Warning);
        // type failure for `abc`, one duplicate, two out-of-range, one
        // unparseable-for-range.
        assert_eq!(warnings.len(), 5);
        assert!(messages(&sink, Severity::Error).is_empty());
    }

    #[test]
    fn column_letters_cover_the_base_26_rollover() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(26 * 27 - 1), "ZZ");
    }
}
