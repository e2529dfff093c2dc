//! sheetgate: schema-driven spreadsheet validation and JSON export.
//!
//! The pipeline wires the [`sheetgate_spec`] contract to concrete table
//! data: a workbook sheet is normalized into a rectangular string matrix,
//! sliced into a [`TableView`] at the schema's header row, run through the
//! fixed-order validation battery, and — only when the diagnostic sink stays
//! clean — converted into typed records for JSON export.

pub mod convert;
pub mod pipeline;
pub mod table;
pub mod validate;
pub mod workbook;

pub use convert::{convert, FieldValue, Record};
pub use pipeline::{run, RunOptions, RunStatus, SchemaFileError};
pub use table::TableView;
pub use validate::Validator;
pub use workbook::{load_sheet, WorkbookError};
