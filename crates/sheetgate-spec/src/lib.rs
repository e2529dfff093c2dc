//! sheetgate schema contract.
//!
//! This crate holds the declarative contract a spreadsheet must satisfy
//! before export: the typed [`Schema`] model loaded from a TOML tree, and the
//! [`DiagnosticSink`] that collects validation findings across a run. Loading
//! never fails fast on data-shape problems; every violation is appended to
//! the sink so authors see the complete list in one pass.

mod diagnostics;
mod schema;

pub use diagnostics::{Diagnostic, DiagnosticSink, Severity, SinkState, StageOutcome};
pub use schema::{ParamType, Parameter, RangeBounds, RangeCheck, Schema};
